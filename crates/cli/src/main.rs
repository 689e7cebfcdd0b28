use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;
use log::info;

use autocam_core::camera::domain::frame_source::CameraTransport;
use autocam_core::camera::infrastructure::synthetic_camera::SyntheticTransport;
use autocam_core::config::settings::Settings;
use autocam_core::detection::domain::face_detector::FaceDetector;
use autocam_core::detection::infrastructure::onnx_ssd_detector::OnnxSsdDetector;
use autocam_core::detection::infrastructure::scripted_detector::ScriptedDetector;
use autocam_core::output::infrastructure::null_sink::NullSink;
use autocam_core::pipeline::events::PipelineEvent;
use autocam_core::pipeline::supervisor::Pipeline;
use autocam_core::shared::constants::{SSD_MODEL_NAME, SSD_MODEL_URL};
use autocam_core::shared::model_resolver;

/// Self-framing virtual webcam: soak-runs the tracking pipeline
/// against the synthetic camera transport.
#[derive(Parser)]
#[command(name = "autocam")]
struct Cli {
    /// List available camera devices and exit.
    #[arg(long)]
    list: bool,

    /// Settings file (JSON). Defaults are used when absent.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// How long to run the pipeline, in seconds.
    #[arg(long, default_value = "10")]
    duration: u64,

    /// Face detector backend: stub or onnx.
    #[arg(long, default_value = "stub")]
    detector: String,

    /// Directory with a bundled detector model (onnx backend only).
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let transport = SyntheticTransport;

    if cli.list {
        for device in transport.enumerate() {
            println!("{}\t{}", device.id, device.friendly_name);
        }
        return Ok(());
    }

    let settings = match cli.settings {
        Some(ref path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let devices = transport.enumerate();
    let device = devices.first().ok_or("no camera devices found")?;
    let camera = transport.open(device)?;
    info!("opened {}", device.friendly_name);

    let detector = build_detector(&cli)?;

    let mut pipeline = Pipeline::new();
    pipeline.start(camera, Box::new(NullSink::new()), detector, None, settings);

    let deadline = Instant::now() + Duration::from_secs(cli.duration);
    while Instant::now() < deadline {
        match pipeline
            .events()
            .recv_timeout(deadline.saturating_duration_since(Instant::now()))
        {
            Ok(PipelineEvent::AvgFps(fps)) => println!("FPS: {fps:5.2}"),
            Ok(PipelineEvent::Finished) => break,
            Ok(PipelineEvent::PreviewToggle) => {}
            Err(_) => break,
        }
    }

    pipeline.stop();
    Ok(())
}

fn build_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    match cli.detector.as_str() {
        "stub" => Ok(Box::new(ScriptedDetector::centered())),
        "onnx" => {
            let model_path = model_resolver::resolve(
                SSD_MODEL_NAME,
                SSD_MODEL_URL,
                cli.model_dir.as_deref(),
                Some(Box::new(|done, total| {
                    if total > 0 {
                        eprint!("\rdownloading model: {}%", done * 100 / total);
                    }
                })),
            )?;
            Ok(Box::new(OnnxSsdDetector::new(&model_path)?))
        }
        other => Err(format!("unknown detector backend: {other}").into()),
    }
}
