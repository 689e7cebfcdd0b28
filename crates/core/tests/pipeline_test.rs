//! Three-loop pipeline test against the synthetic camera: a scripted
//! detection must steer the camera ROI onto the face, and the frames
//! flowing to the preview must shrink to the new ROI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use autocam_core::camera::infrastructure::synthetic_camera::SyntheticCamera;
use autocam_core::config::settings::Settings;
use autocam_core::detection::infrastructure::scripted_detector::ScriptedDetector;
use autocam_core::output::infrastructure::null_sink::NullSink;
use autocam_core::pipeline::events::{PipelineEvent, RunState};
use autocam_core::pipeline::preview::{PreviewSurface, SurfaceStatus};
use autocam_core::pipeline::supervisor::Pipeline;
use autocam_core::shared::detection::FaceBox;
use autocam_core::shared::frame::Frame;

/// Surface that records the geometry of every frame it is shown.
struct RecordingSurface {
    sizes: Arc<Mutex<Vec<(u32, u32)>>>,
    close_after: Option<usize>,
    shown: usize,
}

impl PreviewSurface for RecordingSurface {
    fn show(&mut self, frame: &Frame) -> Result<SurfaceStatus, Box<dyn std::error::Error>> {
        self.shown += 1;
        self.sizes
            .lock()
            .unwrap()
            .push((frame.width(), frame.height()));
        match self.close_after {
            Some(n) if self.shown >= n => Ok(SurfaceStatus::Closed),
            _ => Ok(SurfaceStatus::Visible),
        }
    }
}

fn fast_settings() -> Settings {
    Settings {
        output_resolution: [640, 360],
        fps: 500.0,
        detector_fps: 100.0,
        ..Settings::default()
    }
}

fn face_at_center_right() -> FaceBox {
    FaceBox {
        confidence: 0.9,
        start_x: 860,
        start_y: 440,
        end_x: 1060,
        end_y: 640,
    }
}

#[test]
fn detection_steers_roi_and_frames_follow() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let surface = RecordingSurface {
        sizes: sizes.clone(),
        close_after: None,
        shown: 0,
    };

    // The face only appears after a while, so the preview observes
    // full-sensor frames first and ROI-sized frames afterwards.
    let mut script = vec![Vec::new(); 30];
    script.push(vec![face_at_center_right()]);

    let mut pipeline = Pipeline::new();
    pipeline.start(
        Box::new(SyntheticCamera::new()),
        Box::new(NullSink::new()),
        Box::new(ScriptedDetector::new(script)),
        Some(Box::new(surface)),
        fast_settings(),
    );
    pipeline.set_preview_enabled(true);

    // Wait until the ROI re-acquisition propagates into the frames.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut saw_roi_frame = false;
    while Instant::now() < deadline {
        if sizes.lock().unwrap().iter().any(|&s| s == (200, 200)) {
            saw_roi_frame = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    pipeline.stop();

    assert!(saw_roi_frame, "preview never observed the 200x200 ROI");
    // Full-sensor frames were flowing before the re-acquisition.
    assert!(sizes.lock().unwrap().iter().any(|&s| s == (1920, 1080)));
}

#[test]
fn pipeline_reports_fps_and_finishes_cleanly() {
    let mut pipeline = Pipeline::new();
    pipeline.start(
        Box::new(SyntheticCamera::new()),
        Box::new(NullSink::new()),
        Box::new(ScriptedDetector::centered()),
        None,
        fast_settings(),
    );

    std::thread::sleep(Duration::from_millis(200));
    pipeline.stop();
    assert_eq!(pipeline.state(), RunState::Idle);

    let events: Vec<PipelineEvent> = pipeline.events().try_iter().collect();
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::AvgFps(f) if *f > 0.0)));
    assert!(events.contains(&PipelineEvent::Finished));
    assert_eq!(events.last(), Some(&PipelineEvent::AvgFps(0.0)));
}

#[test]
fn closing_the_preview_surface_toggles_without_stopping_capture() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let surface = RecordingSurface {
        sizes,
        close_after: Some(1),
        shown: 0,
    };

    let mut pipeline = Pipeline::new();
    pipeline.start(
        Box::new(SyntheticCamera::new()),
        Box::new(NullSink::new()),
        Box::new(ScriptedDetector::centered()),
        Some(Box::new(surface)),
        fast_settings(),
    );
    pipeline.set_preview_enabled(true);

    let got_toggle = Arc::new(AtomicBool::new(false));
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if pipeline
            .events()
            .try_iter()
            .any(|e| e == PipelineEvent::PreviewToggle)
        {
            got_toggle.store(true, Ordering::Relaxed);
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    assert!(got_toggle.load(Ordering::Relaxed), "no toggle event seen");
    assert!(!pipeline.preview_enabled());
    // Acquisition is unaffected by the preview's demise.
    assert_eq!(pipeline.state(), RunState::Running);
    pipeline.stop();
}
