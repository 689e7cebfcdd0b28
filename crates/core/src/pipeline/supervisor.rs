use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use log::info;

use crate::camera::domain::frame_source::FrameSource;
use crate::config::settings::Settings;
use crate::control::face_controller::FaceController;
use crate::detection::domain::face_detector::FaceDetector;
use crate::output::domain::output_sink::OutputSink;
use crate::pipeline::acquisition::AcquisitionLoop;
use crate::pipeline::detection_loop::DetectionLoop;
use crate::pipeline::events::{PipelineEvent, RunState};
use crate::pipeline::preview::{PreviewLoop, PreviewSurface};
use crate::shared::latest::Latest;

/// Owns the three loops' threads, run flags and event plumbing.
///
/// The hosting application hands in an opened camera, a sink, a
/// detector and one settings snapshot; everything after that is
/// start/stop, the preview toggle, pass-through feature writes, and
/// the event receiver.
pub struct Pipeline {
    state: RunState,
    events_tx: Sender<PipelineEvent>,
    events_rx: Receiver<PipelineEvent>,
    run_flags: Vec<Arc<AtomicBool>>,
    handles: Vec<JoinHandle<()>>,
    feature_tx: Option<Sender<(String, i64)>>,
    preview_enabled: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new() -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            state: RunState::Idle,
            events_tx,
            events_rx,
            run_flags: Vec::new(),
            handles: Vec::new(),
            feature_tx: None,
            preview_enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Events emitted by the loops: fps samples, `Finished`, preview
    /// toggles.
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events_rx
    }

    /// Spawns acquisition, detection and (optionally) preview threads.
    ///
    /// A second start while running is a no-op; stop first.
    pub fn start(
        &mut self,
        camera: Box<dyn FrameSource>,
        sink: Box<dyn OutputSink>,
        detector: Box<dyn FaceDetector>,
        preview: Option<Box<dyn PreviewSurface>>,
        settings: Settings,
    ) {
        if self.state != RunState::Idle {
            return;
        }

        let detector_frames = Latest::new();
        let preview_frames = Latest::new();
        let detections = Latest::new();
        let (feature_tx, feature_rx) = crossbeam_channel::unbounded();
        self.feature_tx = Some(feature_tx);

        let controller =
            FaceController::new(settings.dead_zone_px, settings.lost_after_frames());

        let acq_flag = Arc::new(AtomicBool::new(true));
        let acq = AcquisitionLoop::new(
            camera,
            sink,
            controller,
            settings.clone(),
            detector_frames.clone(),
            preview_frames.clone(),
            detections.clone(),
            feature_rx,
            self.events_tx.clone(),
            acq_flag.clone(),
        );
        self.run_flags.push(acq_flag);
        self.handles
            .push(std::thread::spawn(move || acq.run()));

        let det_flag = Arc::new(AtomicBool::new(true));
        let det = DetectionLoop::new(
            detector,
            detector_frames,
            detections.clone(),
            settings.confidence,
            settings.detector_fps,
            det_flag.clone(),
        );
        self.run_flags.push(det_flag);
        self.handles
            .push(std::thread::spawn(move || det.run()));

        if let Some(surface) = preview {
            let preview_flag = Arc::new(AtomicBool::new(true));
            let pv = PreviewLoop::new(
                surface,
                preview_frames,
                detections,
                self.preview_enabled.clone(),
                preview_flag.clone(),
                self.events_tx.clone(),
            );
            self.run_flags.push(preview_flag);
            self.handles
                .push(std::thread::spawn(move || pv.run()));
        }

        self.state = RunState::Running;
        info!("pipeline started");
    }

    /// Cooperative shutdown: clears every loop's run flag and joins.
    /// Idempotent; stopping an idle pipeline is a no-op. Latency is
    /// bounded by one cycle of the slowest loop (including at most one
    /// pending frame grab).
    pub fn stop(&mut self) {
        if self.state != RunState::Running {
            return;
        }
        self.state = RunState::Stopping;
        for flag in self.run_flags.drain(..) {
            flag.store(false, Ordering::Relaxed);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        self.feature_tx = None;
        self.preview_enabled.store(false, Ordering::Relaxed);
        self.state = RunState::Idle;
        info!("pipeline stopped");
    }

    /// Manual camera-feature write from the hosting UI, applied on the
    /// acquisition thread. Ignored while idle.
    pub fn set_feature(&self, name: &str, value: i64) {
        if let Some(ref tx) = self.feature_tx {
            let _ = tx.send((name.to_string(), value));
        }
    }

    pub fn set_preview_enabled(&self, enabled: bool) {
        self.preview_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn preview_enabled(&self) -> bool {
        self.preview_enabled.load(Ordering::Relaxed)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
