use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use log::{error, info, warn};

use crate::camera::domain::frame_source::FrameSource;
use crate::config::settings::Settings;
use crate::control::face_controller::{
    apply_capture_resolution, apply_exposure_limit, FaceController,
};
use crate::output::domain::output_sink::OutputSink;
use crate::output::infrastructure::frame_converter;
use crate::pipeline::events::PipelineEvent;
use crate::shared::constants::FPS_REPORT_PERIOD;
use crate::shared::detection::Detection;
use crate::shared::frame::{Frame, PixelLayout};
use crate::shared::latest::Latest;

/// The camera-rate loop: grab, publish, control, pace.
///
/// Owns the camera and the output cadence. Each cycle pushes the frame
/// to the virtual-camera sink and (as clones) into the detector's and
/// preview's latest-value cells, then runs the face controller, then
/// sleeps to the sink's frame deadline. Cycle order is fixed:
/// publish, then controller, then pacing.
pub struct AcquisitionLoop {
    camera: Box<dyn FrameSource>,
    sink: Box<dyn OutputSink>,
    controller: FaceController,
    settings: Settings,
    detector_frames: Latest<Frame>,
    preview_frames: Latest<Frame>,
    detections: Latest<Detection>,
    feature_writes: Receiver<(String, i64)>,
    events: Sender<PipelineEvent>,
    running: Arc<AtomicBool>,
}

impl AcquisitionLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        camera: Box<dyn FrameSource>,
        sink: Box<dyn OutputSink>,
        controller: FaceController,
        settings: Settings,
        detector_frames: Latest<Frame>,
        preview_frames: Latest<Frame>,
        detections: Latest<Detection>,
        feature_writes: Receiver<(String, i64)>,
        events: Sender<PipelineEvent>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            camera,
            sink,
            controller,
            settings,
            detector_frames,
            preview_frames,
            detections,
            feature_writes,
            events,
            running,
        }
    }

    /// Runs until the stop flag clears, then releases the sink and the
    /// camera and emits the terminal events.
    pub fn run(mut self) {
        let [out_w, out_h] = self.settings.output_resolution;
        if let Err(e) = self
            .sink
            .open(out_w, out_h, self.settings.fps, PixelLayout::Yuyv422)
        {
            error!("failed to open virtual camera sink: {e}");
            self.shutdown();
            return;
        }
        let [in_w, in_h] = self.settings.input_resolution;
        if let Err(e) = apply_capture_resolution(&mut *self.camera, in_w, in_h) {
            warn!("could not apply capture resolution: {e}");
        }
        if let Err(e) = apply_exposure_limit(&mut *self.camera, self.settings.max_exposure_time) {
            warn!("could not cap auto-exposure time: {e}");
        }

        let grab_timeout = Duration::from_millis(self.settings.grab_timeout_ms);
        let mut last_frame: Option<Frame> = None;
        let mut cycle: u64 = 0;
        let mut window_start = Instant::now();

        info!("acquisition loop started");
        while self.running.load(Ordering::Relaxed) {
            if cycle % FPS_REPORT_PERIOD == 0 && cycle > 0 {
                let avg = FPS_REPORT_PERIOD as f64 / window_start.elapsed().as_secs_f64();
                window_start = Instant::now();
                let _ = self.events.send(PipelineEvent::AvgFps(avg));
            }

            match self.camera.retrieve_frame(grab_timeout) {
                Ok(Some(frame)) => last_frame = Some(frame),
                Ok(None) => warn!("frame grab timed out, reusing previous frame"),
                Err(e) => warn!("frame grab failed: {e}"),
            }

            if let Some(ref frame) = last_frame {
                match frame_converter::convert(frame, out_w, out_h, PixelLayout::Yuyv422) {
                    Ok(converted) => {
                        if let Err(e) = self.sink.publish(&converted) {
                            warn!("virtual camera publish failed: {e}");
                        }
                    }
                    Err(e) => warn!("frame conversion failed: {e}"),
                }
                // Latest-value handoff: an unconsumed frame is simply
                // overwritten, never queued.
                self.detector_frames.publish(frame.clone());
                self.preview_frames.publish(frame.clone());

                self.apply_feature_writes();

                let detection = self.detections.peek();
                if let Err(e) = self.controller.update(
                    detection.as_ref(),
                    frame.width(),
                    frame.height(),
                    &mut *self.camera,
                ) {
                    warn!("controller camera write failed: {e}");
                }
            }

            self.sink.pacing_sleep();
            cycle += 1;
        }

        self.shutdown();
    }

    /// Pass-through feature writes from the hosting UI, applied on the
    /// acquisition thread so register access stays single-writer.
    fn apply_feature_writes(&mut self) {
        while let Ok((name, value)) = self.feature_writes.try_recv() {
            if let Err(e) = self.camera.write_param(&name, value) {
                warn!("feature write {name}={value} rejected: {e}");
            }
        }
    }

    fn shutdown(&mut self) {
        self.sink.close();
        self.camera.close();
        info!("acquisition loop finished");
        let _ = self.events.send(PipelineEvent::Finished);
        let _ = self.events.send(PipelineEvent::AvgFps(0.0));
    }
}
