use log::{debug, info};

use crate::camera::domain::frame_source::{CameraError, FrameSource};
use crate::camera::domain::geometry::{
    read_geometry, AxisRange, BALANCE_WHITE_AUTO, EXPOSURE_AUTO, GAIN_AUTO, HEIGHT, OFFSET_X,
    OFFSET_Y, WIDTH,
};
use crate::shared::detection::{Detection, FaceBox};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlState {
    NoFace,
    Tracking,
}

/// Feedback controller fusing low-rate detections into camera-rate
/// register writes.
///
/// Two mechanisms run at different rates. A genuinely new detection
/// (fresh `sequence_id`) re-acquires: ROI and one-shot auto exposure /
/// gain / white balance are pointed at the face. Every cycle in
/// between, the last known box is nudged toward the frame center by
/// one device increment per axis, which keeps the pan smooth even
/// though detections arrive at 2 Hz. Re-triggering the one-shot
/// algorithms on an unchanged face would make exposure pump, so only
/// a fresh sequence id does that.
///
/// Runs inside the acquisition loop's thread; it is the only writer of
/// camera registers.
pub struct FaceController {
    state: ControlState,
    active_face: Option<FaceBox>,
    last_seen_sequence_id: u64,
    frames_since_fresh: u32,
    dead_zone_px: i32,
    lost_after_frames: u32,
}

impl FaceController {
    pub fn new(dead_zone_px: i32, lost_after_frames: u32) -> Self {
        Self {
            state: ControlState::NoFace,
            active_face: None,
            last_seen_sequence_id: 0,
            frames_since_fresh: 0,
            dead_zone_px,
            lost_after_frames,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn active_face(&self) -> Option<&FaceBox> {
        self.active_face.as_ref()
    }

    /// One acquisition cycle's worth of control, strictly after the
    /// frame publish of the same cycle.
    ///
    /// `frame_width`/`frame_height` are the dimensions of the frame
    /// that was just published; the detection (if any) is the latest
    /// value the detection loop produced.
    pub fn update(
        &mut self,
        detection: Option<&Detection>,
        frame_width: u32,
        frame_height: u32,
        camera: &mut dyn FrameSource,
    ) -> Result<(), CameraError> {
        if let Some(det) = detection {
            if det.sequence_id != self.last_seen_sequence_id {
                self.last_seen_sequence_id = det.sequence_id;
                self.frames_since_fresh = 0;
                self.active_face = Some(det.face);
                if self.state != ControlState::Tracking {
                    info!("face acquired (seq {})", det.sequence_id);
                }
                self.state = ControlState::Tracking;
                return self.reacquire(&det.face, camera);
            }
        }

        match self.state {
            ControlState::Tracking => {
                self.center(frame_width, frame_height, camera)?;
                self.frames_since_fresh += 1;
                if self.frames_since_fresh > self.lost_after_frames {
                    info!(
                        "face lost after {} frames without a fresh detection",
                        self.frames_since_fresh
                    );
                    self.state = ControlState::NoFace;
                    self.active_face = None;
                }
                Ok(())
            }
            ControlState::NoFace => self.widen_to_full_sensor(camera),
        }
    }

    /// Point ROI and the one-shot auto algorithms at a new face.
    ///
    /// The detection's box is frame-relative; the absolute sensor
    /// offset is the camera's current offset plus the box offset, read
    /// fresh so earlier snapping error does not compound.
    fn reacquire(&mut self, face: &FaceBox, camera: &mut dyn FrameSource) -> Result<(), CameraError> {
        let geo = read_geometry(camera)?;
        let abs_x = geo.offset_x + face.start_x as i64;
        let abs_y = geo.offset_y + face.start_y as i64;

        write_snapped(camera, WIDTH, face.width() as i64)?;
        write_snapped(camera, HEIGHT, face.height() as i64)?;
        write_snapped(camera, OFFSET_X, abs_x)?;
        write_snapped(camera, OFFSET_Y, abs_y)?;

        camera.trigger_once(BALANCE_WHITE_AUTO)?;
        camera.trigger_once(EXPOSURE_AUTO)?;
        camera.trigger_once(GAIN_AUTO)?;
        debug!(
            "re-acquired ROI {}x{} at absolute ({abs_x}, {abs_y})",
            face.width(),
            face.height()
        );
        Ok(())
    }

    /// One-increment pan toward centering the last known face.
    ///
    /// The stored box is shifted opposite to each applied offset move:
    /// the face sits still on the sensor, so panning the ROI right
    /// moves it left in frame coordinates. Without this compensation
    /// the controller would keep pushing past center until the next
    /// fresh detection.
    fn center(
        &mut self,
        frame_width: u32,
        frame_height: u32,
        camera: &mut dyn FrameSource,
    ) -> Result<(), CameraError> {
        let Some(face) = self.active_face else {
            return Ok(());
        };
        let (face_cx, face_cy) = face.center();

        let shift_x = self.nudge_axis(
            camera,
            OFFSET_X,
            face_cx - (frame_width as i32) / 2,
        )?;
        let shift_y = self.nudge_axis(
            camera,
            OFFSET_Y,
            face_cy - (frame_height as i32) / 2,
        )?;

        if shift_x != 0 || shift_y != 0 {
            if let Some(f) = self.active_face.as_mut() {
                f.start_x -= shift_x as i32;
                f.end_x -= shift_x as i32;
                f.start_y -= shift_y as i32;
                f.end_y -= shift_y as i32;
            }
        }
        Ok(())
    }

    /// Moves one offset register a single increment toward zeroing
    /// `error`, the signed distance from face center to frame center.
    /// Returns the offset delta actually applied.
    fn nudge_axis(
        &self,
        camera: &mut dyn FrameSource,
        axis: &str,
        error: i32,
    ) -> Result<i64, CameraError> {
        if error.abs() <= self.dead_zone_px {
            return Ok(0);
        }
        let range = AxisRange::read(camera, axis)?;
        if range.increment <= 0 || range.min > range.max {
            return Ok(0);
        }
        let current = camera.read_param(axis)?;
        let target = current + range.increment * error.signum() as i64;
        let snapped = range.snap(target);
        if snapped != current {
            camera.write_param(axis, snapped)?;
        }
        Ok(snapped - current)
    }

    /// With no face, the ROI is opened back to the whole sensor so the
    /// auto algorithms meter the full scene and the detector sees
    /// everything again.
    fn widen_to_full_sensor(&self, camera: &mut dyn FrameSource) -> Result<(), CameraError> {
        write_axis_extreme(camera, OFFSET_X, Extreme::Min)?;
        write_axis_extreme(camera, OFFSET_Y, Extreme::Min)?;
        write_axis_extreme(camera, WIDTH, Extreme::Max)?;
        write_axis_extreme(camera, HEIGHT, Extreme::Max)?;
        Ok(())
    }
}

enum Extreme {
    Min,
    Max,
}

/// Snap `value` onto the axis's freshly read grid and write it, unless
/// the register already holds that value.
fn write_snapped(camera: &mut dyn FrameSource, axis: &str, value: i64) -> Result<(), CameraError> {
    let range = AxisRange::read(camera, axis)?;
    if range.min > range.max {
        return Ok(());
    }
    let snapped = range.snap(value);
    if camera.read_param(axis)? != snapped {
        camera.write_param(axis, snapped)?;
    }
    Ok(())
}

fn write_axis_extreme(
    camera: &mut dyn FrameSource,
    axis: &str,
    which: Extreme,
) -> Result<(), CameraError> {
    let range = AxisRange::read(camera, axis)?;
    if range.min > range.max {
        return Ok(());
    }
    let value = match which {
        Extreme::Min => range.min,
        Extreme::Max => range.snap(range.max),
    };
    if camera.read_param(axis)? != value {
        camera.write_param(axis, value)?;
    }
    Ok(())
}

/// Requests the configured capture resolution, snapped to the device
/// grid; called once before streaming starts.
pub fn apply_capture_resolution(
    camera: &mut dyn FrameSource,
    width: u32,
    height: u32,
) -> Result<(), CameraError> {
    write_snapped(camera, WIDTH, width as i64)?;
    write_snapped(camera, HEIGHT, height as i64)
}

/// Caps the device's auto-exposure search so tracking never drops the
/// frame rate; called once at pipeline start, not per cycle.
pub fn apply_exposure_limit(
    camera: &mut dyn FrameSource,
    max_exposure_us: u64,
) -> Result<(), CameraError> {
    const LIMIT: &str = "AutoExposureTimeUpperLimit";
    if camera.has_param(LIMIT) {
        camera.write_param(LIMIT, max_exposure_us as i64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::infrastructure::synthetic_camera::SyntheticCamera;

    const FRAME_W: u32 = 1920;
    const FRAME_H: u32 = 1080;

    fn detection(seq: u64, start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> Detection {
        Detection {
            face: FaceBox {
                confidence: 0.9,
                start_x,
                start_y,
                end_x,
                end_y,
            },
            sequence_id: seq,
        }
    }

    fn controller() -> FaceController {
        FaceController::new(150, 330) // 30 fps * 11 s
    }

    #[test]
    fn test_fresh_detection_reacquires_roi_and_triggers() {
        let mut cam = SyntheticCamera::with_increment(4);
        let mut ctl = controller();
        let det = detection(1, 860, 440, 1060, 640);

        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        assert_eq!(ctl.state(), ControlState::Tracking);
        assert_eq!(cam.read_param(WIDTH).unwrap(), 200);
        assert_eq!(cam.read_param(HEIGHT).unwrap(), 200);
        assert_eq!(cam.read_param(OFFSET_X).unwrap(), 860);
        assert_eq!(cam.read_param(OFFSET_Y).unwrap(), 440);
        assert_eq!(
            cam.triggers(),
            &[
                BALANCE_WHITE_AUTO.to_string(),
                EXPOSURE_AUTO.to_string(),
                GAIN_AUTO.to_string()
            ]
        );
    }

    #[test]
    fn test_roi_values_snap_to_increment_grid() {
        let mut cam = SyntheticCamera::with_increment(16);
        let mut ctl = controller();
        // 203-wide face at offset 861: both off the 16 grid.
        let det = detection(1, 861, 443, 1064, 646);

        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        assert_eq!(cam.read_param(WIDTH).unwrap() % 16, 0);
        assert_eq!(cam.read_param(OFFSET_X).unwrap() % 16, 0);
        assert!(cam.read_param(WIDTH).unwrap() <= 203);
        assert!(cam.read_param(OFFSET_X).unwrap() <= 861);
    }

    #[test]
    fn test_absolute_offset_adds_current_sensor_offset() {
        let mut cam = SyntheticCamera::with_increment(4);
        cam.write_param(OFFSET_X, 100).unwrap();
        cam.write_param(OFFSET_Y, 40).unwrap();
        let mut ctl = controller();
        let det = detection(1, 200, 100, 400, 300);

        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        assert_eq!(cam.read_param(OFFSET_X).unwrap(), 300);
        assert_eq!(cam.read_param(OFFSET_Y).unwrap(), 140);
    }

    #[test]
    fn test_unchanged_sequence_id_does_not_retrigger() {
        let mut cam = SyntheticCamera::with_increment(4);
        let mut ctl = controller();
        let det = detection(1, 860, 440, 1060, 640);

        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        let triggers_after_first = cam.triggers().len();
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        assert_eq!(cam.triggers().len(), triggers_after_first);
    }

    #[test]
    fn test_same_box_new_sequence_id_retriggers() {
        let mut cam = SyntheticCamera::with_increment(4);
        let mut ctl = controller();

        ctl.update(
            Some(&detection(1, 860, 440, 1060, 640)),
            FRAME_W,
            FRAME_H,
            &mut cam,
        )
        .unwrap();
        ctl.update(
            Some(&detection(2, 860, 440, 1060, 640)),
            FRAME_W,
            FRAME_H,
            &mut cam,
        )
        .unwrap();

        assert_eq!(cam.triggers().len(), 6);
    }

    #[test]
    fn test_centered_face_inside_dead_zone_writes_nothing() {
        let mut cam = SyntheticCamera::with_increment(4);
        let mut ctl = controller();
        // Box centered exactly on (960, 540).
        let det = detection(1, 860, 440, 1060, 640);
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        let writes_after_reacquire = cam.writes().len();
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        assert_eq!(cam.writes().len(), writes_after_reacquire);
    }

    #[test]
    fn test_off_center_face_nudges_one_increment() {
        let mut cam = SyntheticCamera::with_increment(4);
        cam.write_param(OFFSET_X, 400).unwrap();
        let mut ctl = FaceController::new(50, 330);
        // Face center at (1500, 540): x error +540, y inside dead zone.
        let det = detection(1, 1400, 440, 1600, 640);
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        let offset_after_reacquire = cam.read_param(OFFSET_X).unwrap();

        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        assert_eq!(
            cam.read_param(OFFSET_X).unwrap(),
            offset_after_reacquire + 4
        );
    }

    #[test]
    fn test_centering_converges_monotonically_then_stops() {
        let mut cam = SyntheticCamera::with_increment(4);
        let mut ctl = FaceController::new(20, 10_000);
        // Face well right of center.
        let det = detection(1, 1100, 490, 1200, 590);
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        let mut last_error = (ctl.active_face().unwrap().center().0 - 960).abs();
        let mut settled_writes = None;
        for _ in 0..200 {
            ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
            let error = (ctl.active_face().unwrap().center().0 - 960).abs();
            assert!(error <= last_error, "centering error must not grow");
            last_error = error;
            if error <= 20 {
                settled_writes = Some(cam.writes().len());
                break;
            }
        }
        let settled = settled_writes.expect("centering never entered the dead zone");

        // Once inside the dead zone, no further writes.
        for _ in 0..5 {
            ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        }
        assert_eq!(cam.writes().len(), settled);
    }

    #[test]
    fn test_staleness_timeout_boundary() {
        let mut cam = SyntheticCamera::with_increment(4);
        let lost_after = 330;
        let mut ctl = FaceController::new(150, lost_after);
        let det = detection(1, 860, 440, 1060, 640);
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        for _ in 0..(lost_after - 1) {
            ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        }
        assert_eq!(ctl.state(), ControlState::Tracking);

        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        assert_eq!(ctl.state(), ControlState::Tracking);

        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        assert_eq!(ctl.state(), ControlState::NoFace);
        assert!(ctl.active_face().is_none());
    }

    #[test]
    fn test_no_face_widens_roi_to_full_sensor() {
        let mut cam = SyntheticCamera::with_increment(4);
        let mut ctl = FaceController::new(150, 1);
        let det = detection(1, 860, 440, 1060, 640);
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();

        // Ride past the timeout, then one more cycle to widen.
        for _ in 0..3 {
            ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        }

        assert_eq!(ctl.state(), ControlState::NoFace);
        assert_eq!(cam.read_param(WIDTH).unwrap(), 1920);
        assert_eq!(cam.read_param(HEIGHT).unwrap(), 1080);
        assert_eq!(cam.read_param(OFFSET_X).unwrap(), 0);
        assert_eq!(cam.read_param(OFFSET_Y).unwrap(), 0);
    }

    #[test]
    fn test_reacquire_after_timeout() {
        let mut cam = SyntheticCamera::with_increment(4);
        let mut ctl = FaceController::new(150, 1);
        ctl.update(
            Some(&detection(1, 860, 440, 1060, 640)),
            FRAME_W,
            FRAME_H,
            &mut cam,
        )
        .unwrap();
        for _ in 0..3 {
            ctl.update(None, FRAME_W, FRAME_H, &mut cam).unwrap();
        }
        assert_eq!(ctl.state(), ControlState::NoFace);

        ctl.update(
            Some(&detection(2, 100, 100, 300, 300)),
            FRAME_W,
            FRAME_H,
            &mut cam,
        )
        .unwrap();
        assert_eq!(ctl.state(), ControlState::Tracking);
    }

    #[test]
    fn test_no_detection_at_all_keeps_widening_without_panic() {
        let mut cam = SyntheticCamera::with_increment(4);
        let mut ctl = controller();
        for _ in 0..10 {
            ctl.update(None, FRAME_W, FRAME_H, &mut cam).unwrap();
        }
        assert_eq!(ctl.state(), ControlState::NoFace);
    }

    #[test]
    fn test_zero_increment_camera_never_panics() {
        let mut cam = SyntheticCamera::with_increment(0);
        let mut ctl = FaceController::new(10, 330);
        let det = detection(1, 1400, 440, 1600, 640);
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        ctl.update(Some(&det), FRAME_W, FRAME_H, &mut cam).unwrap();
        assert_eq!(ctl.state(), ControlState::Tracking);
    }

    #[test]
    fn test_exposure_limit_applied_only_when_supported() {
        let mut cam = SyntheticCamera::with_increment(4);
        // Synthetic camera has no exposure-limit register.
        apply_exposure_limit(&mut cam, 20_000).unwrap();
        assert!(cam.writes().is_empty());
    }
}
