use super::frame_source::{CameraError, FrameSource};

// Well-known register names, GenICam naming.
pub const WIDTH: &str = "Width";
pub const HEIGHT: &str = "Height";
pub const OFFSET_X: &str = "OffsetX";
pub const OFFSET_Y: &str = "OffsetY";
pub const BALANCE_WHITE_AUTO: &str = "BalanceWhiteAuto";
pub const EXPOSURE_AUTO: &str = "ExposureAuto";
pub const GAIN_AUTO: &str = "GainAuto";

fn min_name(axis: &str) -> String {
    format!("{axis}Min")
}

fn max_name(axis: &str) -> String {
    format!("{axis}Max")
}

fn inc_name(axis: &str) -> String {
    format!("{axis}Inc")
}

/// Legal value range of one camera register: `[min, max]` in steps of
/// `increment`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i64,
    pub max: i64,
    pub increment: i64,
}

impl AxisRange {
    /// Snaps `value` down onto the increment grid and clamps it into
    /// `[min, max]`.
    ///
    /// Idempotent: snapping a snapped value is the identity. A zero
    /// increment or an inverted range degrades to plain clamping so a
    /// misreported device never panics the controller.
    pub fn snap(&self, value: i64) -> i64 {
        if self.min > self.max {
            return value;
        }
        if self.increment <= 0 {
            return value.clamp(self.min, self.max);
        }
        let stepped = (value - self.min).div_euclid(self.increment) * self.increment + self.min;
        stepped.clamp(self.min, self.max)
    }

    /// Reads the named axis's range registers fresh from the device.
    pub fn read(camera: &mut dyn FrameSource, axis: &str) -> Result<Self, CameraError> {
        Ok(Self {
            min: camera.read_param(&min_name(axis))?,
            max: camera.read_param(&max_name(axis))?,
            increment: camera.read_param(&inc_name(axis))?,
        })
    }
}

/// Snapshot of the camera's current ROI geometry and the ranges its
/// registers accept.
///
/// Always read fresh from the device immediately before a write; a
/// cached snapshot would compound snapping error across writes.
#[derive(Clone, Copy, Debug)]
pub struct CameraGeometry {
    pub offset_x: i64,
    pub offset_y: i64,
    pub width: i64,
    pub height: i64,
    pub width_range: AxisRange,
    pub height_range: AxisRange,
    pub offset_x_range: AxisRange,
    pub offset_y_range: AxisRange,
}

pub fn read_geometry(camera: &mut dyn FrameSource) -> Result<CameraGeometry, CameraError> {
    Ok(CameraGeometry {
        offset_x: camera.read_param(OFFSET_X)?,
        offset_y: camera.read_param(OFFSET_Y)?,
        width: camera.read_param(WIDTH)?,
        height: camera.read_param(HEIGHT)?,
        width_range: AxisRange::read(camera, WIDTH)?,
        height_range: AxisRange::read(camera, HEIGHT)?,
        offset_x_range: AxisRange::read(camera, OFFSET_X)?,
        offset_y_range: AxisRange::read(camera, OFFSET_Y)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn range(min: i64, max: i64, increment: i64) -> AxisRange {
        AxisRange {
            min,
            max,
            increment,
        }
    }

    #[rstest]
    #[case::on_grid(range(0, 1920, 4), 200, 200)]
    #[case::snaps_down(range(0, 1920, 4), 203, 200)]
    #[case::below_min(range(16, 1920, 4), 3, 16)]
    #[case::above_max(range(0, 1920, 4), 5000, 1920)]
    #[case::offset_grid(range(1, 100, 3), 9, 7)] // grid is 1,4,7,10,...
    fn test_snap(#[case] r: AxisRange, #[case] input: i64, #[case] expected: i64) {
        assert_eq!(r.snap(input), expected);
    }

    #[test]
    fn test_snap_is_idempotent() {
        let r = range(8, 1912, 16);
        for v in [-50i64, 0, 7, 8, 9, 100, 1911, 1912, 9999] {
            let once = r.snap(v);
            assert_eq!(r.snap(once), once, "snap(snap({v})) differs");
        }
    }

    #[test]
    fn test_snap_result_on_grid() {
        let r = range(8, 1912, 16);
        for v in 0..200i64 {
            let snapped = r.snap(v * 13);
            assert!(snapped >= r.min && snapped <= r.max);
            if snapped < r.max {
                assert_eq!((snapped - r.min) % r.increment, 0);
            }
        }
    }

    #[test]
    fn test_snap_zero_increment_is_clamp_only() {
        let r = range(0, 100, 0);
        assert_eq!(r.snap(55), 55);
        assert_eq!(r.snap(-5), 0);
        assert_eq!(r.snap(200), 100);
    }

    #[test]
    fn test_snap_inverted_range_is_noop() {
        let r = range(100, 0, 4);
        assert_eq!(r.snap(55), 55);
    }

    #[test]
    fn test_snap_negative_value_on_positive_grid() {
        let r = range(0, 1920, 4);
        assert_eq!(r.snap(-7), 0);
    }
}
