/// A face bounding box in source-frame pixel coordinates.
///
/// Invariant: `start_x < end_x` and `start_y < end_y`; confidence is
/// in `[0, 1]` and already cleared the configured threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub confidence: f64,
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
}

impl FaceBox {
    pub fn width(&self) -> i32 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> i32 {
        self.end_y - self.start_y
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.start_x + self.width() / 2,
            self.start_y + self.height() / 2,
        )
    }
}

/// The detection loop's published result: the best face of one
/// detector run, stamped with a publication sequence number.
///
/// `sequence_id` increases on every publication, even when the box is
/// identical to the previous one. It is the controller's only way to
/// tell a fresh detection from an unchanged latest value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub face: FaceBox,
    pub sequence_id: u64,
}
