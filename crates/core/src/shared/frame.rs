use ndarray::ArrayView3;

/// Pixel layout of a captured or published frame.
///
/// Conversion happens at the output boundary only; everything upstream
/// treats pixel data as opaque bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Mono8,
    Yuyv422,
    Rgb8,
    Bgr8,
}

impl PixelLayout {
    pub fn channels(&self) -> u8 {
        match self {
            PixelLayout::Mono8 => 1,
            PixelLayout::Yuyv422 => 2,
            PixelLayout::Rgb8 | PixelLayout::Bgr8 => 3,
        }
    }
}

/// A single camera frame: contiguous bytes in row-major order.
///
/// Frames are immutable once published. The acquisition loop owns a
/// frame for one cycle, then hands independent clones to the output
/// sink, the detector and the preview; no receiver ever sees another
/// receiver's mutation.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    layout: PixelLayout,
    seq: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, layout: PixelLayout, seq: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (layout.channels() as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            layout,
            seq,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Monotonic capture sequence number, assigned by the frame source.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub(crate) fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.layout.channels() as usize,
        )
    }
}
