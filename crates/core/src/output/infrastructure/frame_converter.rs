use thiserror::Error;

use crate::shared::frame::{Frame, PixelLayout};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("unsupported conversion {from:?} -> {to:?}")]
    Unsupported { from: PixelLayout, to: PixelLayout },
}

/// Resize and repack a frame for the output sink.
///
/// Capture geometry follows the camera ROI, so it changes while the
/// sink stays fixed; every published frame passes through here. The
/// resize is nearest-neighbor (same as the detector preprocessing) and
/// packed-chroma frames are produced last so chroma siting stays
/// aligned with the final pixel grid.
pub fn convert(
    frame: &Frame,
    out_width: u32,
    out_height: u32,
    out_layout: PixelLayout,
) -> Result<Frame, ConvertError> {
    let same_size = frame.width() == out_width && frame.height() == out_height;
    if same_size && frame.layout() == out_layout {
        return Ok(frame.clone());
    }

    if frame.layout() == PixelLayout::Yuyv422 {
        // Resizing packed chroma would split Y0U/Y1V pairs.
        return Err(ConvertError::Unsupported {
            from: frame.layout(),
            to: out_layout,
        });
    }

    let resized = if same_size {
        frame.clone()
    } else {
        resize_nearest(frame, out_width, out_height)
    };

    match (resized.layout(), out_layout) {
        (a, b) if a == b => Ok(resized),
        (PixelLayout::Mono8, PixelLayout::Yuyv422) => Ok(mono_to_yuyv(&resized)),
        (PixelLayout::Rgb8, PixelLayout::Yuyv422) => Ok(rgb_to_yuyv(&resized, false)),
        (PixelLayout::Bgr8, PixelLayout::Yuyv422) => Ok(rgb_to_yuyv(&resized, true)),
        (from, to) => Err(ConvertError::Unsupported { from, to }),
    }
}

fn resize_nearest(frame: &Frame, out_width: u32, out_height: u32) -> Frame {
    let channels = frame.layout().channels() as usize;
    let src = frame.data();
    let src_w = frame.width() as usize;
    let src_h = frame.height() as usize;
    let dst_w = out_width as usize;
    let dst_h = out_height as usize;

    let mut data = vec![0u8; dst_w * dst_h * channels];
    for y in 0..dst_h {
        let src_y = (y * src_h / dst_h).min(src_h - 1);
        for x in 0..dst_w {
            let src_x = (x * src_w / dst_w).min(src_w - 1);
            let s = (src_y * src_w + src_x) * channels;
            let d = (y * dst_w + x) * channels;
            data[d..d + channels].copy_from_slice(&src[s..s + channels]);
        }
    }
    Frame::new(data, out_width, out_height, frame.layout(), frame.seq())
}

/// Mono is luma already; chroma planes sit at the neutral 128.
fn mono_to_yuyv(frame: &Frame) -> Frame {
    let mut data = Vec::with_capacity(frame.data().len() * 2);
    for &y in frame.data() {
        data.push(y);
        data.push(128);
    }
    Frame::new(
        data,
        frame.width(),
        frame.height(),
        PixelLayout::Yuyv422,
        frame.seq(),
    )
}

/// BT.601 full-range RGB -> packed YUYV. Chroma is averaged over each
/// horizontal pixel pair.
fn rgb_to_yuyv(frame: &Frame, swapped: bool) -> Frame {
    let src = frame.data();
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let mut data = Vec::with_capacity(w * h * 2);

    let ycbcr = |idx: usize| -> (f64, f64, f64) {
        let (r, b) = if swapped {
            (src[idx + 2] as f64, src[idx] as f64)
        } else {
            (src[idx] as f64, src[idx + 2] as f64)
        };
        let g = src[idx + 1] as f64;
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let cb = 128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b;
        (y, cb, cr)
    };

    for row in 0..h {
        let mut col = 0;
        while col < w {
            let i0 = (row * w + col) * 3;
            // Odd widths reuse the last pixel for the pair's right half.
            let i1 = (row * w + (col + 1).min(w - 1)) * 3;
            let (y0, cb0, cr0) = ycbcr(i0);
            let (y1, cb1, cr1) = ycbcr(i1);
            let cb = ((cb0 + cb1) / 2.0).round().clamp(0.0, 255.0) as u8;
            let cr = ((cr0 + cr1) / 2.0).round().clamp(0.0, 255.0) as u8;
            data.push(y0.round().clamp(0.0, 255.0) as u8);
            data.push(cb);
            if col + 1 < w {
                data.push(y1.round().clamp(0.0, 255.0) as u8);
                data.push(cr);
            }
            col += 2;
        }
    }
    Frame::new(
        data,
        frame.width(),
        frame.height(),
        PixelLayout::Yuyv422,
        frame.seq(),
    )
}
