use bytes::Bytes;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{CompositorError, CompositorResult};

/// Frame data with zero-copy semantics
#[derive(Clone)]
pub struct Frame {
    /// Immutable frame data - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    /// Assigned by the frame source on publish.
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Row length in bytes.
    pub stride: u32,
    pub format: PixelFormat,
}

/// Pixel formats a source may deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
    Rgb24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb24 => 3,
        }
    }
}

impl Frame {
    /// Wrap tightly packed pixel data.
    pub fn new(
        data: impl Into<Bytes>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> CompositorResult<Self> {
        let stride = width
            .checked_mul(format.bytes_per_pixel())
            .ok_or_else(|| CompositorError::InvalidFrame(format!("{width}px {format:?} row overflows")))?;
        Self::with_stride(data, width, height, stride, format)
    }

    /// Wrap pixel data whose rows are `stride` bytes apart.
    pub fn with_stride(
        data: impl Into<Bytes>,
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
    ) -> CompositorResult<Self> {
        let data = data.into();
        check_layout(data.len(), width, height, stride, format)?;

        Ok(Self {
            data,
            meta: Arc::new(FrameMetadata {
                sequence: 0,
                width,
                height,
                stride,
                format,
            }),
            timestamp: Instant::now(),
        })
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: Bytes::from(image.into_raw()),
            meta: Arc::new(FrameMetadata {
                sequence: 0,
                width,
                height,
                stride: width * 4,
                format: PixelFormat::Rgba8,
            }),
            timestamp: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn sequence(&self) -> u64 {
        self.meta.sequence
    }

    /// Convert into an RGBA texture, honouring the row stride.
    pub fn to_rgba(&self) -> CompositorResult<RgbaImage> {
        let FrameMetadata {
            width,
            height,
            stride,
            format,
            ..
        } = *self.meta;
        // Fields are public, so the layout may not have gone through a constructor.
        let row = check_layout(self.data.len(), width, height, stride, format)?;

        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height as usize {
            let start = y * stride as usize;
            let line = &self.data[start..start + row];
            match format {
                PixelFormat::Rgba8 => rgba.extend_from_slice(line),
                PixelFormat::Bgra8 => {
                    for px in line.chunks_exact(4) {
                        rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                    }
                }
                PixelFormat::Rgb24 => {
                    for px in line.chunks_exact(3) {
                        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
                    }
                }
            }
        }

        RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| CompositorError::InvalidFrame("pixel buffer size mismatch".into()))
    }
}

/// Bytes per row of pixels, once `len` bytes are known to hold `height` rows
/// of `stride`.
fn check_layout(len: usize, width: u32, height: u32, stride: u32, format: PixelFormat) -> CompositorResult<usize> {
    let row = (width as usize)
        .checked_mul(format.bytes_per_pixel() as usize)
        .ok_or_else(|| CompositorError::InvalidFrame(format!("{width}px {format:?} row overflows")))?;
    if (stride as usize) < row {
        return Err(CompositorError::InvalidFrame(format!(
            "stride {stride} shorter than a {width}px {format:?} row"
        )));
    }
    let needed = (stride as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| CompositorError::InvalidFrame(format!("{height} rows of {stride} bytes overflow")))?;
    if len < needed {
        return Err(CompositorError::InvalidFrame(format!(
            "{len} bytes supplied, {width}x{height} with stride {stride} needs {needed}"
        )));
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffers() {
        let err = Frame::new(vec![0u8; 10], 4, 4, PixelFormat::Rgba8).err();
        assert!(matches!(err, Some(CompositorError::InvalidFrame(_))));

        let err = Frame::with_stride(vec![0u8; 64], 4, 4, 8, PixelFormat::Rgba8).err();
        assert!(matches!(err, Some(CompositorError::InvalidFrame(_))));
    }

    #[test]
    fn hand_built_frame_with_short_data_is_rejected() {
        let frame = Frame {
            data: Bytes::from(vec![0u8; 8]),
            meta: Arc::new(FrameMetadata {
                sequence: 0,
                width: 4,
                height: 4,
                stride: 16,
                format: PixelFormat::Rgba8,
            }),
            timestamp: Instant::now(),
        };
        assert!(matches!(frame.to_rgba(), Err(CompositorError::InvalidFrame(_))));

        let narrow = Frame {
            data: Bytes::from(vec![0u8; 64]),
            meta: Arc::new(FrameMetadata {
                stride: 2,
                ..(*frame.meta).clone()
            }),
            timestamp: Instant::now(),
        };
        assert!(matches!(narrow.to_rgba(), Err(CompositorError::InvalidFrame(_))));
    }

    #[test]
    fn converts_bgra_and_rgb() {
        let bgra = Frame::new(vec![1, 2, 3, 4], 1, 1, PixelFormat::Bgra8).unwrap();
        assert_eq!(bgra.to_rgba().unwrap().get_pixel(0, 0).0, [3, 2, 1, 4]);

        let rgb = Frame::new(vec![9, 8, 7], 1, 1, PixelFormat::Rgb24).unwrap();
        assert_eq!(rgb.to_rgba().unwrap().get_pixel(0, 0).0, [9, 8, 7, 255]);
    }

    #[test]
    fn skips_row_padding() {
        // 2x2 RGB24 with two padding bytes per row
        let data = vec![
            10, 10, 10, 20, 20, 20, 0, 0, //
            30, 30, 30, 40, 40, 40, 0, 0,
        ];
        let frame = Frame::with_stride(data, 2, 2, 8, PixelFormat::Rgb24).unwrap();
        let image = frame.to_rgba().unwrap();
        assert_eq!(image.get_pixel(1, 0).0, [20, 20, 20, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [30, 30, 30, 255]);
    }

    #[test]
    fn rgba_round_trips_through_frame() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([5, 6, 7, 8]));
        let frame = Frame::from_rgba(image.clone());
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(frame.to_rgba().unwrap(), image);
    }
}
