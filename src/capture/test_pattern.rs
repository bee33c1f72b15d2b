//! Synthetic frame producer used in place of a camera

use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

use crate::capture::frame::{Frame, FrameMetadata, PixelFormat};

/// Moving colour bars with a scrolling gradient, one step per frame.
pub struct TestPattern {
    width: u32,
    height: u32,
    tick: u32,
}

const BARS: [[u8; 3]; 7] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
];

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            tick: 0,
        }
    }

    pub fn next_frame(&mut self) -> Frame {
        let (w, h) = (self.width, self.height);
        let bar_width = (w / BARS.len() as u32).max(1);
        let mut data = Vec::with_capacity((w * h * 3) as usize);

        for y in 0..h {
            let shade = ((y + self.tick) % 256) as u8;
            for x in 0..w {
                let bar = ((x + self.tick) / bar_width) as usize % BARS.len();
                let [r, g, b] = BARS[bar];
                if y < h * 3 / 4 {
                    data.extend_from_slice(&[r, g, b]);
                } else {
                    data.extend_from_slice(&[shade, shade, shade]);
                }
            }
        }
        self.tick = self.tick.wrapping_add(1);

        Frame {
            data: Bytes::from(data),
            meta: Arc::new(FrameMetadata {
                sequence: 0,
                width: w,
                height: h,
                stride: w * 3,
                format: PixelFormat::Rgb24,
            }),
            timestamp: Instant::now(),
        }
    }
}
