//! CPU framebuffer surface for running the compositor without a GPU

use std::borrow::Cow;

use flume::{Sender, TrySendError};
use image::imageops;
use image::{Rgba, RgbaImage};
use tracing::{debug, trace};

use super::target::SurfaceContext;
use super::transform::{orient, scale, DrawTransform};
use crate::error::{CompositorError, CompositorResult};

const CLEAR_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// In-memory surface.
///
/// Draws land in an RGBA framebuffer sized by `setup`/`resize`. With a sink
/// attached, every presented frame is forwarded to a consumer (an encoder,
/// a preview window) without ever blocking the render thread.
pub struct SoftwareSurface {
    label: String,
    framebuffer: Option<RgbaImage>,
    current: bool,
    sink: Option<Sender<RgbaImage>>,
    presented: u64,
    dropped: u64,
}

impl SoftwareSurface {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            framebuffer: None,
            current: false,
            sink: None,
            presented: 0,
            dropped: 0,
        }
    }

    pub fn with_sink(label: impl Into<String>, sink: Sender<RgbaImage>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new(label)
        }
    }

    pub fn framebuffer(&self) -> Option<&RgbaImage> {
        self.framebuffer.as_ref()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Presented frames the sink had no room for.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn allocate(&mut self, width: u32, height: u32) {
        self.framebuffer = (width > 0 && height > 0).then(|| RgbaImage::from_pixel(width, height, CLEAR_COLOR));
    }

    fn target(&mut self) -> CompositorResult<&mut RgbaImage> {
        if !self.current {
            return Err(CompositorError::context(format!("{} surface is not current", self.label)));
        }
        self.framebuffer
            .as_mut()
            .ok_or_else(|| CompositorError::context(format!("{} surface has no framebuffer", self.label)))
    }
}

impl SurfaceContext for SoftwareSurface {
    fn setup(&mut self, width: u32, height: u32) -> CompositorResult<()> {
        self.allocate(width, height);
        self.current = false;
        debug!(surface = %self.label, width, height, "software surface set up");
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> CompositorResult<()> {
        if self.framebuffer.as_ref().map(|fb| fb.dimensions()) != Some((width, height)) {
            self.allocate(width, height);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.framebuffer.is_some()
    }

    fn make_current(&mut self) -> CompositorResult<()> {
        if self.framebuffer.is_none() {
            return Err(CompositorError::context(format!("{} surface has no framebuffer", self.label)));
        }
        self.current = true;
        Ok(())
    }

    fn draw(&mut self, composite: &RgbaImage, transform: &DrawTransform) -> CompositorResult<()> {
        let framebuffer = self.target()?;
        for pixel in framebuffer.pixels_mut() {
            *pixel = CLEAR_COLOR;
        }

        if transform.viewport.is_empty() {
            return Ok(());
        }

        let oriented = orient(
            composite,
            transform.rotation,
            transform.flip_horizontal,
            transform.flip_vertical,
        );
        let Some(visible) = transform.viewport.clip(oriented.dimensions(), framebuffer.dimensions()) else {
            return Ok(());
        };
        // Scale only what ends up on screen.
        let source = if visible.covers(oriented.dimensions()) {
            Cow::Borrowed(&*oriented)
        } else {
            Cow::Owned(
                imageops::crop_imm(
                    &*oriented,
                    visible.src_x,
                    visible.src_y,
                    visible.src_width,
                    visible.src_height,
                )
                .to_image(),
            )
        };
        let scaled = scale(&source, visible.dest.width, visible.dest.height, transform.filter_type());
        imageops::overlay(framebuffer, &*scaled, visible.dest.x, visible.dest.y);
        Ok(())
    }

    fn read_pixels(&mut self) -> CompositorResult<RgbaImage> {
        self.target().map(|fb| fb.clone())
    }

    fn present(&mut self) -> CompositorResult<()> {
        let forward = self.sink.is_some();
        let framebuffer = self.target()?;
        let frame = forward.then(|| framebuffer.clone());
        self.presented += 1;

        if let (Some(sink), Some(frame)) = (self.sink.as_ref(), frame) {
            match sink.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped += 1;
                    trace!(surface = %self.label, "sink full, frame dropped");
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(CompositorError::context(format!("{} sink disconnected", self.label)));
                }
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.framebuffer.take().is_some() {
            debug!(surface = %self.label, presented = self.presented, "software surface released");
        }
        self.current = false;
    }
}
