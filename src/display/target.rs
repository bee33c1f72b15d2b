//! Render targets: one output path plus the surface context it draws into

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use image::RgbaImage;
use tracing::{error, warn};

use super::transform::{DrawParams, DrawTransform};
use crate::error::{CompositorError, CompositorResult};

/// Backend-side context bound to one destination (window, encoder input,
/// off-screen pixel buffer).
///
/// Contexts are only ever made current and drawn on the render thread.
/// `release` must tolerate repeated calls.
pub trait SurfaceContext: Send {
    /// Create (or recreate) the context for this destination.
    fn setup(&mut self, width: u32, height: u32) -> CompositorResult<()>;

    /// The destination changed size.
    fn resize(&mut self, _width: u32, _height: u32) -> CompositorResult<()> {
        Ok(())
    }

    /// Destination exists and has a non-zero size.
    fn is_ready(&self) -> bool;

    fn make_current(&mut self) -> CompositorResult<()>;

    fn draw(&mut self, composite: &RgbaImage, transform: &DrawTransform) -> CompositorResult<()>;

    /// Synchronous readback of the last draw.
    fn read_pixels(&mut self) -> CompositorResult<RgbaImage>;

    /// Swap / publish the drawn frame.
    fn present(&mut self) -> CompositorResult<()>;

    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Display,
    Encoder,
    Photo,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::Display => "display",
            TargetKind::Encoder => "encoder",
            TargetKind::Photo => "photo",
        })
    }
}

/// One output path of the compositor.
///
/// Wraps an optional surface with readiness, release and fault tracking.
/// After `max_failures` consecutive failed operations the target disables
/// itself and stays skipped until a new surface is attached or the context
/// is explicitly set up again.
pub struct RenderTarget {
    kind: TargetKind,
    surface: Option<Box<dyn SurfaceContext>>,
    configured: bool,
    released: bool,
    disabled: bool,
    failures: u32,
    max_failures: u32,
}

impl RenderTarget {
    pub fn new(kind: TargetKind, max_failures: u32) -> Self {
        Self {
            kind,
            surface: None,
            configured: false,
            released: true,
            disabled: false,
            failures: 0,
            max_failures,
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Swap in a new destination; the old one is released first.
    pub fn attach(&mut self, surface: Box<dyn SurfaceContext>) {
        self.release();
        self.surface = Some(surface);
        self.disabled = false;
        self.failures = 0;
    }

    pub fn detach(&mut self) -> Option<Box<dyn SurfaceContext>> {
        self.release();
        self.surface.take()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// A surface is attached but has no live context yet.
    pub fn needs_setup(&self) -> bool {
        self.surface.is_some() && !self.configured && !self.disabled
    }

    /// Release and recreate the context.
    pub fn setup(&mut self, width: u32, height: u32) -> CompositorResult<()> {
        self.release();
        let surface = self
            .surface
            .as_mut()
            .ok_or(CompositorError::TargetDetached(self.kind))?;
        surface.setup(width, height)?;
        self.configured = true;
        self.released = false;
        self.disabled = false;
        self.failures = 0;
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> CompositorResult<()> {
        match self.surface.as_mut() {
            Some(surface) if self.configured => surface.resize(width, height),
            _ => Ok(()),
        }
    }

    pub fn ready(&self) -> bool {
        !self.disabled
            && self.configured
            && self.surface.as_ref().map_or(false, |s| s.is_ready())
    }

    pub fn make_current(&mut self) -> CompositorResult<()> {
        self.live_surface()?.make_current()
    }

    pub fn draw(&mut self, composite: &RgbaImage, params: &DrawParams) -> CompositorResult<()> {
        let transform = DrawTransform::resolve(composite.dimensions(), params);
        self.live_surface()?.draw(composite, &transform)
    }

    pub fn read_pixels(&mut self) -> CompositorResult<RgbaImage> {
        self.live_surface()?.read_pixels()
    }

    pub fn present(&mut self) -> CompositorResult<()> {
        self.live_surface()?.present()
    }

    /// Tear the context down. Safe to call any number of times; a panicking
    /// backend is contained so the caller can go on releasing other targets.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.configured = false;

        if let Some(surface) = self.surface.as_mut() {
            if panic::catch_unwind(AssertUnwindSafe(|| surface.release())).is_err() {
                error!(target_kind = %self.kind, "surface panicked while releasing");
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Fault boundary around one target operation.
    ///
    /// Returns the value on success. On failure logs, counts, and disables
    /// the target once the failure budget is spent.
    pub fn record_outcome<T>(&mut self, outcome: CompositorResult<T>) -> Option<T> {
        match outcome {
            Ok(value) => {
                self.failures = 0;
                Some(value)
            }
            Err(e) => {
                self.failures += 1;
                metrics::counter!("vidcomp_target_faults").increment(1);
                warn!(target_kind = %self.kind, failures = self.failures, "target operation failed: {e}");

                if self.max_failures > 0 && self.failures >= self.max_failures {
                    error!(target_kind = %self.kind, "disabling target after {} consecutive failures", self.failures);
                    self.disabled = true;
                    self.release();
                }
                None
            }
        }
    }

    fn live_surface(&mut self) -> CompositorResult<&mut Box<dyn SurfaceContext>> {
        if !self.configured {
            return Err(CompositorError::context(format!("{} context not set up", self.kind)));
        }
        self.surface
            .as_mut()
            .ok_or(CompositorError::TargetDetached(self.kind))
    }
}

/// Bind, draw and present in one go.
pub fn draw_and_present(
    target: &mut RenderTarget,
    composite: &RgbaImage,
    params: &DrawParams,
) -> CompositorResult<()> {
    target.make_current()?;
    target.draw(composite, params)?;
    target.present()
}
