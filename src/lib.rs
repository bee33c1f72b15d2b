pub mod capture;
pub mod display;
pub mod error;
pub mod pipeline;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::display::{AspectRatioMode, Rotation};
use crate::pipeline::OverflowPolicy;

pub use capture::{Frame, FrameSource, PixelFormat, TestPattern};
pub use display::{RenderTarget, SoftwareSurface, SurfaceContext, TargetKind};
pub use error::{CompositorError, CompositorResult};
pub use pipeline::{Compositor, Filter, FilterHandle, LoopState, LoopStatsSnapshot, RenderSettings};

/// Compositor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub view: ViewConfig,
    pub encoder: EncoderConfig,
    pub pipeline: PipelineConfig,
}

/// Preview surface and camera source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Preview size until the window reports one.
    pub width: u32,
    pub height: u32,
    pub aspect_ratio_mode: AspectRatioMode,
    pub aa_enabled: bool,
    /// Camera orientation applied inside the composite.
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub preview_flip_horizontal: bool,
    pub preview_flip_vertical: bool,
    /// 0 = unlimited
    pub max_filters: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    /// 0 disables pacing
    pub fps: u32,
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub mute_video: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter_queue_depth: usize,
    pub queue_overflow: OverflowPolicy,
    /// Consecutive failures before a target is disabled; 0 = never.
    pub max_target_failures: u32,
    /// Upper bound on a wait when no frame rate is set.
    pub idle_wait_ms: u64,
    pub render_thread_core: Option<usize>,
    pub force_render: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            aspect_ratio_mode: AspectRatioMode::Fit,
            aa_enabled: false,
            rotation: Rotation::Deg0,
            flip_horizontal: false,
            flip_vertical: false,
            preview_flip_horizontal: false,
            preview_flip_vertical: false,
            max_filters: 0,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            rotation: Rotation::Deg0,
            flip_horizontal: false,
            flip_vertical: false,
            mute_video: false,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter_queue_depth: 64,
            queue_overflow: OverflowPolicy::Reject,
            max_target_failures: 3,
            idle_wait_ms: 100,
            render_thread_core: None,
            force_render: false,
        }
    }
}

impl Config {
    /// Defaults, overlaid by an optional TOML file, overlaid by
    /// `VIDCOMP_<SECTION>__<KEY>` environment variables.
    pub fn load(path: Option<&Path>) -> CompositorResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("VIDCOMP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}
