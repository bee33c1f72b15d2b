pub mod software;
pub mod target;
pub mod transform;

pub use software::SoftwareSurface;
pub use target::{RenderTarget, SurfaceContext, TargetKind};
pub use transform::{AspectRatioMode, DrawParams, DrawTransform, Rotation, Viewport, VisibleRegion};
