pub mod composite;
pub mod compositor;
pub mod filter;
pub mod fps_limiter;
pub mod photo;
pub mod queue;
pub mod settings;
pub mod stats;

pub use composite::{CompositePass, SourceParams};
pub use compositor::{Compositor, LoopState};
pub use filter::{Filter, FilterAction, FilterChain, FilterEdit, FilterHandle};
pub use fps_limiter::FpsLimiter;
pub use photo::{PhotoCallback, PhotoGate};
pub use queue::{FilterQueue, OverflowPolicy, QueueStats};
pub use settings::RenderSettings;
pub use stats::{LoopStats, LoopStatsSnapshot};
