pub mod frame;
pub mod source;
pub mod test_pattern;

pub use frame::Frame;
pub use frame::PixelFormat;
pub use source::FrameSource;
pub use test_pattern::TestPattern;
