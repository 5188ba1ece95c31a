mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from framelab for tests
pub use framelab::config::Config;
pub use framelab::live::capture::{CaptureError, FrameSource, SequenceSource};
pub use framelab::live::display::{HeadlessDisplay, KeyScript};
pub use framelab::live::modes::{FilterMode, FilterOptions};
