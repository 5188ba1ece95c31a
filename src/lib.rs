pub mod adjust;
pub mod config;
pub mod live;
pub mod models;
pub mod pipeline;
pub mod text;

pub use adjust::{StillImagePipeline, StillRun};
pub use config::{Config, ConfigError};
pub use live::LiveSession;
pub use live::capture::{CaptureError, FrameSource};
pub use live::modes::FilterMode;
pub use models::{CorrectionKind, FrameStats};
pub use pipeline::{
    Pipeline, PipelineData, PipelineStep, PipelineContext,
    MetadataValue, StageImage, DebugConfig
};
