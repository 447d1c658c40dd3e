pub mod bootstrap;
pub mod config;
pub mod labels;
pub mod sink;
pub mod source;

// Re-export vision types for convenience
pub use facemood_vision::{
    pipeline, video, BoundingBox, ClassLabelTable, ClassificationResult, Frame, Pipeline,
    PipelineError, TickOutcome, TickReport,
};
