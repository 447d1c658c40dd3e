pub mod annotate;
pub mod buffers;
pub mod detector;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod selector;
pub mod timing;
pub mod types;
pub mod video;
pub mod yunet;

// Re-export commonly used types
pub use detector::{DetectorConfig, FaceDetector, YuNetDetector};
pub use engine::{InferenceEngine, OnnxClassifier};
pub use error::{PipelineError, Severity};
pub use pipeline::{FrameSource, Pipeline, PipelineBuilder, ResultSink, RunSummary};
pub use types::{
    BoundingBox, ClassLabelTable, ClassificationResult, Frame, NormalizedTensor, ScoreVector,
    TickOutcome, TickReport,
};
pub use video::{Camera, StopHandle};
