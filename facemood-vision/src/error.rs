use std::path::PathBuf;

use thiserror::Error;

use crate::types::BoundingBox;

/// How far an error is allowed to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Construction failed; the pipeline must never start ticking.
    Startup,
    /// Wiring bug between stages. Aborts the run.
    Precondition,
    /// Scoped to one tick; the loop keeps scheduling.
    Transient,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0} is not initialized")]
    NotReady(&'static str),

    #[error("failed to load model {}: {source}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid detector config: {0}")]
    InvalidConfig(String),

    #[error("label table has {labels} entries but the model emits {classes} scores")]
    LabelMismatch { labels: usize, classes: usize },

    #[error("preprocessor produces {preprocess}x{preprocess} tensors, model expects {model}x{model}")]
    InputSizeMismatch { preprocess: u32, model: u32 },

    #[error("region {region:?} is empty or outside the {frame_width}x{frame_height} frame")]
    InvalidRegion {
        region: BoundingBox,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("tensor shape {actual:?} does not match model input {expected:?}")]
    TensorShape {
        expected: [usize; 4],
        actual: Vec<usize>,
    },

    #[error("frame source: {0}")]
    Source(String),

    #[error("face detection failed: {0}")]
    Detection(#[source] ort::Error),

    #[error("inference failed: {0}")]
    Inference(#[source] ort::Error),

    #[error("unexpected model output: {0}")]
    MalformedOutput(String),
}

impl PipelineError {
    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::NotReady(_)
            | PipelineError::ModelLoad { .. }
            | PipelineError::InvalidConfig(_)
            | PipelineError::LabelMismatch { .. }
            | PipelineError::InputSizeMismatch { .. } => Severity::Startup,
            PipelineError::InvalidRegion { .. } | PipelineError::TensorShape { .. } => {
                Severity::Precondition
            }
            PipelineError::Source(_)
            | PipelineError::Detection(_)
            | PipelineError::Inference(_)
            | PipelineError::MalformedOutput(_) => Severity::Transient,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() != Severity::Transient
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
