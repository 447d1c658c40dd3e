use std::path::Path;

use ort::{
    ep::{self, ExecutionProvider},
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
};

use crate::error::{PipelineError, Result};

fn load_error<E: Into<anyhow::Error>>(path: &Path, source: E) -> PipelineError {
    PipelineError::ModelLoad {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

/// Session builder for the model at `path`, with whichever accelerated
/// execution providers were compiled in.
pub fn session_builder(path: &Path) -> Result<SessionBuilder> {
    let mut builder = Session::builder()
        .map_err(|e| load_error(path, e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| load_error(path, e))?;

    #[cfg(feature = "openvino")]
    {
        let provider = ep::OpenVINO::default();
        if provider.is_available().map_err(|e| load_error(path, e))? {
            provider.register(&mut builder).map_err(|e| load_error(path, e))?;
        } else {
            log::warn!("openvino requested but onnxruntime was built without it; using cpu")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let provider = ep::CUDA::default();
        if provider.is_available().map_err(|e| load_error(path, e))? {
            provider.register(&mut builder).map_err(|e| load_error(path, e))?;
        } else {
            log::warn!("cuda requested but onnxruntime was built without it; using cpu")
        }
    }

    Ok(builder)
}

/// Commit an ONNX model from disk. Any failure here is a startup error.
pub fn load_session(path: &Path) -> Result<Session> {
    log::info!("loading model {}", path.display());
    let mut builder = session_builder(path)?;
    builder
        .commit_from_file(path)
        .map_err(|e| load_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_startup_error() {
        let path = Path::new("/nonexistent/facemood/model.onnx");
        let err = load_session(path).err().unwrap();
        match &err {
            PipelineError::ModelLoad { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.severity(), crate::error::Severity::Startup);
    }
}
