use std::path::Path;

use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::error::{PipelineError, Result};
use crate::model;
use crate::types::{NormalizedTensor, ScoreVector};

/// A loaded classification model: one `[1, 3, S, S]` input, one score output.
pub trait InferenceEngine {
    fn run(&mut self, tensor: &NormalizedTensor) -> Result<ScoreVector>;

    /// Width of the score vector the model emits.
    fn num_classes(&self) -> usize;

    /// `S` of the expected input.
    fn input_size(&self) -> u32;
}

impl<T: InferenceEngine + ?Sized> InferenceEngine for Box<T> {
    fn run(&mut self, tensor: &NormalizedTensor) -> Result<ScoreVector> {
        (**self).run(tensor)
    }

    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }

    fn input_size(&self) -> u32 {
        (**self).input_size()
    }
}

/// Reject anything that is not exactly `[1, 3, size, size]`.
pub fn check_input_shape(tensor: &NormalizedTensor, size: u32) -> Result<()> {
    let expected = [1, 3, size as usize, size as usize];
    if tensor.shape() != expected {
        return Err(PipelineError::TensorShape {
            expected,
            actual: tensor.shape().to_vec(),
        });
    }
    Ok(())
}

/// ONNX emotion classifier.
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    output_name: String,
    input_size: u32,
    num_classes: usize,
}

impl OnnxClassifier {
    pub fn load(path: &Path, input_size: u32) -> Result<Self> {
        let session = model::load_session(path)?;
        Self::new(session, input_size).map_err(|e| match e {
            PipelineError::Inference(source) => PipelineError::ModelLoad {
                path: path.to_path_buf(),
                source: source.into(),
            },
            other => other,
        })
    }

    /// Resolve the I/O names and learn the output width with one warm-up pass.
    pub fn new(session: Session, input_size: u32) -> Result<Self> {
        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or(PipelineError::NotReady("classifier input"))?;
        let output_name = session
            .outputs()
            .first()
            .map(|output| output.name().to_string())
            .ok_or(PipelineError::NotReady("classifier output"))?;
        log::info!("classifier input '{}', output '{}'", input_name, output_name);

        let mut engine = Self {
            session,
            input_name,
            output_name,
            input_size,
            num_classes: 0,
        };

        let side = input_size as usize;
        let warmup = NormalizedTensor::new(Array4::zeros((1, 3, side, side)));
        engine.num_classes = engine.infer(&warmup)?.len();
        if engine.num_classes == 0 {
            return Err(PipelineError::MalformedOutput(
                "classifier produced no scores".to_string(),
            ));
        }
        log::info!("classifier emits {} classes", engine.num_classes);

        Ok(engine)
    }

    fn infer(&mut self, tensor: &NormalizedTensor) -> Result<ScoreVector> {
        let input_tensor =
            Value::from_array(tensor.as_array().clone()).map_err(PipelineError::Inference)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(PipelineError::Inference)?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            PipelineError::MalformedOutput(format!("output '{}' missing", self.output_name))
        })?;
        let (_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(PipelineError::Inference)?;
        Ok(ScoreVector(data.to_vec()))
    }
}

impl InferenceEngine for OnnxClassifier {
    fn run(&mut self, tensor: &NormalizedTensor) -> Result<ScoreVector> {
        check_input_shape(tensor, self.input_size)?;
        let scores = self.infer(tensor)?;
        if scores.len() != self.num_classes {
            return Err(PipelineError::MalformedOutput(format!(
                "expected {} scores, got {}",
                self.num_classes,
                scores.len()
            )));
        }
        Ok(scores)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }
}
