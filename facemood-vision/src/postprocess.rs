use crate::error::{PipelineError, Result};
use crate::types::{ClassLabelTable, ClassificationResult, ScoreVector};

/// Numerically stable softmax: shift by the max logit before exponentiating.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins on exact ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Turn raw logits into a labelled probability distribution.
pub fn classify(scores: &ScoreVector, labels: &ClassLabelTable) -> Result<ClassificationResult> {
    if scores.len() != labels.len() || scores.is_empty() {
        return Err(PipelineError::LabelMismatch {
            labels: labels.len(),
            classes: scores.len(),
        });
    }

    if let Some(bad) = scores.as_slice().iter().find(|s| !s.is_finite()) {
        return Err(PipelineError::MalformedOutput(format!(
            "non-finite score {bad} in classifier output"
        )));
    }

    let distribution = softmax(scores.as_slice());
    let index = argmax(&distribution).ok_or_else(|| {
        PipelineError::MalformedOutput("scores are not comparable".to_string())
    })?;
    let label = labels
        .get(index)
        .ok_or(PipelineError::LabelMismatch {
            labels: labels.len(),
            classes: scores.len(),
        })?
        .to_string();

    Ok(ClassificationResult {
        label,
        index,
        confidence: distribution[index],
        distribution,
    })
}
