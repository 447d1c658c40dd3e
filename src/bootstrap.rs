use anyhow::{Context, Result};
use facemood_vision::{DetectorConfig, OnnxClassifier, Pipeline, YuNetDetector};

use crate::config::Config;
use crate::labels;

pub type EmotionPipeline = Pipeline<YuNetDetector, OnnxClassifier>;

/// Load detector, classifier and labels named by `cfg` and wire them into a
/// pipeline. Every failure here is fatal: no tick has run yet.
pub fn build_pipeline(cfg: &Config) -> Result<EmotionPipeline> {
    let labels = labels::load_labels(&cfg.labels)?;
    log::info!("{} classes: {:?}", labels.len(), labels.iter().collect::<Vec<_>>());

    let detector = YuNetDetector::load(&cfg.detector_model, DetectorConfig::from(&cfg.detector))
        .context("loading face detector")?;
    let engine = OnnxClassifier::load(&cfg.classifier_model, cfg.input_size)
        .context("loading emotion classifier")?;

    Pipeline::builder()
        .detector(detector)
        .engine(engine)
        .labels(labels)
        .input_size(cfg.input_size)
        .tick_budget(cfg.tick_budget())
        .max_source_failures(cfg.max_source_failures)
        .build()
        .context("assembling pipeline")
}
