use anyhow::{Context, Result};
use facemood_vision::DetectorConfig;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEMOOD_CONFIG_PATH").unwrap_or("/usr/local/etc/facemood/config.toml"))
});

pub static MODEL_PREFIX: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEMOOD_MODEL_PREFIX").unwrap_or("/usr/local/share/facemood"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: String,
    pub detector_model: PathBuf,
    pub classifier_model: PathBuf,
    pub labels: PathBuf,
    /// Side of the square classifier input.
    pub input_size: u32,
    pub tick_budget_ms: u64,
    pub max_source_failures: u32,
    pub detector: DetectorSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub input_size: u32,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub min_face_size: u32,
    /// 0 disables the upper bound.
    pub max_face_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: "/dev/video0".to_string(),
            detector_model: MODEL_PREFIX.join("face_detection_yunet_2023mar.onnx"),
            classifier_model: MODEL_PREFIX.join("emotion_yolo11n_cls.onnx"),
            labels: MODEL_PREFIX.join("classes.json"),
            input_size: 64,
            tick_budget_ms: 100,
            max_source_failures: 30,
            detector: DetectorSettings::default(),
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        let base = DetectorConfig::default();
        Self {
            input_size: base.input_size,
            score_threshold: base.score_threshold,
            nms_threshold: base.nms_threshold,
            min_face_size: base.min_face_size,
            max_face_size: base.max_face_size.unwrap_or(0),
        }
    }
}

impl From<&DetectorSettings> for DetectorConfig {
    fn from(s: &DetectorSettings) -> Self {
        DetectorConfig {
            input_size: s.input_size,
            score_threshold: s.score_threshold,
            nms_threshold: s.nms_threshold,
            min_face_size: s.min_face_size,
            max_face_size: (s.max_face_size > 0).then_some(s.max_face_size),
        }
    }
}

impl Config {
    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick_budget_ms)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("facemood-config-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let cfg = load_config(Some(&scratch("absent.toml"))).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_round_trip() {
        let path = scratch("round_trip.toml");
        let mut cfg = Config::default();
        cfg.camera = "/dev/video2".to_string();
        cfg.detector.score_threshold = 0.75;
        cfg.detector.max_face_size = 400;
        save_config(&cfg, Some(&path)).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, cfg);
        let detector = DetectorConfig::from(&loaded.detector);
        assert_eq!(detector.max_face_size, Some(400));
    }

    #[test]
    fn test_partial_file() {
        let path = scratch("partial.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "camera = \"/dev/video1\"\n[detector]\nmin_face_size = 48\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.camera, "/dev/video1");
        assert_eq!(cfg.detector.min_face_size, 48);
        assert_eq!(cfg.input_size, 64);
        assert_eq!(DetectorConfig::from(&cfg.detector).max_face_size, None);
    }

    #[test]
    fn test_zero_detector_size_rejected() {
        let path = scratch("zero_size.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[detector]\ninput_size = 0\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        let err = DetectorConfig::from(&cfg.detector).validate().unwrap_err();
        assert!(err.is_fatal());
    }
}
