use anyhow::{Context, Result};
use facemood_vision::ClassLabelTable;
use std::path::Path;

/// Load the label table: a JSON array of class names in model output order.
pub fn load_labels(path: &Path) -> Result<ClassLabelTable> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading labels at {}", path.display()))?;
    parse_labels(&raw).with_context(|| format!("parsing labels {}", path.display()))
}

pub fn parse_labels(raw: &str) -> Result<ClassLabelTable> {
    let labels: Vec<String> = serde_json::from_str(raw)?;
    if labels.is_empty() {
        anyhow::bail!("label table is empty");
    }
    Ok(ClassLabelTable::new(labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_in_order() {
        let labels = parse_labels(r#"["angry", "happy", "neutral", "sad"]"#).unwrap();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.get(0), Some("angry"));
        assert_eq!(labels.get(3), Some("sad"));
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(parse_labels("[]").is_err());
        assert!(parse_labels(r#"{"0": "happy"}"#).is_err());
        assert!(parse_labels("[1, 2]").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_labels(Path::new("/nonexistent/classes.json")).unwrap_err();
        assert!(format!("{err:#}").contains("reading labels"));
    }
}
