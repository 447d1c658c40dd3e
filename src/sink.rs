use facemood_vision::annotate::annotate;
use facemood_vision::{Frame, PipelineError, ResultSink, TickOutcome, TickReport};
use log::{info, warn};
use std::path::PathBuf;

/// Logs each tick and optionally writes annotated snapshots.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    save_dir: Option<PathBuf>,
    last_label: Option<String>,
    saved: u64,
}

impl ConsoleSink {
    pub fn new(save_dir: Option<PathBuf>) -> Self {
        Self {
            save_dir,
            ..Default::default()
        }
    }

    pub fn saved(&self) -> u64 {
        self.saved
    }

    fn snapshot(&mut self, frame: &Frame, report: &TickReport) {
        let Some(dir) = &self.save_dir else {
            return;
        };
        let path = dir.join(format!("frame_{:06}.png", report.frame_index));
        let annotated = annotate(frame.image(), report);
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("could not create {}: {}", dir.display(), e);
            return;
        }
        match annotated.save(&path) {
            Ok(()) => self.saved += 1,
            Err(e) => warn!("could not write {}: {}", path.display(), e),
        }
    }
}

impl ResultSink for ConsoleSink {
    fn emit(&mut self, frame: &Frame, report: &TickReport) {
        let latency = frame.captured_at().elapsed().as_secs_f64() * 1000.0;
        match &report.outcome {
            TickOutcome::Classified(result) => {
                // info only when the label changes
                if self.last_label.as_deref() != Some(result.label.as_str()) {
                    info!(
                        "frame {}: {} ({} face(s), {:.0}ms)",
                        report.frame_index,
                        result,
                        report.candidates.len(),
                        latency
                    );
                    self.last_label = Some(result.label.clone());
                } else {
                    log::debug!("frame {}: {} ({:.0}ms)", report.frame_index, result, latency);
                }
            }
            TickOutcome::NoFace => {
                if self.last_label.take().is_some() {
                    info!("frame {}: no face", report.frame_index);
                }
            }
            TickOutcome::Failed(reason) => {
                warn!("frame {}: tick failed: {}", report.frame_index, reason)
            }
        }
        self.snapshot(frame, report);
    }

    fn source_miss(&mut self, error: &PipelineError) {
        log::debug!("source miss: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facemood_vision::{BoundingBox, ClassificationResult};
    use image::RgbImage;

    #[test]
    fn test_snapshots_written() {
        let dir = std::env::temp_dir().join(format!("facemood-sink-{}", std::process::id()));
        let mut sink = ConsoleSink::new(Some(dir.clone()));
        let frame = Frame::new(3, RgbImage::new(40, 30));
        let face = BoundingBox::new(5, 5, 20, 20);
        let report = TickReport {
            frame_index: 3,
            candidates: vec![face],
            primary: Some(face),
            outcome: TickOutcome::Classified(ClassificationResult {
                label: "happy".into(),
                index: 0,
                confidence: 0.9,
                distribution: vec![0.9, 0.1],
            }),
        };

        sink.emit(&frame, &report);
        assert_eq!(sink.saved(), 1);
        let written = image::open(dir.join("frame_000003.png")).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (40, 30));
        assert_eq!(written.get_pixel(5, 5).0, [0, 255, 136]);
    }

    #[test]
    fn test_without_save_dir() {
        let mut sink = ConsoleSink::new(None);
        let frame = Frame::new(0, RgbImage::new(8, 8));
        let report = TickReport {
            frame_index: 0,
            candidates: vec![],
            primary: None,
            outcome: TickOutcome::NoFace,
        };
        sink.emit(&frame, &report);
        assert_eq!(sink.saved(), 0);
    }
}
