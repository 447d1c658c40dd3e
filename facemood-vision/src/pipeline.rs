use std::time::Duration;

use crate::buffers::BufferLedger;
use crate::detector::FaceDetector;
use crate::engine::InferenceEngine;
use crate::error::{PipelineError, Result};
use crate::postprocess;
use crate::preprocess::{self, DEFAULT_INPUT_SIZE};
use crate::selector::select_primary;
use crate::timing::StageTimer;
use crate::types::{BoundingBox, ClassLabelTable, Frame, TickOutcome, TickReport};

/// Anything that hands out frames on request.
pub trait FrameSource {
    /// `Ok(None)` once the source is stopped. `Err` is a transient miss; the
    /// caller may ask again.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Receives every tick's report, in capture order.
pub trait ResultSink {
    fn emit(&mut self, frame: &Frame, report: &TickReport);

    /// Called when the source had no frame for this tick.
    fn source_miss(&mut self, _error: &PipelineError) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub classified: u64,
    pub no_face: u64,
    pub failed: u64,
    pub source_failures: u64,
}

pub struct PipelineBuilder<D, E> {
    detector: Option<D>,
    engine: Option<E>,
    labels: Option<ClassLabelTable>,
    input_size: u32,
    tick_budget: Duration,
    max_source_failures: u32,
}

impl<D: FaceDetector, E: InferenceEngine> Default for PipelineBuilder<D, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: FaceDetector, E: InferenceEngine> PipelineBuilder<D, E> {
    pub fn new() -> Self {
        Self {
            detector: None,
            engine: None,
            labels: None,
            input_size: DEFAULT_INPUT_SIZE,
            tick_budget: Duration::from_millis(100),
            max_source_failures: 30,
        }
    }

    pub fn detector(mut self, detector: D) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn engine(mut self, engine: E) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn labels(mut self, labels: ClassLabelTable) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    pub fn tick_budget(mut self, budget: Duration) -> Self {
        self.tick_budget = budget;
        self
    }

    /// Consecutive transient source errors tolerated before `run` gives up.
    pub fn max_source_failures(mut self, limit: u32) -> Self {
        self.max_source_failures = limit;
        self
    }

    pub fn build(self) -> Result<Pipeline<D, E>> {
        let detector = self.detector.ok_or(PipelineError::NotReady("face detector"))?;
        let engine = self.engine.ok_or(PipelineError::NotReady("inference engine"))?;
        let labels = self.labels.ok_or(PipelineError::NotReady("label table"))?;

        if labels.len() != engine.num_classes() || labels.is_empty() {
            return Err(PipelineError::LabelMismatch {
                labels: labels.len(),
                classes: engine.num_classes(),
            });
        }
        if self.input_size != engine.input_size() {
            return Err(PipelineError::InputSizeMismatch {
                preprocess: self.input_size,
                model: engine.input_size(),
            });
        }

        Ok(Pipeline {
            detector,
            engine,
            labels,
            input_size: self.input_size,
            tick_budget: self.tick_budget,
            max_source_failures: self.max_source_failures,
            ledger: BufferLedger::new(),
        })
    }
}

/// Per-frame orchestrator: detect → select → preprocess → infer → classify.
///
/// Owns the long-lived capabilities; every per-tick buffer goes through the
/// ledger so it is released before `tick` returns.
pub struct Pipeline<D, E> {
    detector: D,
    engine: E,
    labels: ClassLabelTable,
    input_size: u32,
    tick_budget: Duration,
    max_source_failures: u32,
    ledger: BufferLedger,
}

impl<D: FaceDetector, E: InferenceEngine> Pipeline<D, E> {
    pub fn builder() -> PipelineBuilder<D, E> {
        PipelineBuilder::new()
    }

    pub fn ledger(&self) -> &BufferLedger {
        &self.ledger
    }

    pub fn labels(&self) -> &ClassLabelTable {
        &self.labels
    }

    /// Run one tick. Only fatal errors come back as `Err`; recoverable
    /// failures are reported through [`TickOutcome::Failed`].
    pub fn tick(&mut self, frame: &Frame) -> Result<TickReport> {
        let index = frame.index();
        let _timer = StageTimer::new("tick", index).with_budget(self.tick_budget);

        let candidates = {
            let _t = StageTimer::new("detect", index);
            let gray = self.ledger.acquire(frame.to_gray());
            match self.detector.detect(&gray) {
                Ok(candidates) => candidates,
                Err(e) => return Self::recover(index, Vec::new(), None, e),
            }
        };

        let Some(primary) = select_primary(&candidates) else {
            return Ok(TickReport {
                frame_index: index,
                candidates,
                primary: None,
                outcome: TickOutcome::NoFace,
            });
        };

        let scores = {
            let tensor = {
                let _t = StageTimer::new("preprocess", index);
                match preprocess::preprocess(frame.image(), primary, self.input_size) {
                    Ok(tensor) => self.ledger.acquire(tensor),
                    Err(e) => return Self::recover(index, candidates, Some(primary), e),
                }
            };
            let _t = StageTimer::new("inference", index);
            let scores = match self.engine.run(&tensor) {
                Ok(scores) => self.ledger.acquire(scores),
                Err(e) => return Self::recover(index, candidates, Some(primary), e),
            };
            scores
        };

        match postprocess::classify(&scores, &self.labels) {
            Ok(result) => Ok(TickReport {
                frame_index: index,
                candidates,
                primary: Some(primary),
                outcome: TickOutcome::Classified(result),
            }),
            Err(e) => Self::recover(index, candidates, Some(primary), e),
        }
    }

    fn recover(
        index: u64,
        candidates: Vec<BoundingBox>,
        primary: Option<BoundingBox>,
        error: PipelineError,
    ) -> Result<TickReport> {
        if error.is_fatal() {
            return Err(error);
        }
        log::warn!("frame {}: {}", index, error);
        Ok(TickReport {
            frame_index: index,
            candidates,
            primary,
            outcome: TickOutcome::Failed(error.to_string()),
        })
    }

    /// Sequential frame loop. The next frame is requested only after the
    /// previous tick has been emitted; ends when the source stops.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: ResultSink + ?Sized,
    {
        let mut summary = RunSummary::default();
        let mut consecutive_failures = 0u32;

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => self.ledger.acquire(frame),
                Ok(None) => break,
                Err(e) if !e.is_fatal() => {
                    summary.source_failures += 1;
                    consecutive_failures += 1;
                    log::warn!("no frame: {}", e);
                    sink.source_miss(&e);
                    if consecutive_failures >= self.max_source_failures {
                        log::error!(
                            "giving up after {} consecutive source failures",
                            consecutive_failures
                        );
                        break;
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };
            consecutive_failures = 0;

            let report = self.tick(&frame)?;
            summary.ticks += 1;
            match report.outcome {
                TickOutcome::Classified(_) => summary.classified += 1,
                TickOutcome::NoFace => summary.no_face += 1,
                TickOutcome::Failed(_) => summary.failed += 1,
            }
            sink.emit(&frame, &report);
        }

        log::info!(
            "stopped after {} ticks ({} classified, {} without face, {} failed)",
            summary.ticks,
            summary.classified,
            summary.no_face,
            summary.failed
        );
        Ok(summary)
    }
}
