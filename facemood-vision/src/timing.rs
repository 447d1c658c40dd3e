use std::time::{Duration, Instant};

/// Logs how long a pipeline stage took when dropped.
pub struct StageTimer {
    stage: &'static str,
    frame: u64,
    start: Instant,
    budget: Option<Duration>,
}

impl StageTimer {
    pub fn new(stage: &'static str, frame: u64) -> Self {
        Self {
            stage,
            frame,
            start: Instant::now(),
            budget: None,
        }
    }

    /// Warn instead of debug-log when the stage overruns `budget`.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        match self.budget {
            Some(budget) if elapsed > budget => log::warn!(
                "frame {}: {} took {:.1}ms (budget {}ms)",
                self.frame,
                self.stage,
                elapsed.as_secs_f64() * 1000.0,
                budget.as_millis()
            ),
            _ => log::debug!(
                "frame {}: {} took {:.1}ms",
                self.frame,
                self.stage,
                elapsed.as_secs_f64() * 1000.0
            ),
        }
    }
}
