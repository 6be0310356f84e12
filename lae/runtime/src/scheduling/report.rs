use serde::Serialize;
use std::fmt;

/// Point-in-time counters for one worker
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkerStats {
    pub id: usize,
    pub fatigue_factor: f64,
    /// Cumulative time spent running tasks, in nanoseconds
    pub busy_nanos: u64,
    /// Cumulative time spent waiting for tasks, in nanoseconds
    pub idle_nanos: u64,
    pub fatigue: f64,
}

/// Best-effort snapshot of every worker in an executor
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExecutorReport {
    pub workers: Vec<WorkerStats>,
}

impl ExecutorReport {
    /// Sum of squared deviations of each worker's fatigue from the mean.
    /// Zero means perfectly even load.
    pub fn fairness(&self) -> f64 {
        if self.workers.is_empty() {
            return 0.0;
        }
        let mean = self.workers.iter().map(|w| w.fatigue).sum::<f64>() / self.workers.len() as f64;
        self.workers
            .iter()
            .map(|w| (w.fatigue - mean).powi(2))
            .sum()
    }

    pub fn total_busy_nanos(&self) -> u64 {
        self.workers.iter().map(|w| w.busy_nanos).sum()
    }
}

impl fmt::Display for ExecutorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for w in &self.workers {
            writeln!(
                f,
                "Worker {} Work: {} Idle: {} Fatigue: {}",
                w.id, w.busy_nanos, w.idle_nanos, w.fatigue
            )?;
        }
        write!(f, "Fairness Factor: {}", self.fairness())
    }
}
