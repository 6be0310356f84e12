//! Scheduling - Fatigue-Aware Task Execution
//!
//! Key components:
//! - `FatigueWorker`: one thread with a single pending-task slot
//! - `IdleWorkers`: idle workers ordered by ascending fatigue
//! - `FatigueExecutor`: least-fatigued dispatch plus a completion barrier
//! - `SequentialExecutor`: inline fallback on the calling thread

mod fatigue_executor;
mod idle_workers;
mod report;
mod sequential_executor;
mod worker;

pub use fatigue_executor::{ExecutorConfig, FatigueExecutor};
pub use idle_workers::IdleWorkers;
pub use report::{ExecutorReport, WorkerStats};
pub use sequential_executor::SequentialExecutor;
pub use worker::{FatigueWorker, Task};

use crate::error::LaeResult;

/// Something that can run a batch of tasks to completion
pub trait TaskExecutor: Send + Sync {
    /// Run every task and return once all of them have finished
    fn submit_all(&self, tasks: Vec<Task>) -> LaeResult<()>;

    /// Per-worker activity snapshot
    fn report(&self) -> ExecutorReport;

    /// Stop accepting work. Irreversible.
    fn shutdown(&self) -> LaeResult<()>;
}
