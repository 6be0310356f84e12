//! Sequential Executor - Caller-Thread Fallback
//!
//! Runs each task inline, in submission order. Useful for debugging the
//! engine without threads; task errors surface directly to the caller.

use super::report::{ExecutorReport, WorkerStats};
use super::worker::{panic_message, Task};
use super::TaskExecutor;
use crate::error::{LaeError, LaeResult};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

pub struct SequentialExecutor {
    busy_nanos: AtomicU64,
    shut_down: AtomicBool,
}

impl SequentialExecutor {
    /// Only a single "thread" (the caller) is supported
    pub fn new(num_threads: usize) -> LaeResult<Self> {
        if num_threads != 1 {
            return Err(LaeError::InvalidArgument(format!(
                "sequential executor supports exactly 1 thread, got {num_threads}"
            )));
        }
        Ok(Self {
            busy_nanos: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Run `task` on the calling thread
    pub fn submit(&self, task: Task) -> LaeResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(LaeError::IllegalState("executor is shut down".to_string()));
        }
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(task));
        let elapsed = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.busy_nanos.fetch_add(elapsed, Ordering::Relaxed);

        match outcome {
            Ok(result) => result,
            Err(payload) => Err(LaeError::TaskPanicked(panic_message(payload.as_ref()))),
        }
    }
}

impl TaskExecutor for SequentialExecutor {
    fn submit_all(&self, tasks: Vec<Task>) -> LaeResult<()> {
        for task in tasks {
            self.submit(task)?;
        }
        Ok(())
    }

    fn report(&self) -> ExecutorReport {
        let busy_nanos = self.busy_nanos.load(Ordering::Relaxed);
        ExecutorReport {
            workers: vec![WorkerStats {
                id: 0,
                fatigue_factor: 1.0,
                busy_nanos,
                idle_nanos: 0,
                fatigue: busy_nanos as f64,
            }],
        }
    }

    fn shutdown(&self) -> LaeResult<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}
