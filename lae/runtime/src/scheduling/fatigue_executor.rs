//! Fatigue Executor - Least-Tired-First Worker Pool
//!
//! Every task goes to the idle worker with the lowest fatigue. A counter of
//! in-flight tasks backs an exact completion barrier: `submit_all` returns
//! only once every task it accepted has run to completion.

use super::idle_workers::IdleWorkers;
use super::report::{ExecutorReport, WorkerStats};
use super::worker::{FatigueWorker, Task};
use super::TaskExecutor;
use crate::error::{LaeError, LaeResult};
use log::{debug, info};
use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Configuration for the fatigue executor
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Number of worker threads
    pub num_threads: usize,
    /// Lower bound (inclusive) for a worker's fatigue factor
    pub min_fatigue_factor: f64,
    /// Upper bound (exclusive) for a worker's fatigue factor
    pub max_fatigue_factor: f64,
    /// Seed for fatigue factor sampling (None = OS entropy)
    pub seed: Option<u64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            num_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            min_fatigue_factor: 0.5,
            max_fatigue_factor: 1.5,
            seed: None,
        }
    }
}

impl ExecutorConfig {
    /// Default factor range with `num_threads` workers
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> LaeResult<()> {
        if self.num_threads == 0 {
            return Err(LaeError::InvalidArgument(
                "executor needs at least one thread".to_string(),
            ));
        }
        let (min, max) = (self.min_fatigue_factor, self.max_fatigue_factor);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min < max) {
            return Err(LaeError::InvalidArgument(format!(
                "fatigue factor range [{min}, {max}) must be positive and non-empty"
            )));
        }
        Ok(())
    }
}

/// State reachable from task completions on worker threads
struct Shared {
    idle: IdleWorkers,
    in_flight: AtomicUsize,
    drained_lock: Mutex<()>,
    drained: Condvar,
}

impl Shared {
    fn finish_one(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _guard = self.drained_lock.lock();
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut guard = self.drained_lock.lock();
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            self.drained.wait(&mut guard);
        }
    }
}

/// Pool of fatigue workers with least-fatigue-first dispatch
pub struct FatigueExecutor {
    workers: Vec<Arc<FatigueWorker>>,
    shared: Arc<Shared>,
    shut_down: AtomicBool,
}

impl FatigueExecutor {
    /// Start `num_threads` workers with the default factor range
    pub fn new(num_threads: usize) -> LaeResult<Self> {
        Self::with_config(ExecutorConfig::with_threads(num_threads))
    }

    pub fn with_config(config: ExecutorConfig) -> LaeResult<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let shared = Arc::new(Shared {
            idle: IdleWorkers::new(),
            in_flight: AtomicUsize::new(0),
            drained_lock: Mutex::new(()),
            drained: Condvar::new(),
        });

        let mut workers: Vec<Arc<FatigueWorker>> = Vec::with_capacity(config.num_threads);
        for id in 0..config.num_threads {
            let factor = rng.gen_range(config.min_fatigue_factor..config.max_fatigue_factor);
            let worker = Arc::new(FatigueWorker::new(id, factor));
            if let Err(e) = worker.start() {
                for started in &workers {
                    stop_worker(started);
                }
                return Err(e);
            }
            shared.idle.push(Arc::clone(&worker));
            workers.push(worker);
        }
        info!("fatigue executor started with {} workers", workers.len());

        Ok(Self {
            workers,
            shared,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Run `task` on the least fatigued idle worker.
    ///
    /// Blocks while every worker is busy. Returns once the task is handed
    /// off, not once it has finished.
    pub fn submit(&self, task: Task) -> LaeResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(LaeError::IllegalState("executor is shut down".to_string()));
        }

        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        let Some(worker) = self.shared.idle.pop() else {
            self.shared.finish_one();
            return Err(LaeError::Cancelled);
        };

        let shared = Arc::clone(&self.shared);
        let returning = Arc::clone(&worker);
        let on_complete = Box::new(move || {
            shared.idle.push(returning);
            shared.finish_one();
        });

        if let Err(e) = worker.assign_with_completion(task, on_complete) {
            self.shared.idle.push(worker);
            self.shared.finish_one();
            // Lost a race with shutdown after the flag check
            return Err(match e {
                LaeError::WorkerShutdown(_) => {
                    LaeError::IllegalState("executor is shut down".to_string())
                }
                other => other,
            });
        }
        Ok(())
    }

    /// Submit every task in order, then wait until none is in flight
    pub fn submit_all(&self, tasks: Vec<Task>) -> LaeResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(LaeError::IllegalState("executor is shut down".to_string()));
        }

        let count = tasks.len();
        let mut outcome = Ok(());
        for task in tasks {
            if let Err(e) = self.submit(task) {
                outcome = Err(e);
                break;
            }
        }
        // Whatever was accepted still has to finish before we return
        self.shared.wait_drained();
        debug!("batch of {} tasks drained", count);
        outcome
    }

    /// Stop every worker after its pending task. Further submissions fail.
    pub fn shutdown(&self) -> LaeResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.idle.close();
        for worker in &self.workers {
            worker.shutdown();
        }
        for worker in &self.workers {
            worker.join()?;
        }
        info!("fatigue executor shut down");
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Tasks accepted but not yet completed
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn workers(&self) -> &[Arc<FatigueWorker>] {
        &self.workers
    }

    /// Per-worker counters, read without pausing running tasks
    pub fn report(&self) -> ExecutorReport {
        ExecutorReport {
            workers: self
                .workers
                .iter()
                .map(|w| WorkerStats {
                    id: w.id(),
                    fatigue_factor: w.fatigue_factor(),
                    busy_nanos: w.busy_nanos(),
                    idle_nanos: w.idle_nanos(),
                    fatigue: w.fatigue(),
                })
                .collect(),
        }
    }
}

fn stop_worker(worker: &FatigueWorker) {
    worker.shutdown();
    let _ = worker.join();
}

impl TaskExecutor for FatigueExecutor {
    fn submit_all(&self, tasks: Vec<Task>) -> LaeResult<()> {
        FatigueExecutor::submit_all(self, tasks)
    }

    fn report(&self) -> ExecutorReport {
        FatigueExecutor::report(self)
    }

    fn shutdown(&self) -> LaeResult<()> {
        FatigueExecutor::shutdown(self)
    }
}

impl Drop for FatigueExecutor {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Spin for about a millisecond, then raise the flag
    fn busy_task(flag: Arc<AtomicBool>) -> Task {
        Box::new(move || {
            let start = Instant::now();
            while start.elapsed() < Duration::from_millis(1) {
                std::hint::spin_loop();
            }
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn flags(n: usize) -> Vec<Arc<AtomicBool>> {
        (0..n).map(|_| Arc::new(AtomicBool::new(false))).collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(ExecutorConfig::default().validate().is_ok());
        assert!(ExecutorConfig::with_threads(0).validate().is_err());

        let inverted = ExecutorConfig {
            min_fatigue_factor: 2.0,
            max_fatigue_factor: 1.0,
            ..ExecutorConfig::with_threads(2)
        };
        assert!(matches!(inverted.validate(), Err(LaeError::InvalidArgument(_))));
        assert!(FatigueExecutor::new(0).is_err());
    }

    #[test]
    fn test_seeded_factors_in_range_and_reproducible() {
        let config = ExecutorConfig {
            seed: Some(7),
            ..ExecutorConfig::with_threads(4)
        };
        let a = FatigueExecutor::with_config(config.clone()).unwrap();
        let b = FatigueExecutor::with_config(config).unwrap();
        for (x, y) in a.workers().iter().zip(b.workers()) {
            assert!((0.5..1.5).contains(&x.fatigue_factor()));
            assert_eq!(x.fatigue_factor(), y.fatigue_factor());
        }
    }

    #[test]
    fn test_single_task() {
        let executor = FatigueExecutor::new(2).unwrap();
        let done = flags(1);
        executor.submit_all(vec![busy_task(Arc::clone(&done[0]))]).unwrap();
        assert!(done[0].load(Ordering::SeqCst));
        executor.shutdown().unwrap();
    }

    #[test]
    fn test_report_after_task() {
        let executor = FatigueExecutor::new(2).unwrap();
        let done = flags(1);
        executor.submit_all(vec![busy_task(Arc::clone(&done[0]))]).unwrap();

        let report = executor.report();
        assert_eq!(report.workers.len(), 2);
        assert!(report.total_busy_nanos() > 0);
        assert!(report.workers.iter().any(|w| w.fatigue > 0.0));
        assert!(report.fairness() > 0.0);

        let text = report.to_string();
        assert!(text.contains("Work:"));
        assert!(text.contains("Fairness Factor:"));
    }

    #[test]
    fn test_least_fatigued_worker_selected() {
        let executor = FatigueExecutor::new(2).unwrap();
        let done = flags(2);

        executor.submit_all(vec![busy_task(Arc::clone(&done[0]))]).unwrap();
        executor.submit_all(vec![busy_task(Arc::clone(&done[1]))]).unwrap();

        let workers_with_work = executor
            .report()
            .workers
            .iter()
            .filter(|w| w.busy_nanos > 0)
            .count();
        assert_eq!(workers_with_work, 2);
    }

    #[test]
    fn test_submit_all_blocks_until_complete() {
        let executor = FatigueExecutor::new(2).unwrap();
        let done = flags(5);
        let tasks = done.iter().map(|f| busy_task(Arc::clone(f))).collect();
        executor.submit_all(tasks).unwrap();
        for (i, flag) in done.iter().enumerate() {
            assert!(flag.load(Ordering::SeqCst), "task {i} unfinished after submit_all");
        }
    }

    #[test]
    fn test_stress_in_flight_returns_to_zero() {
        let executor = FatigueExecutor::new(3).unwrap();
        let done = flags(100);
        let tasks = done.iter().map(|f| busy_task(Arc::clone(f))).collect();
        executor.submit_all(tasks).unwrap();

        assert!(done.iter().all(|f| f.load(Ordering::SeqCst)));
        assert_eq!(executor.in_flight(), 0);
    }

    #[test]
    fn test_failing_tasks_still_drain() {
        let executor = FatigueExecutor::new(2).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<Task> = (0..10)
            .map(|i| {
                let ran = Arc::clone(&ran);
                Box::new(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    match i % 3 {
                        0 => Err(LaeError::IllegalState("fails".to_string())),
                        1 => panic!("panics"),
                        _ => Ok(()),
                    }
                }) as Task
            })
            .collect();
        executor.submit_all(tasks).unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 10);
        assert_eq!(executor.in_flight(), 0);

        // Pool is still fully usable
        let done = flags(4);
        executor
            .submit_all(done.iter().map(|f| busy_task(Arc::clone(f))).collect())
            .unwrap();
        assert!(done.iter().all(|f| f.load(Ordering::SeqCst)));
    }

    #[test]
    fn test_shutdown_stops_workers() {
        let executor = FatigueExecutor::new(2).unwrap();
        let workers: Vec<_> = executor.workers().to_vec();
        executor.shutdown().unwrap();

        let deadline = Instant::now() + Duration::from_secs(1);
        for worker in &workers {
            while worker.is_alive() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            assert!(!worker.is_alive());
        }
    }

    #[test]
    fn test_submit_after_shutdown_rejected() {
        let executor = FatigueExecutor::new(2).unwrap();
        executor.shutdown().unwrap();
        assert!(executor.is_shut_down());

        let result = executor.submit(Box::new(|| Ok(())));
        assert!(matches!(result, Err(LaeError::IllegalState(_))));
        let result = executor.submit_all(vec![Box::new(|| Ok(()))]);
        assert!(matches!(result, Err(LaeError::IllegalState(_))));

        // Second shutdown is a no-op
        executor.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_cancels_blocked_submit() {
        let executor = Arc::new(FatigueExecutor::new(1).unwrap());
        executor
            .submit(Box::new(|| {
                thread::sleep(Duration::from_millis(200));
                Ok(())
            }))
            .unwrap();

        let waiting = {
            let executor = Arc::clone(&executor);
            thread::spawn(move || executor.submit(Box::new(|| Ok(()))))
        };
        let deadline = Instant::now() + Duration::from_secs(1);
        while executor.in_flight() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(executor.in_flight(), 2);

        executor.shutdown().unwrap();
        let result = waiting.join().unwrap();
        assert!(matches!(result, Err(LaeError::Cancelled)));
        assert_eq!(executor.in_flight(), 0);
    }

    #[test]
    fn test_submit_to_stopping_worker_reports_shut_down() {
        // Worker stopped behind the executor's back, as when shutdown
        // lands between the flag check and the handoff
        let executor = FatigueExecutor::new(1).unwrap();
        executor.workers()[0].shutdown();

        let result = executor.submit(Box::new(|| Ok(())));
        assert!(matches!(result, Err(LaeError::IllegalState(_))));
        assert_eq!(executor.in_flight(), 0);
    }

    #[test]
    fn test_concurrent_submitters() {
        let executor = Arc::new(FatigueExecutor::new(2).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));

        let submitters: Vec<_> = (0..4)
            .map(|_| {
                let executor = Arc::clone(&executor);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    let tasks: Vec<Task> = (0..25)
                        .map(|_| {
                            let counter = Arc::clone(&counter);
                            Box::new(move || {
                                counter.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }) as Task
                        })
                        .collect();
                    executor.submit_all(tasks).unwrap();
                })
            })
            .collect();
        for s in submitters {
            s.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert_eq!(executor.in_flight(), 0);
    }
}
