//! Fatigue Worker - One Thread, One Pending Task
//!
//! Each worker owns a dedicated thread fed through a bounded channel of
//! capacity 1. Assignment never blocks: a full slot is an error, because
//! the executor only hands work to workers it has just taken off the idle
//! queue. Shutdown is the one blocking send, so the sentinel always lands
//! after whatever task is already pending.

use crate::error::{LaeError, LaeResult};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{trace, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::cmp::Ordering as CmpOrdering;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A unit of work. Returning `Err` or panicking counts as a failed task.
pub type Task = Box<dyn FnOnce() -> LaeResult<()> + Send + 'static>;

/// Runs on the worker thread after a task's time has been accounted
pub(crate) type Completion = Box<dyn FnOnce() + Send + 'static>;

enum Handoff {
    Run {
        task: Task,
        on_complete: Option<Completion>,
    },
    Shutdown,
}

/// Counters shared between the worker handle and its thread
struct WorkerState {
    id: usize,
    fatigue_factor: f64,
    busy_nanos: AtomicU64,
    idle_nanos: AtomicU64,
    busy: AtomicBool,
    running: AtomicBool,
    stopping: AtomicBool,
}

impl WorkerState {
    fn record_busy(&self, elapsed: Duration) {
        self.busy_nanos.fetch_add(as_nanos(elapsed), Ordering::Relaxed);
    }

    fn record_idle(&self, elapsed: Duration) {
        self.idle_nanos.fetch_add(as_nanos(elapsed), Ordering::Relaxed);
    }
}

fn as_nanos(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

/// Worker thread whose fatigue grows with the time it spends busy
pub struct FatigueWorker {
    state: Arc<WorkerState>,
    handoff: Sender<Handoff>,
    receiver: Mutex<Option<Receiver<Handoff>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FatigueWorker {
    /// Create an unstarted worker. `fatigue_factor` scales busy time into fatigue.
    pub fn new(id: usize, fatigue_factor: f64) -> Self {
        let (handoff, receiver) = bounded(1);
        Self {
            state: Arc::new(WorkerState {
                id,
                fatigue_factor,
                busy_nanos: AtomicU64::new(0),
                idle_nanos: AtomicU64::new(0),
                busy: AtomicBool::new(false),
                running: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
            }),
            handoff,
            receiver: Mutex::new(Some(receiver)),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the worker thread
    pub fn start(&self) -> LaeResult<()> {
        let receiver = self.receiver.lock().take().ok_or_else(|| {
            LaeError::IllegalState(format!("worker {} already started", self.state.id))
        })?;
        let state = Arc::clone(&self.state);
        state.running.store(true, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name(format!("fatigue-worker-{} (ff={:.2})", state.id, state.fatigue_factor))
            .spawn(move || run_worker(state, receiver));
        match spawned {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.running.store(false, Ordering::SeqCst);
                Err(LaeError::Io(e))
            }
        }
    }

    /// Hand `task` to this worker without blocking.
    ///
    /// Fails if a task is already pending or shutdown has begun.
    pub fn assign(&self, task: Task) -> LaeResult<()> {
        self.send(Handoff::Run {
            task,
            on_complete: None,
        })
    }

    pub(crate) fn assign_with_completion(&self, task: Task, on_complete: Completion) -> LaeResult<()> {
        self.send(Handoff::Run {
            task,
            on_complete: Some(on_complete),
        })
    }

    fn send(&self, item: Handoff) -> LaeResult<()> {
        if self.state.stopping.load(Ordering::SeqCst) {
            return Err(LaeError::WorkerShutdown(self.state.id));
        }
        match self.handoff.try_send(item) {
            Ok(()) => {
                trace!("worker {} accepted a task", self.state.id);
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(LaeError::WorkerBusy(self.state.id)),
            Err(TrySendError::Disconnected(_)) => Err(LaeError::WorkerShutdown(self.state.id)),
        }
    }

    /// Queue the stop sentinel, waiting for the pending slot to free up.
    ///
    /// On an unstarted worker whose slot is full this blocks forever.
    pub fn shutdown(&self) {
        self.state.stopping.store(true, Ordering::SeqCst);
        // A closed channel means the thread is already gone
        let _ = self.handoff.send(Handoff::Shutdown);
    }

    /// Wait for the worker thread to exit
    pub fn join(&self) -> LaeResult<()> {
        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => handle.join().map_err(|_| {
                LaeError::IllegalState(format!("worker {} thread panicked", self.state.id))
            }),
            None => Ok(()),
        }
    }

    pub fn id(&self) -> usize {
        self.state.id
    }

    pub fn fatigue_factor(&self) -> f64 {
        self.state.fatigue_factor
    }

    /// `fatigue_factor × cumulative busy time`, in nanosecond units
    pub fn fatigue(&self) -> f64 {
        self.state.fatigue_factor * self.busy_nanos() as f64
    }

    pub fn busy_nanos(&self) -> u64 {
        self.state.busy_nanos.load(Ordering::Relaxed)
    }

    pub fn idle_nanos(&self) -> u64 {
        self.state.idle_nanos.load(Ordering::Relaxed)
    }

    /// Whether a task is executing right now
    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::SeqCst)
    }

    /// Whether the worker thread has started and not yet exited
    pub fn is_alive(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Less fatigued workers order first
    pub fn compare_fatigue(&self, other: &FatigueWorker) -> CmpOrdering {
        self.fatigue().total_cmp(&other.fatigue())
    }

    #[cfg(test)]
    fn add_busy_time(&self, elapsed: Duration) {
        self.state.record_busy(elapsed);
    }
}

impl std::fmt::Debug for FatigueWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FatigueWorker")
            .field("id", &self.state.id)
            .field("fatigue_factor", &self.state.fatigue_factor)
            .field("fatigue", &self.fatigue())
            .field("alive", &self.is_alive())
            .finish()
    }
}

fn run_worker(state: Arc<WorkerState>, receiver: Receiver<Handoff>) {
    loop {
        let idle_since = Instant::now();
        let Ok(item) = receiver.recv() else {
            break;
        };
        let started = Instant::now();
        state.record_idle(started - idle_since);

        let (task, on_complete) = match item {
            Handoff::Run { task, on_complete } => (task, on_complete),
            Handoff::Shutdown => break,
        };

        state.busy.store(true, Ordering::SeqCst);
        match catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("worker {} task failed: {}", state.id, e),
            Err(payload) => warn!(
                "worker {} task panicked: {}",
                state.id,
                panic_message(payload.as_ref())
            ),
        }
        state.record_busy(started.elapsed());
        state.busy.store(false, Ordering::SeqCst);

        if let Some(on_complete) = on_complete {
            on_complete();
        }
    }
    trace!("worker {} stopped", state.id);
    state.running.store(false, Ordering::SeqCst);
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
