//! LAE Runtime - Parallel Linear Algebra Over Expression Trees
//!
//! Key components:
//! - `memory`: vectors and matrices guarded by per-vector reader/writer locks
//! - `scheduling`: fatigue-aware worker pool that runs row tasks
//! - `tree`: expression trees plus their JSON input and output
//! - `engine`: reduces a tree to a literal one operator at a time

pub mod engine;
pub mod error;
pub mod memory;
pub mod scheduling;
pub mod tree;
pub mod types;

pub use engine::{EngineConfig, LinearAlgebraEngine};
pub use error::*;
pub use memory::{LockedMatrix, LockedVector};
pub use scheduling::{
    ExecutorConfig, ExecutorReport, FatigueExecutor, FatigueWorker, SequentialExecutor, Task,
    TaskExecutor, WorkerStats,
};
pub use tree::{ComputationNode, ExpressionNode, NodeKind, RunOutput};
pub use types::*;
