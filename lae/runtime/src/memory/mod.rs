//! Memory - Concurrency-Safe Matrix Storage
//!
//! Vectors are the unit of both storage and parallel work: each row task
//! mutates exactly one vector of the left operand and reads the right one.
//!
//! Key components:
//! - `LockedVector`: a row or column behind its own reader/writer lock
//! - `LockedMatrix`: an atomically reloadable list of vectors
//! - `LockView`: ordered whole-matrix lock acquisition

mod lock_view;
mod locked_matrix;
mod locked_vector;

pub use locked_matrix::LockedMatrix;
pub use locked_vector::LockedVector;
