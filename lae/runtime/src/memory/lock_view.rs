//! Ordered Lock Views - Whole-Matrix Locking
//!
//! Holds one guard per vector of a matrix so that a multi-vector read or
//! replacement sees a consistent picture. Guards are taken in ascending
//! vector index order and released in descending order, so two threads
//! viewing overlapping vector sets can never wait on each other in a cycle.

use super::locked_vector::{LockedVector, VectorData};
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use std::ops::Deref;
use std::sync::Arc;

/// Stack of held vector guards, popped in reverse on drop
pub(crate) struct LockView<G> {
    guards: Vec<G>,
}

/// Shared view over every vector of a matrix
pub(crate) type ReadView<'a> = LockView<RwLockReadGuard<'a, VectorData>>;

/// Exclusive view over every vector of a matrix
pub(crate) type WriteView<'a> = LockView<RwLockWriteGuard<'a, VectorData>>;

impl<'a> ReadView<'a> {
    /// Read-lock every vector, lowest index first
    pub(crate) fn acquire(vectors: &'a [Arc<LockedVector>]) -> Self {
        let mut guards = Vec::with_capacity(vectors.len());
        for vector in vectors {
            guards.push(vector.read());
        }
        LockView { guards }
    }
}

impl<'a> WriteView<'a> {
    /// Write-lock every vector, lowest index first
    pub(crate) fn acquire(vectors: &'a [Arc<LockedVector>]) -> Self {
        let mut guards = Vec::with_capacity(vectors.len());
        for vector in vectors {
            guards.push(vector.write());
        }
        LockView { guards }
    }
}

impl<G> LockView<G> {
    /// Number of held guards
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.guards.len()
    }
}

impl<G: Deref<Target = VectorData>> LockView<G> {
    /// Locked vector contents, in index order
    pub(crate) fn iter(&self) -> impl Iterator<Item = &VectorData> {
        self.guards.iter().map(|g| g.deref())
    }

    pub(crate) fn first(&self) -> Option<&VectorData> {
        self.guards.first().map(|g| g.deref())
    }
}

impl<G> Drop for LockView<G> {
    fn drop(&mut self) {
        // Vec drops front to back; release highest index first instead
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}
