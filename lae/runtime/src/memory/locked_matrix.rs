//! Locked Matrix - Vector Collection With Atomic Reload
//!
//! The vector list lives behind an `Arc` that is swapped wholesale on load.
//! Readers clone the `Arc` and then lock the vectors they need, so a reader
//! that started before a reload finishes against the old vectors and never
//! sees a half-replaced list. The list lock itself is never held while
//! waiting on a vector lock.

use super::lock_view::{ReadView, WriteView};
use super::locked_vector::{LockedVector, VectorData};
use crate::error::{LaeError, LaeResult};
use crate::types::{validate_rectangular, MatrixData, Orientation};
use parking_lot::RwLock;
use std::fmt;
use std::ptr;
use std::sync::Arc;

type VectorList = Arc<[Arc<LockedVector>]>;

/// Ordered collection of same-orientation, same-length vectors
pub struct LockedMatrix {
    vectors: RwLock<VectorList>,
}

impl LockedMatrix {
    /// Create an empty matrix
    pub fn new() -> Self {
        Self {
            vectors: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Create a matrix holding `data` as row vectors
    pub fn from_row_major(data: &[Vec<f64>]) -> LaeResult<Self> {
        let matrix = Self::new();
        matrix.load_row_major(data)?;
        Ok(matrix)
    }

    /// Replace the contents with one row vector per row of `data`
    pub fn load_row_major(&self, data: &[Vec<f64>]) -> LaeResult<()> {
        validate_rectangular(data)?;
        let fresh = data
            .iter()
            .map(|row| LockedVector::new(row, Orientation::Row).map(Arc::new))
            .collect::<LaeResult<Vec<_>>>()?;
        self.replace(fresh);
        Ok(())
    }

    /// Replace the contents with one column vector per column of `data`
    pub fn load_column_major(&self, data: &[Vec<f64>]) -> LaeResult<()> {
        let (_, cols) = validate_rectangular(data)?;
        let fresh = (0..cols)
            .map(|col| {
                let column: Vec<f64> = data.iter().map(|row| row[col]).collect();
                LockedVector::new(&column, Orientation::Column).map(Arc::new)
            })
            .collect::<LaeResult<Vec<_>>>()?;
        self.replace(fresh);
        Ok(())
    }

    fn replace(&self, fresh: Vec<Arc<LockedVector>>) {
        let previous = self.snapshot();
        // Wait out anyone mid-operation on the old vectors, swap, then let go
        let view = WriteView::acquire(&previous);
        *self.vectors.write() = Arc::from(fresh);
        drop(view);
    }

    /// Current vector list. Later reloads do not affect the returned list.
    pub(crate) fn snapshot(&self) -> VectorList {
        Arc::clone(&self.vectors.read())
    }

    /// Contents as a row-major table, whatever the internal orientation
    pub fn read_row_major(&self) -> LaeResult<MatrixData> {
        let vectors = self.snapshot();
        let view = ReadView::acquire(&vectors);
        let (orientation, len) = uniform_shape(view.iter())?;

        let rows = match orientation {
            Orientation::Row => view.iter().map(|v| v.values.clone()).collect(),
            Orientation::Column => (0..len)
                .map(|row| view.iter().map(|column| column.values[row]).collect())
                .collect(),
        };
        Ok(rows)
    }

    /// Vector at `index`
    pub fn get(&self, index: usize) -> LaeResult<Arc<LockedVector>> {
        let vectors = self.snapshot();
        let _view = ReadView::acquire(&vectors);
        vectors
            .get(index)
            .cloned()
            .ok_or(LaeError::IndexOutOfRange {
                index,
                len: vectors.len(),
            })
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }

    /// Orientation of the first vector
    pub fn orientation(&self) -> LaeResult<Orientation> {
        let vectors = self.snapshot();
        let view = ReadView::acquire(&vectors);
        view.first()
            .map(|v| v.orientation)
            .ok_or_else(|| LaeError::IllegalState("matrix is empty".to_string()))
    }

    /// Per-vector copies taken under one read view
    fn contents(&self) -> Vec<VectorData> {
        let vectors = self.snapshot();
        let view = ReadView::acquire(&vectors);
        view.iter().cloned().collect()
    }
}

/// Shared orientation and length of a vector list, or why there is none
fn uniform_shape<'a>(
    mut vectors: impl Iterator<Item = &'a VectorData>,
) -> LaeResult<(Orientation, usize)> {
    let first = vectors
        .next()
        .ok_or_else(|| LaeError::IllegalState("matrix is empty".to_string()))?;
    let (orientation, len) = (first.orientation, first.values.len());
    for vector in vectors {
        if vector.orientation != orientation {
            return Err(LaeError::IllegalState(
                "matrix mixes row and column vectors".to_string(),
            ));
        }
        if vector.values.len() != len {
            return Err(LaeError::IllegalState(format!(
                "matrix is not rectangular: vector length {} differs from {}",
                vector.values.len(),
                len
            )));
        }
    }
    Ok((orientation, len))
}

impl Default for LockedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for LockedMatrix {
    fn eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        let mine = self.contents();
        let theirs = other.contents();
        mine.len() == theirs.len()
            && mine
                .iter()
                .zip(theirs.iter())
                .all(|(a, b)| a.orientation == b.orientation && a.values == b.values)
    }
}

impl fmt::Display for LockedMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vectors = self.snapshot();
        let view = ReadView::acquire(&vectors);
        for vector in view.iter() {
            writeln!(f, "{}", vector)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LockedMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.contents()).finish()
    }
}
