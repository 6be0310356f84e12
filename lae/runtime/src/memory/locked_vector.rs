//! Locked Vector - Reader/Writer Guarded Numeric Sequence
//!
//! Every access goes through the vector's own `RwLock`. Two-vector
//! operations lock the receiver and only ever read the argument through
//! the argument's public accessors, one short read lock per element.
//! Receiver and argument never swap roles, which rules out circular waits
//! between row tasks running in parallel.

use super::lock_view::ReadView;
use super::locked_matrix::LockedMatrix;
use crate::error::{LaeError, LaeResult};
use crate::types::Orientation;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::ptr;

/// Guarded contents of a vector
#[derive(Clone, Debug)]
pub(crate) struct VectorData {
    pub(crate) values: Vec<f64>,
    pub(crate) orientation: Orientation,
}

/// A row or column of doubles behind a single reader/writer lock
pub struct LockedVector {
    data: RwLock<VectorData>,
}

impl LockedVector {
    /// Deep-copy `values` into a new vector. Empty input is rejected.
    pub fn new(values: &[f64], orientation: Orientation) -> LaeResult<Self> {
        if values.is_empty() {
            return Err(LaeError::InvalidArgument(
                "vector must hold at least one element".to_string(),
            ));
        }
        Ok(Self {
            data: RwLock::new(VectorData {
                values: values.to_vec(),
                orientation,
            }),
        })
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, VectorData> {
        self.data.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, VectorData> {
        self.data.write()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> LaeResult<f64> {
        let data = self.read();
        data.values
            .get(index)
            .copied()
            .ok_or(LaeError::IndexOutOfRange {
                index,
                len: data.values.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().values.is_empty()
    }

    pub fn orientation(&self) -> Orientation {
        self.read().orientation
    }

    /// Copy of the current elements
    pub fn to_vec(&self) -> Vec<f64> {
        self.read().values.clone()
    }

    /// Flip the orientation tag. Element order is left as is.
    pub fn transpose(&self) {
        let mut data = self.write();
        data.orientation = data.orientation.flipped();
    }

    /// In-place elementwise sum with `other`
    pub fn add(&self, other: &LockedVector) -> LaeResult<()> {
        if ptr::eq(self, other) {
            // Re-locking ourselves for reading would deadlock
            let mut data = self.write();
            for value in data.values.iter_mut() {
                *value += *value;
            }
            return Ok(());
        }

        let mut data = self.write();
        let len = other.len();
        if len != data.values.len() {
            return Err(LaeError::DimensionMismatch {
                expected: data.values.len(),
                found: len,
            });
        }
        let orientation = other.orientation();
        if orientation != data.orientation {
            return Err(LaeError::orientation(data.orientation, orientation));
        }

        for (i, value) in data.values.iter_mut().enumerate() {
            *value += other.get(i)?;
        }
        Ok(())
    }

    /// In-place sign flip of every element
    pub fn negate(&self) {
        let mut data = self.write();
        for value in data.values.iter_mut() {
            *value = -*value;
        }
    }

    /// Scalar product of a row with a column of equal length
    pub fn dot(&self, other: &LockedVector) -> LaeResult<f64> {
        if ptr::eq(self, other) {
            let orientation = self.orientation();
            return Err(LaeError::orientation(orientation.flipped(), orientation));
        }
        let data = self.read();
        dot_with(&data, other)
    }

    /// Replace this row with `self × matrix`, where `matrix` is column-major.
    ///
    /// The result has one element per column of `matrix`, so the vector's
    /// length changes whenever the matrix is not square.
    pub fn vec_mat_mul(&self, matrix: &LockedMatrix) -> LaeResult<()> {
        let columns = matrix.snapshot();
        if columns.iter().any(|c| ptr::eq(c.as_ref(), self)) {
            return Err(LaeError::InvalidArgument(
                "vector cannot be multiplied by a matrix that contains it".to_string(),
            ));
        }

        let mut data = self.write();
        if data.orientation != Orientation::Row {
            return Err(LaeError::orientation(Orientation::Row, data.orientation));
        }

        let matrix_orientation = {
            let view = ReadView::acquire(&columns);
            view.first().map(|v| v.orientation).ok_or_else(|| {
                LaeError::IllegalState("cannot multiply by an empty matrix".to_string())
            })?
        };
        if matrix_orientation != Orientation::Column {
            return Err(LaeError::orientation(Orientation::Column, matrix_orientation));
        }

        let result = columns
            .iter()
            .map(|column| dot_with(&data, column))
            .collect::<LaeResult<Vec<f64>>>()?;
        data.values = result;
        Ok(())
    }
}

/// Dot product of locked contents with a vector read through its own lock
fn dot_with(data: &VectorData, other: &LockedVector) -> LaeResult<f64> {
    let len = other.len();
    if len != data.values.len() {
        return Err(LaeError::DimensionMismatch {
            expected: data.values.len(),
            found: len,
        });
    }
    let orientation = other.orientation();
    if orientation == data.orientation {
        return Err(LaeError::orientation(data.orientation.flipped(), orientation));
    }

    let mut sum = 0.0;
    for (i, value) in data.values.iter().enumerate() {
        sum += value * other.get(i)?;
    }
    Ok(sum)
}

impl PartialEq for LockedVector {
    fn eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        // Never hold both locks at once
        let mine = self.read().clone();
        let theirs = other.read();
        mine.orientation == theirs.orientation && mine.values == theirs.values
    }
}

impl fmt::Display for VectorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.orientation {
            Orientation::Row => {
                write!(f, "[")?;
                for (i, value) in self.values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:?}", value)?;
                }
                write!(f, "]")
            }
            Orientation::Column => {
                for (i, value) in self.values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "| {:?} |", value)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for LockedVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.read(), f)
    }
}

impl fmt::Debug for LockedVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        f.debug_struct("LockedVector")
            .field("orientation", &data.orientation)
            .field("values", &data.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    fn row(values: &[f64]) -> LockedVector {
        LockedVector::new(values, Orientation::Row).unwrap()
    }

    fn column(values: &[f64]) -> LockedVector {
        LockedVector::new(values, Orientation::Column).unwrap()
    }

    #[test]
    fn test_vector_creation() {
        let v = row(&[1.0, 2.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.orientation(), Orientation::Row);
        assert_eq!(v.get(2).unwrap(), 3.0);
        assert!(!v.is_empty());
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = LockedVector::new(&[], Orientation::Row).unwrap_err();
        assert!(matches!(err, LaeError::InvalidArgument(_)));
    }

    #[test]
    fn test_deep_copy_on_construction() {
        let mut source = vec![1.0, 2.0];
        let v = row(&source);
        source[0] = 99.0;
        assert_eq!(v.get(0).unwrap(), 1.0);
    }

    #[test]
    fn test_get_out_of_range() {
        let v = row(&[1.0, 2.0]);
        let err = v.get(2).unwrap_err();
        assert!(matches!(err, LaeError::IndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_transpose_relabels_only() {
        let v = row(&[1.0, 2.0, 3.0]);
        v.transpose();
        assert_eq!(v.orientation(), Orientation::Column);
        assert_eq!(v.to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_add() {
        let a = row(&[1.0, 2.0, 3.0]);
        let b = row(&[10.0, 20.0, 30.0]);
        a.add(&b).unwrap();
        assert_eq!(a.to_vec(), vec![11.0, 22.0, 33.0]);
        assert_eq!(b.to_vec(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_self_add_doubles() {
        let a = row(&[1.0, -2.5]);
        a.add(&a).unwrap();
        assert_eq!(a.to_vec(), vec![2.0, -5.0]);
    }

    #[test]
    fn test_add_mismatches() {
        let a = row(&[1.0, 2.0]);
        assert!(matches!(
            a.add(&row(&[1.0])),
            Err(LaeError::DimensionMismatch { expected: 2, found: 1 })
        ));
        assert!(matches!(
            a.add(&column(&[1.0, 2.0])),
            Err(LaeError::OrientationMismatch(_))
        ));
        // Failed adds leave the receiver untouched
        assert_eq!(a.to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_negate_preserves_signed_zero() {
        let v = row(&[0.0, -0.0, 4.0]);
        v.negate();
        let negated = v.to_vec();
        assert!(negated[0].is_sign_negative());
        assert!(negated[1].is_sign_positive());
        assert_eq!(negated[2], -4.0);
    }

    #[test]
    fn test_dot() {
        assert_eq!(row(&[1.0, 2.0, 3.0]).dot(&column(&[4.0, 5.0, 6.0])).unwrap(), 32.0);
        assert_eq!(row(&[1.0, -2.0, 3.0]).dot(&column(&[-4.0, 5.0, -6.0])).unwrap(), -32.0);
    }

    #[test]
    fn test_dot_requires_opposite_orientation() {
        let a = row(&[1.0, 2.0]);
        assert!(matches!(a.dot(&row(&[1.0, 2.0])), Err(LaeError::OrientationMismatch(_))));
        assert!(matches!(a.dot(&a), Err(LaeError::OrientationMismatch(_))));
        assert!(matches!(
            a.dot(&column(&[1.0])),
            Err(LaeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_vec_mat_mul() {
        let v = row(&[1.0, 2.0, 3.0]);
        let m = LockedMatrix::new();
        m.load_column_major(&[
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
            vec![10.0, 11.0, 12.0],
        ])
        .unwrap();
        v.vec_mat_mul(&m).unwrap();
        assert_eq!(v.to_vec(), vec![48.0, 54.0, 60.0]);
        assert_eq!(v.orientation(), Orientation::Row);
    }

    #[test]
    fn test_vec_mat_mul_identity_and_zero() {
        let identity = LockedMatrix::new();
        identity
            .load_column_major(&[vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();
        let v = row(&[3.0, -7.0]);
        v.vec_mat_mul(&identity).unwrap();
        assert_eq!(v.to_vec(), vec![3.0, -7.0]);

        let zero = LockedMatrix::new();
        zero.load_column_major(&[vec![0.0, 0.0], vec![0.0, 0.0]]).unwrap();
        v.vec_mat_mul(&zero).unwrap();
        assert_eq!(v.to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_vec_mat_mul_changes_length() {
        // 1x2 times 2x3
        let v = row(&[1.0, 1.0]);
        let m = LockedMatrix::new();
        m.load_column_major(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        v.vec_mat_mul(&m).unwrap();
        assert_eq!(v.to_vec(), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_vec_mat_mul_preconditions() {
        let row_major = LockedMatrix::from_row_major(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let v = row(&[1.0, 1.0]);
        assert!(matches!(
            v.vec_mat_mul(&row_major),
            Err(LaeError::OrientationMismatch(_))
        ));

        let columns = LockedMatrix::new();
        columns.load_column_major(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let c = column(&[1.0, 1.0]);
        assert!(matches!(c.vec_mat_mul(&columns), Err(LaeError::OrientationMismatch(_))));

        let short = row(&[1.0, 1.0, 1.0]);
        assert!(matches!(
            short.vec_mat_mul(&columns),
            Err(LaeError::DimensionMismatch { .. })
        ));
        assert_eq!(short.len(), 3);

        assert!(matches!(
            v.vec_mat_mul(&LockedMatrix::new()),
            Err(LaeError::IllegalState(_))
        ));
    }

    #[test]
    fn test_vec_mat_mul_rejects_own_matrix() {
        let m = LockedMatrix::from_row_major(&[vec![1.0, 2.0]]).unwrap();
        let member = m.get(0).unwrap();
        assert!(matches!(member.vec_mat_mul(&m), Err(LaeError::InvalidArgument(_))));
    }

    #[test]
    fn test_equality() {
        assert_eq!(row(&[1.0, 2.0]), row(&[1.0, 2.0]));
        assert_ne!(row(&[1.0, 2.0]), column(&[1.0, 2.0]));
        assert_ne!(row(&[1.0, 2.0]), row(&[1.0, 2.0, 3.0]));
        assert_ne!(row(&[1.0, 2.0]), row(&[1.0, 2.5]));
        let v = row(&[1.0]);
        assert_eq!(v, v);
    }

    #[test]
    fn test_display() {
        assert_eq!(row(&[1.0, 2.5, -3.0]).to_string(), "[1.0 2.5 -3.0]");
        assert_eq!(column(&[1.0, 2.0]).to_string(), "| 1.0 |\n| 2.0 |");
    }

    #[test]
    fn test_concurrent_adds_into_distinct_rows() {
        let source = Arc::new(row(&[1.0; 16]));
        let targets: Vec<Arc<LockedVector>> = (0..8).map(|_| Arc::new(row(&[0.0; 16]))).collect();

        let handles: Vec<_> = targets
            .iter()
            .map(|target| {
                let target = Arc::clone(target);
                let source = Arc::clone(&source);
                thread::spawn(move || {
                    for _ in 0..100 {
                        target.add(&source).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for target in &targets {
            assert!(target.to_vec().iter().all(|&v| v == 100.0));
        }
        assert_eq!(source.to_vec(), vec![1.0; 16]);
    }

    fn orientation_strategy() -> impl Strategy<Value = Orientation> {
        prop_oneof![Just(Orientation::Row), Just(Orientation::Column)]
    }

    proptest! {
        #[test]
        fn prop_transpose_twice_is_identity(
            values in prop::collection::vec(-1e6f64..1e6, 1..32),
            orientation in orientation_strategy(),
        ) {
            let v = LockedVector::new(&values, orientation).unwrap();
            v.transpose();
            v.transpose();
            prop_assert_eq!(v, LockedVector::new(&values, orientation).unwrap());
        }

        #[test]
        fn prop_negate_twice_is_identity(
            values in prop::collection::vec(-1e6f64..1e6, 1..32),
        ) {
            let v = row(&values);
            v.negate();
            v.negate();
            let back = v.to_vec();
            for (a, b) in back.iter().zip(values.iter()) {
                prop_assert_eq!(a.to_bits(), b.to_bits());
            }
        }

        #[test]
        fn prop_add_is_elementwise_and_leaves_argument(
            pairs in prop::collection::vec((-1e6f64..1e6, -1e6f64..1e6), 1..32),
            orientation in orientation_strategy(),
        ) {
            let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let a = LockedVector::new(&xs, orientation).unwrap();
            let b = LockedVector::new(&ys, orientation).unwrap();
            a.add(&b).unwrap();
            prop_assert_eq!(b.to_vec(), ys.clone());
            for (i, sum) in a.to_vec().into_iter().enumerate() {
                prop_assert_eq!(sum, xs[i] + ys[i]);
            }
        }
    }
}
