mod orientation;

pub use orientation::*;

/// Dense row-major table of values, the exchange format with the expression tree
pub type MatrixData = Vec<Vec<f64>>;

/// Check that `data` is non-empty and rectangular, returning `(rows, cols)`.
pub fn validate_rectangular(data: &[Vec<f64>]) -> crate::error::LaeResult<(usize, usize)> {
    use crate::error::LaeError;

    let first = data
        .first()
        .ok_or_else(|| LaeError::InvalidArgument("matrix has no rows".to_string()))?;
    let cols = first.len();
    if cols == 0 {
        return Err(LaeError::InvalidArgument("matrix rows are empty".to_string()));
    }
    if let Some((row, bad)) = data.iter().enumerate().find(|(_, r)| r.len() != cols) {
        return Err(LaeError::InvalidArgument(format!(
            "jagged matrix: row {} has {} elements, expected {}",
            row,
            bad.len(),
            cols
        )));
    }
    Ok((data.len(), cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaeError;

    #[test]
    fn test_validate_rectangular() {
        assert_eq!(validate_rectangular(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap(), (2, 2));
        assert!(matches!(validate_rectangular(&[]), Err(LaeError::InvalidArgument(_))));
        assert!(matches!(validate_rectangular(&[vec![]]), Err(LaeError::InvalidArgument(_))));

        let err = validate_rectangular(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
