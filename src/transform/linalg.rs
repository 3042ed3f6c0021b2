//! Small dense linear-algebra helpers.
//!
//! Determinants and exterior products use closed forms and are implemented
//! for spaces of at most three dimensions only.

use nalgebra::{DMatrix, DVector};

use crate::transform_error::TransformError;

/// Largest dimension handled by the closed forms below.
pub const MAX_CLOSED_FORM_DIM: usize = 3;

/// Determinant of a square matrix of size 0 to 3.
pub fn det(m: &DMatrix<f64>) -> Result<f64, TransformError> {
    match m.shape() {
        (0, 0) => Ok(1.0),
        (1, 1) => Ok(m[(0, 0)]),
        (2, 2) => Ok(m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]),
        (3, 3) => Ok(m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
            - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
            + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])),
        (r, c) if r == c => Err(TransformError::UnsupportedConfiguration(format!(
            "determinant of a {r}x{c} matrix (closed form up to {MAX_CLOSED_FORM_DIM}x{MAX_CLOSED_FORM_DIM})"
        ))),
        (r, c) => Err(TransformError::mismatch("det", r, c)),
    }
}

/// Unsigned scale factor of an updim matrix (`(n+1) × n`, `n <= 2`): the
/// length, area or unit measure of the image of the unit cube.
pub fn exterior(m: &DMatrix<f64>) -> Result<f64, TransformError> {
    match m.shape() {
        (1, 0) => Ok(1.0),
        (2, 1) => Ok(m[(0, 0)].hypot(m[(1, 0)])),
        (3, 2) => {
            let a = [m[(0, 0)], m[(1, 0)], m[(2, 0)]];
            let b = [m[(0, 1)], m[(1, 1)], m[(2, 1)]];
            let n = cross(a, b);
            Ok((n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt())
        }
        (r, c) if r == c + 1 => Err(TransformError::UnsupportedConfiguration(format!(
            "exterior product of a {r}x{c} matrix (closed form up to todim {MAX_CLOSED_FORM_DIM})"
        ))),
        (r, c) => Err(TransformError::mismatch("exterior", c + 1, r)),
    }
}

#[inline]
fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Sign of the permutation given by `indices` (a rearrangement of `0..n`).
pub fn permutation_parity(indices: &[usize]) -> f64 {
    let mut seen = vec![false; indices.len()];
    let mut transpositions = 0usize;
    for start in 0..indices.len() {
        if seen[start] {
            continue;
        }
        let mut len = 0usize;
        let mut j = start;
        while !seen[j] {
            seen[j] = true;
            j = indices[j];
            len += 1;
        }
        transpositions += len - 1;
    }
    if transpositions % 2 == 0 { 1.0 } else { -1.0 }
}

/// Least-squares solution `d` of `A d ≈ v` via the normal equations, together
/// with the max-norm residual `|A d - v|`.
///
/// Returns `None` when `AᵀA` is singular.
pub fn least_squares(a: &DMatrix<f64>, v: &[f64]) -> Option<(Vec<f64>, f64)> {
    let rhs = DVector::from_column_slice(v);
    if a.ncols() == 0 {
        return Some((Vec::new(), max_abs(rhs.iter().copied())));
    }
    let at = a.transpose();
    let normal = &at * a;
    let d = normal.lu().solve(&(&at * &rhs))?;
    let residual = max_abs((a * &d - &rhs).iter().copied());
    Some((d.iter().copied().collect(), residual))
}

/// Max-norm of a sequence of values.
pub fn max_abs(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn closed_form_determinants() {
        assert_eq!(det(&DMatrix::zeros(0, 0)).unwrap(), 1.0);
        assert_eq!(det(&DMatrix::from_row_slice(1, 1, &[-2.0])).unwrap(), -2.0);
        let m2 = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(det(&m2).unwrap(), -2.0);
        let m3 = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 1.0, 1.0, 3.0, 2.0, 1.0, 1.0, 1.0]);
        assert_relative_eq!(det(&m3).unwrap(), m3.clone().determinant(), epsilon = 1e-12);
    }

    #[test]
    fn determinant_beyond_three_is_unsupported() {
        let m4 = DMatrix::<f64>::identity(4, 4);
        assert!(matches!(
            det(&m4),
            Err(TransformError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn exterior_measures() {
        assert_eq!(exterior(&DMatrix::zeros(1, 0)).unwrap(), 1.0);
        let edge = DMatrix::from_row_slice(2, 1, &[3.0, 4.0]);
        assert_relative_eq!(exterior(&edge).unwrap(), 5.0);
        let face = DMatrix::from_row_slice(3, 2, &[2.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        assert_relative_eq!(exterior(&face).unwrap(), 6.0);
        let big = DMatrix::<f64>::zeros(4, 3);
        assert!(matches!(
            exterior(&big),
            Err(TransformError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn parity_of_reversals() {
        assert_eq!(permutation_parity(&[0, 1, 2]), 1.0);
        assert_eq!(permutation_parity(&[1, 0]), -1.0);
        assert_eq!(permutation_parity(&[2, 1, 0]), -1.0);
        assert_eq!(permutation_parity(&[3, 2, 1, 0]), 1.0);
    }

    #[test]
    fn least_squares_exact_and_inconsistent() {
        let a = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let (d, r) = least_squares(&a, &[0.0, 0.25]).unwrap();
        assert_eq!(d, vec![0.25]);
        assert_eq!(r, 0.0);
        let (_, r) = least_squares(&a, &[0.5, 0.25]).unwrap();
        assert_relative_eq!(r, 0.5);
        let empty = DMatrix::<f64>::zeros(1, 0);
        let (d, r) = least_squares(&empty, &[0.5]).unwrap();
        assert!(d.is_empty());
        assert_eq!(r, 0.5);
    }
}
