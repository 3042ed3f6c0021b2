//! Pointwise application and derived properties: `apply`, `det`, `inv`,
//! `flipped`, the dense `matrix` and offset arithmetic.

use nalgebra::DMatrix;

use super::linalg;
use super::{Points, Transform, Variant, range_indices};
use crate::transform_error::TransformError;

/// Which axis of a point array holds the coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Each row is a point (coordinates along the last axis).
    #[default]
    Last,
    /// Each column is a point.
    First,
}

impl Transform {
    /// Map every row of `points` (`n × fromdim`) to a row of the result (`n × todim`).
    pub fn apply(&self, points: &Points) -> Result<Points, TransformError> {
        if points.ncols() != self.fromdim() {
            return Err(TransformError::mismatch("apply", self.fromdim(), points.ncols()));
        }
        let out = match self.variant() {
            Variant::Identity | Variant::Root(_) => points.clone(),
            Variant::ScaleUniform(factor) => points.map(|v| v * factor),
            Variant::Scale(factors) => {
                let mut out = points.clone();
                for (j, f) in factors.iter().enumerate() {
                    for r in 0..out.nrows() {
                        out[(r, j)] *= f;
                    }
                }
                out
            }
            Variant::Linear(matrix) => points * matrix.transpose(),
            Variant::Slice { start, stop, step } => {
                let idx = range_indices(*start, *stop, *step);
                DMatrix::from_fn(points.nrows(), idx.len(), |r, k| points[(r, idx[k] as usize)])
            }
            Variant::Affine { offset, inner } => {
                let mut out = inner.apply(points)?;
                for (j, o) in offset.iter().enumerate() {
                    for r in 0..out.nrows() {
                        out[(r, j)] += o;
                    }
                }
                out
            }
            Variant::Point => DMatrix::zeros(points.nrows(), 1),
        };
        Ok(out)
    }

    /// Like [`apply`](Self::apply), with the coordinate axis chosen explicitly.
    pub fn apply_axis(&self, points: &Points, axis: Axis) -> Result<Points, TransformError> {
        match axis {
            Axis::Last => self.apply(points),
            Axis::First => Ok(self.apply(&points.transpose())?.transpose()),
        }
    }

    /// Map a single point.
    pub fn apply_point(&self, point: &[f64]) -> Result<Vec<f64>, TransformError> {
        let row = DMatrix::from_row_slice(1, point.len(), point);
        Ok(self.apply(&row)?.iter().copied().collect())
    }

    /// Signed scale factor. For square maps the determinant of the linear
    /// part; for updims the exterior measure times `sign`.
    ///
    /// Computed once per node and cached.
    pub fn det(&self) -> Result<f64, TransformError> {
        self.det_cell().get_or_init(|| self.compute_det()).clone()
    }

    fn compute_det(&self) -> Result<f64, TransformError> {
        match self.variant() {
            Variant::Identity | Variant::Root(_) => Ok(1.0),
            Variant::ScaleUniform(factor) => Ok(factor.powi(self.todim() as i32)),
            Variant::Scale(factors) => Ok(factors.iter().product()),
            Variant::Linear(matrix) if self.is_square() => linalg::det(matrix),
            Variant::Linear(matrix) => Ok(linalg::exterior(matrix)? * f64::from(self.sign())),
            Variant::Slice { start, stop, step } => {
                let idx: Vec<usize> = range_indices(*start, *stop, *step)
                    .into_iter()
                    .map(|i| i as usize)
                    .collect();
                Ok(linalg::permutation_parity(&idx))
            }
            Variant::Affine { inner, .. } => inner.det(),
            Variant::Point => Ok(f64::from(self.sign())),
        }
    }

    /// Inverse map. Only square, non-singular transforms have one.
    pub fn inv(&self) -> Result<Transform, TransformError> {
        if !self.is_square() {
            return Err(TransformError::SingularOrNonInvertible(format!(
                "{self:?} is not square"
            )));
        }
        match self.variant() {
            Variant::Identity | Variant::Root(_) | Variant::Slice { .. } => Ok(self.clone()),
            Variant::ScaleUniform(factor) => {
                if *factor == 0.0 {
                    return Err(TransformError::SingularOrNonInvertible(format!("{self:?}")));
                }
                Ok(Transform::scale_uniform(self.todim(), 1.0 / factor))
            }
            Variant::Scale(factors) => {
                if factors.iter().any(|&f| f == 0.0) {
                    return Err(TransformError::SingularOrNonInvertible(format!("{self:?}")));
                }
                Ok(Transform::scale(
                    factors.iter().map(|f| 1.0 / f).collect::<Vec<_>>(),
                ))
            }
            Variant::Linear(matrix) => {
                let inverse = matrix
                    .clone()
                    .try_inverse()
                    .ok_or_else(|| TransformError::SingularOrNonInvertible(format!("{self:?}")))?;
                Ok(Transform::make_linear(inverse, 0))
            }
            Variant::Affine { offset, inner } => {
                // y = b + L x  <=>  x = L⁻¹ y - L⁻¹ b
                let inner_inv = inner.inv()?;
                let shift = inner_inv.apply_point(offset.as_slice())?;
                inner_inv.sub_offset(&shift)
            }
            Variant::Point => Err(TransformError::SingularOrNonInvertible(format!("{self:?}"))),
        }
    }

    /// Same map facing the other way: `sign` negated. Square transforms are
    /// returned unchanged.
    pub fn flipped(&self) -> Transform {
        if !self.is_updim() {
            return self.clone();
        }
        match self.variant() {
            Variant::Linear(matrix) => Transform::make_linear(matrix.clone(), -self.sign()),
            Variant::Point => Transform::make_point(-self.sign()),
            Variant::Affine { offset, inner } => {
                Transform::make_affine(offset.iter().copied().collect(), &inner.flipped())
            }
            _ => self.clone(),
        }
    }

    /// Dense `todim × fromdim` matrix of the linear part.
    pub fn matrix(&self) -> DMatrix<f64> {
        let n = self.todim();
        match self.variant() {
            Variant::Identity | Variant::Root(_) => DMatrix::identity(n, n),
            Variant::ScaleUniform(factor) => DMatrix::from_diagonal_element(n, n, *factor),
            Variant::Scale(factors) => DMatrix::from_diagonal(factors),
            Variant::Linear(matrix) => matrix.clone(),
            Variant::Slice { start, stop, step } => {
                let mut m = DMatrix::zeros(n, self.fromdim());
                for (k, i) in range_indices(*start, *stop, *step).into_iter().enumerate() {
                    m[(k, i as usize)] = 1.0;
                }
                m
            }
            Variant::Affine { inner, .. } => inner.matrix(),
            Variant::Point => DMatrix::zeros(1, 0),
        }
    }

    /// `self + offset`. A zero offset returns `self`; an affine transform
    /// absorbs the offset into its own.
    pub fn add_offset(&self, offset: &[f64]) -> Result<Transform, TransformError> {
        if offset.len() != self.todim() {
            return Err(TransformError::mismatch("add_offset", self.todim(), offset.len()));
        }
        if offset.iter().all(|&v| v == 0.0) {
            return Ok(self.clone());
        }
        match self.variant() {
            Variant::Affine { offset: own, inner } => {
                let sum: Vec<f64> = own.iter().zip(offset).map(|(a, b)| a + b).collect();
                inner.add_offset(&sum)
            }
            _ => Ok(Transform::make_affine(offset.to_vec(), self)),
        }
    }

    /// `self - offset`.
    pub fn sub_offset(&self, offset: &[f64]) -> Result<Transform, TransformError> {
        let negated: Vec<f64> = offset.iter().map(|v| -v).collect();
        self.add_offset(&negated)
    }

    /// Split into the linear part and the offset (zero when not affine).
    pub fn split_linear_offset(&self) -> (Transform, Vec<f64>) {
        match self.variant() {
            Variant::Affine { offset, inner } => (inner.clone(), offset.iter().copied().collect()),
            _ => (self.clone(), vec![0.0; self.todim()]),
        }
    }
}
