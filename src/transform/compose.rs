//! Composition algebra.
//!
//! `a.compose(&b)` is the map "apply `b`, then `a`". Rules are tried from the
//! most specific pair of variants down to a dense matrix product, so the
//! result keeps the cheapest representation available.

use std::ops::Mul;

use nalgebra::DMatrix;

use super::{Transform, Variant};
use crate::transform_error::TransformError;

impl Transform {
    /// `self ∘ other`. Requires `self.fromdim() == other.todim()`.
    pub fn compose(&self, other: &Transform) -> Result<Transform, TransformError> {
        if self.fromdim() != other.todim() {
            return Err(TransformError::mismatch("compose", self.fromdim(), other.todim()));
        }
        match (self.variant(), other.variant()) {
            (Variant::Identity | Variant::Root(_), _) => Ok(other.clone()),
            (_, Variant::Identity | Variant::Root(_)) => Ok(self.clone()),

            // a + L(b + M x) = (L∘M) + (a + L b)
            (
                Variant::Affine { offset: a, inner: l },
                Variant::Affine { offset: b, inner: m },
            ) => {
                let lb = l.apply_point(b.as_slice())?;
                let shift: Vec<f64> = a.iter().zip(lb).map(|(x, y)| x + y).collect();
                l.compose(m)?.add_offset(&shift)
            }
            (Variant::Affine { offset, inner }, _) => inner.compose(other)?.add_offset(offset.as_slice()),
            (_, Variant::Affine { offset, inner }) => {
                let shift = self.apply_point(offset.as_slice())?;
                self.compose(inner)?.add_offset(&shift)
            }

            (Variant::ScaleUniform(f), Variant::ScaleUniform(g)) => {
                Ok(Transform::scale_uniform(self.todim(), f * g))
            }
            (
                Variant::ScaleUniform(_) | Variant::Scale(_),
                Variant::ScaleUniform(_) | Variant::Scale(_),
            ) => {
                let (fa, fb) = (self.diagonal_or_empty(), other.diagonal_or_empty());
                Ok(Transform::scale(
                    fa.iter().zip(&fb).map(|(x, y)| x * y).collect::<Vec<_>>(),
                ))
            }

            (
                Variant::Slice { start: s1, step: k1, .. },
                Variant::Slice { start: s2, step: k2, .. },
            ) => {
                // out[k] = in[s2 + (s1 + k*k1)*k2]
                Ok(Transform::make_slice(other.fromdim(), s2 + s1 * k2, k1 * k2))
            }

            (Variant::ScaleUniform(_) | Variant::Scale(_), Variant::Linear(m)) => {
                let factors = self.diagonal_or_empty();
                let mut scaled = m.clone();
                for (i, f) in factors.iter().enumerate() {
                    scaled.row_mut(i).scale_mut(*f);
                }
                Ok(Transform::make_linear(scaled, other.sign()))
            }
            (Variant::Linear(m), Variant::ScaleUniform(_) | Variant::Scale(_)) => {
                let factors = other.diagonal_or_empty();
                let mut scaled = m.clone();
                for (j, f) in factors.iter().enumerate() {
                    scaled.column_mut(j).scale_mut(*f);
                }
                Ok(Transform::make_linear(scaled, self.sign()))
            }

            _ => dense_product(self, other),
        }
    }

    fn diagonal_or_empty(&self) -> Vec<f64> {
        self.diagonal().unwrap_or_default()
    }
}

fn dense_product(a: &Transform, b: &Transform) -> Result<Transform, TransformError> {
    let sign = a.sign() + b.sign();
    if a.is_updim() && b.is_updim() {
        return Err(TransformError::UnsupportedConfiguration(format!(
            "composing two updims ({a:?} ∘ {b:?}) raises dimension by two"
        )));
    }
    Ok(Transform::make_linear(a.matrix() * b.matrix(), sign))
}

impl Mul<&Transform> for &Transform {
    type Output = Result<Transform, TransformError>;

    fn mul(self, rhs: &Transform) -> Self::Output {
        self.compose(rhs)
    }
}

fn common_uniform_factor(a: &Transform, b: &Transform) -> Option<f64> {
    match (a.uniform_factor(), b.uniform_factor()) {
        (Some(fa), Some(fb)) if fa == fb => Some(fa),
        _ => None,
    }
}

/// Tensor (block-diagonal) product: `a` acts on the leading coordinates, `b`
/// on the trailing ones.
pub fn tensor(a: &Transform, b: &Transform) -> Result<Transform, TransformError> {
    let (la, oa) = a.split_linear_offset();
    let (lb, ob) = b.split_linear_offset();
    let offset: Vec<f64> = oa.into_iter().chain(ob).collect();
    let todim = la.todim() + lb.todim();
    let fromdim = la.fromdim() + lb.fromdim();

    let is_identity = |t: &Transform| matches!(t.variant(), Variant::Identity | Variant::Root(_));
    let linear = if is_identity(&la) && is_identity(&lb) {
        Transform::identity(todim)
    } else if let Some(f) = common_uniform_factor(&la, &lb) {
        Transform::scale_uniform(fromdim, f)
    } else if let (Some(da), Some(db)) = (la.diagonal(), lb.diagonal()) {
        Transform::scale(da.into_iter().chain(db).collect::<Vec<_>>())
    } else {
        let mut matrix = DMatrix::zeros(todim, fromdim);
        matrix
            .view_mut((0, 0), (la.todim(), la.fromdim()))
            .copy_from(&la.matrix());
        matrix
            .view_mut((la.todim(), la.fromdim()), (lb.todim(), lb.fromdim()))
            .copy_from(&lb.matrix());
        let dims = (la.todim(), la.fromdim(), lb.todim(), lb.fromdim());
        // TODO: derive the orientation from the block structure for any dimension.
        let sign = match dims {
            (ta, fa, tb, fb) if ta == fa && tb == fb => 0,
            (1, 0, 1, 1) => -la.sign(),
            (1, 1, 1, 0) => lb.sign(),
            (1, 0, 2, 2) => la.sign(),
            (1, 1, 2, 1) => lb.sign(),
            (ta, fa, tb, fb) => {
                return Err(TransformError::UnsupportedConfiguration(format!(
                    "tensor orientation of [{ta}<-{fa}] x [{tb}<-{fb}]"
                )));
            }
        };
        Transform::linear(matrix, sign)?
    };
    linear.add_offset(&offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_same_point(x: &[f64], y: &[f64]) {
        assert_eq!(x.len(), y.len());
        for (u, v) in x.iter().zip(y) {
            assert_relative_eq!(u, v, epsilon = 1e-12);
        }
    }

    #[test]
    fn uniform_scales_multiply() {
        let s = Transform::scale_uniform(2, 0.5);
        let ss = s.compose(&s).unwrap();
        assert_eq!(ss, Transform::scale_uniform(2, 0.25));
        assert_eq!(ss.apply_point(&[4.0, 4.0]).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn identity_laws() {
        let s = Transform::scale(vec![2.0, 3.0]);
        let id = Transform::identity(2);
        assert_eq!(id.compose(&s).unwrap(), s);
        assert_eq!(s.compose(&id).unwrap(), s);
        let edge = Transform::linear(DMatrix::from_row_slice(2, 1, &[1.0, 0.0]), -1).unwrap();
        assert_eq!(id.compose(&edge).unwrap(), edge);
    }

    #[test]
    fn mismatch_rejected() {
        let a = Transform::identity(2);
        let b = Transform::scale_uniform(3, 2.0);
        assert!(matches!(
            a.compose(&b),
            Err(TransformError::DimensionMismatch { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn scales_mix_elementwise() {
        let a = Transform::scale(vec![2.0, 4.0]);
        let b = Transform::scale_uniform(2, 0.5);
        assert_eq!(a.compose(&b).unwrap(), Transform::scale(vec![1.0, 2.0]));
        assert_eq!((&b * &a).unwrap(), Transform::scale(vec![1.0, 2.0]));
    }

    #[test]
    fn slices_nest() {
        let rev = Transform::slice(3, 2, -1, -1).unwrap();
        let fwd = Transform::slice(3, 0, 3, 1).unwrap();
        assert_eq!(rev.compose(&rev).unwrap(), fwd);
        assert_eq!(rev.compose(&fwd).unwrap(), rev);
    }

    #[test]
    fn affine_unwraps() {
        let child = Transform::scale_uniform(2, 0.5).add_offset(&[0.5, 0.0]).unwrap();
        let grandchild = Transform::scale_uniform(2, 0.5).add_offset(&[0.0, 0.5]).unwrap();
        let both = child.compose(&grandchild).unwrap();
        assert_eq!(both.inner(), Some(&Transform::scale_uniform(2, 0.25)));
        assert_eq!(both.offset(), Some(&[0.5, 0.25][..]));
        let x = [0.2, 0.6];
        let direct = child.apply_point(&grandchild.apply_point(&x).unwrap()).unwrap();
        assert_same_point(&both.apply_point(&x).unwrap(), &direct);
    }

    #[test]
    fn scale_with_updim_keeps_sign() {
        let edge = Transform::linear(DMatrix::from_row_slice(2, 1, &[0.0, 1.0]), 1).unwrap();
        let s = Transform::scale(vec![2.0, 3.0]);
        let composed = s.compose(&edge).unwrap();
        assert_eq!(composed.sign(), 1);
        assert_relative_eq!(composed.det().unwrap(), 3.0);
        let t = Transform::scale_uniform(1, 0.5);
        let composed = edge.compose(&t).unwrap();
        assert_eq!(composed.sign(), 1);
        assert_relative_eq!(composed.det().unwrap(), 0.5);
    }

    #[test]
    fn dense_fallback_and_double_updim() {
        let rot = Transform::linear(DMatrix::from_row_slice(2, 2, &[0.0, -1.0, 1.0, 0.0]), 0).unwrap();
        let rev = Transform::slice(2, 1, -1, -1).unwrap();
        let prod = rot.compose(&rev).unwrap();
        assert_eq!(prod.kind(), crate::transform::TransformKind::Linear);
        let x = [1.0, 2.0];
        let stepwise = rot.apply_point(&rev.apply_point(&x).unwrap()).unwrap();
        assert_same_point(&prod.apply_point(&x).unwrap(), &stepwise);
        assert_eq!(stepwise, vec![-1.0, 2.0]);

        let face = Transform::linear(DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]), 1).unwrap();
        let edge = Transform::linear(DMatrix::from_row_slice(2, 1, &[1.0, 0.0]), 1).unwrap();
        assert!(matches!(
            face.compose(&edge),
            Err(TransformError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn point_into_line() {
        let p = Transform::point(1).unwrap().add_offset(&[1.0]).unwrap();
        let s = Transform::scale_uniform(1, 0.5).add_offset(&[0.5]).unwrap();
        let composed = s.compose(&p).unwrap();
        assert_eq!(composed.apply_point(&[]).unwrap(), vec![1.0]);
        assert_eq!(composed.sign(), 1);
    }

    #[test]
    fn tensor_products() {
        let id = tensor(&Transform::identity(1), &Transform::identity(2)).unwrap();
        assert_eq!(id, Transform::identity(3));

        let half = Transform::scale_uniform(1, 0.5);
        assert_eq!(tensor(&half, &half).unwrap(), Transform::scale_uniform(2, 0.5));

        let mixed = tensor(&half.add_offset(&[0.5]).unwrap(), &Transform::scale(vec![2.0])).unwrap();
        assert_eq!(mixed.inner(), Some(&Transform::scale(vec![0.5, 2.0])));
        assert_eq!(mixed.offset(), Some(&[0.5, 0.0][..]));

        // left edge of a unit square as Point ⊗ Identity
        let left = tensor(&Transform::point(-1).unwrap(), &Transform::identity(1)).unwrap();
        assert_eq!((left.todim(), left.fromdim(), left.sign()), (2, 1, 1));
        assert_eq!(left.apply_point(&[0.25]).unwrap(), vec![0.0, 0.25]);

        let face = Transform::linear(DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]), 1).unwrap();
        assert!(matches!(
            tensor(&face, &Transform::identity(1)),
            Err(TransformError::UnsupportedConfiguration(_))
        ));
    }
}
