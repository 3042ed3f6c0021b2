//! Prioritization: the inverse movement of [`canonical`](super::canonical).
//!
//! Starting from a canonical chain, uniform scalings that live below
//! `ndims` are hoisted above the updim preceding them, so the chain climbs to
//! `ndims` as early as possible and stays there as long as possible. Chains
//! that reach an `ndims`-dimensional element along different refinement paths
//! then share their `ndims`-dimensional prefix.

use super::uniform_scale;
use crate::transform::Transform;

/// Rewrite `(updim, scale)` into `(scale', updim)` with
/// `scale' ∘ updim == updim ∘ scale` while `scale` maps a space of fewer than
/// `ndims` dimensions.
///
/// For `ndims` at or below the leaf dimension nothing moves.
pub fn prioritize(steps: &[Transform], ndims: usize) -> Vec<Transform> {
    let mut out = steps.to_vec();
    for start in 1..out.len() {
        let mut i = start;
        while i > 0 && out[i].todim() < ndims {
            let Some(newscale) = commute_up(&out[i - 1], &out[i]) else {
                break;
            };
            log::trace!("prioritize: {:?} moved above {:?}", out[i], out[i - 1]);
            out[i] = out[i - 1].clone();
            out[i - 1] = newscale;
            i -= 1;
        }
    }
    out
}

/// For `updim = b + A·y` and `scale = d + s·y`, the scaling
/// `c + s·x` with `c = A d + (1 - s) b` satisfies
/// `(c + s·x) ∘ updim == updim ∘ scale`.
fn commute_up(updim: &Transform, scale: &Transform) -> Option<Transform> {
    if !updim.is_updim() || scale.is_root() {
        return None;
    }
    let (linear, d) = scale.split_linear_offset();
    let s = linear.uniform_factor()?;
    let (inner, b) = updim.split_linear_offset();
    let ad = inner.apply_point(&d).ok()?;
    let c: Vec<f64> = ad.iter().zip(&b).map(|(x, bi)| x + (1.0 - s) * bi).collect();
    uniform_scale(updim.todim(), s).add_offset(&c).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::canonical;
    use crate::transform::RootToken;
    use nalgebra::DMatrix;

    fn bottom_edge() -> Transform {
        Transform::linear(DMatrix::from_row_slice(2, 1, &[1.0, 0.0]), -1).unwrap()
    }

    fn apply_all(steps: &[Transform], pts: &DMatrix<f64>) -> DMatrix<f64> {
        steps
            .iter()
            .rev()
            .try_fold(pts.clone(), |acc, t| t.apply(&acc))
            .unwrap()
    }

    #[test]
    fn scale_moves_above_edge() {
        let root = Transform::root(2, RootToken::fresh());
        let steps = vec![root.clone(), bottom_edge(), Transform::scale_uniform(1, 0.5)];
        let out = prioritize(&steps, 2);
        assert_eq!(out, vec![root, Transform::scale_uniform(2, 0.5), bottom_edge()]);
        let pts = DMatrix::from_row_slice(2, 1, &[0.5, 1.0]);
        assert_eq!(apply_all(&out, &pts), apply_all(&steps, &pts));
    }

    #[test]
    fn offset_scale_gains_parent_offset() {
        // y -> (1, y), then the upper half of the edge.
        let right = Transform::affine(
            vec![1.0, 0.0],
            &Transform::linear(DMatrix::from_row_slice(2, 1, &[0.0, 1.0]), 1).unwrap(),
        )
        .unwrap();
        let upper = Transform::affine(vec![0.5], &Transform::scale_uniform(1, 0.5)).unwrap();
        let steps = vec![Transform::identity(2), right.clone(), upper];
        let out = prioritize(&steps, 2);
        let expected =
            Transform::affine(vec![0.5, 0.5], &Transform::scale_uniform(2, 0.5)).unwrap();
        assert_eq!(out, vec![Transform::identity(2), expected, right]);
        let pts = DMatrix::from_row_slice(3, 1, &[0.0, 0.5, 1.0]);
        assert_eq!(apply_all(&out, &pts), apply_all(&steps, &pts));
    }

    #[test]
    fn noop_at_leaf_dimension() {
        let steps = vec![Transform::identity(2), bottom_edge(), Transform::scale_uniform(1, 0.5)];
        assert_eq!(prioritize(&steps, 1), steps);
        assert_eq!(prioritize(&steps, 0), steps);
        assert!(prioritize(&[], 3).is_empty());
    }

    #[test]
    fn undoes_canonical() {
        let root = Transform::root(2, RootToken::fresh());
        let steps = vec![root, Transform::scale_uniform(2, 0.5), bottom_edge()];
        let canon = canonical(&steps);
        assert_ne!(canon, steps);
        assert_eq!(prioritize(&canon, 2), steps);
        assert_eq!(canonical(&prioritize(&canon, 2)), canon);
    }

    #[test]
    fn leaf_translation_climbs_to_the_face() {
        let root = Transform::root(3, RootToken::fresh());
        let face = Transform::linear(
            DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
            1,
        )
        .unwrap();
        let leaf_shift = Transform::identity(1).add_offset(&[0.5]).unwrap();
        let steps = vec![root.clone(), face.clone(), bottom_edge(), leaf_shift];
        let out = prioritize(&steps, 2);
        let face_shift = Transform::identity(2).add_offset(&[0.5, 0.0]).unwrap();
        assert_eq!(out, vec![root, face, face_shift, bottom_edge()]);
        assert_eq!(canonical(&out), steps);
    }

    #[test]
    fn non_uniform_predecessor_blocks() {
        let steps = vec![Transform::identity(2), bottom_edge(), Transform::scale(vec![0.5])];
        assert_eq!(prioritize(&steps, 2), steps);
    }
}
