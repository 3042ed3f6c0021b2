//! Canonical form of a chain: uniform scalings are pushed below every updim
//! they commute with, so the chain spends as many steps as possible in the
//! lowest dimension.

use super::uniform_scale;
use crate::config::CommuteConfig;
use crate::transform::Transform;
use crate::transform::linalg::{least_squares, max_abs};

/// [`canonical_with`] using the default tolerance.
pub fn canonical(steps: &[Transform]) -> Vec<Transform> {
    canonical_with(steps, &CommuteConfig::default())
}

/// Rewrite every `(scale, updim)` pair into `(updim, scale')` with
/// `updim ∘ scale' == scale ∘ updim`, where `scale` is a uniform scaling or an
/// identity, optionally offset. Roots are never moved.
///
/// The rewrite is repeated until nothing moves, so the result is a fixpoint
/// and the composed map is unchanged.
pub fn canonical_with(steps: &[Transform], cfg: &CommuteConfig) -> Vec<Transform> {
    let mut out = steps.to_vec();
    while sweep(&mut out, cfg) {}
    out
}

/// One pass from the leaf end upwards. Returns whether anything moved.
fn sweep(steps: &mut [Transform], cfg: &CommuteConfig) -> bool {
    let len = steps.len();
    let Some(top) = steps.first().map(Transform::todim) else {
        return false;
    };
    let mut moved = false;
    for start in (1..len).rev() {
        if steps[start].fromdim() == top {
            break;
        }
        let mut i = start;
        while i < len {
            let Some(newscale) = commute_down(&steps[i - 1], &steps[i], cfg) else {
                break;
            };
            log::trace!("canonical: {:?} moved below {:?}", steps[i - 1], steps[i]);
            steps[i - 1] = steps[i].clone();
            steps[i] = newscale;
            moved = true;
            i += 1;
        }
    }
    moved
}

/// For `scale = c + s·x` and `updim = b + A·y`, find `d` with
/// `A d = c + (s - 1) b` so that `scale ∘ updim == updim ∘ (d + s·y)`.
fn commute_down(scale: &Transform, updim: &Transform, cfg: &CommuteConfig) -> Option<Transform> {
    if scale.is_root() || !updim.is_updim() {
        return None;
    }
    let (linear, c) = scale.split_linear_offset();
    let s = linear.uniform_factor()?;
    let (inner, b) = updim.split_linear_offset();
    let rhs: Vec<f64> = c.iter().zip(&b).map(|(ci, bi)| ci + (s - 1.0) * bi).collect();
    let Some((d, residual)) = least_squares(&inner.matrix(), &rhs) else {
        log::debug!("canonical: singular updim {updim:?}, {scale:?} stays above");
        return None;
    };
    if !cfg.accepts(residual, max_abs(rhs.iter().copied())) {
        log::debug!(
            "canonical: {scale:?} does not commute with {updim:?} (residual {residual:e})"
        );
        return None;
    }
    uniform_scale(updim.fromdim(), s).add_offset(&d).ok()
}
