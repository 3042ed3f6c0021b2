//! Transform chains: the ancestry of an element, from the root frame down to
//! the element's own reference coordinates.
//!
//! `steps[0]` is the root-most transform and the last step is applied first
//! (the leaf). Adjacent steps always agree on dimension:
//! `steps[i].fromdim() == steps[i + 1].todim()`.
//!
//! Because every step is an interned [`Transform`], two chains describe the
//! same ancestry exactly when they are equal, which makes [`Chain`] usable as
//! a `HashMap`/`BTreeMap` key.

pub mod canonical;
pub mod prioritize;

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::debug_invariants::DebugInvariants;
use crate::transform::{Points, Transform};
use crate::transform_error::TransformError;

pub use canonical::{canonical, canonical_with};
pub use prioritize::prioritize;

/// Immutable ordered sequence of transforms. Cloning shares the steps.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chain {
    steps: Arc<[Transform]>,
}

fn check_adjacent(outer: &Transform, inner: &Transform) -> Result<(), TransformError> {
    if outer.fromdim() != inner.todim() {
        return Err(TransformError::mismatch("chain", outer.fromdim(), inner.todim()));
    }
    Ok(())
}

impl Chain {
    /// A chain holding only `root`.
    pub fn new(root: Transform) -> Self {
        Chain {
            steps: Arc::from(vec![root]),
        }
    }

    /// Build a chain from root-first steps, checking that neighbours agree on
    /// dimension.
    pub fn from_transforms(
        steps: impl IntoIterator<Item = Transform>,
    ) -> Result<Self, TransformError> {
        let steps: Vec<Transform> = steps.into_iter().collect();
        for (outer, inner) in steps.iter().tuple_windows() {
            check_adjacent(outer, inner)?;
        }
        Ok(Self::from_vec_checked(steps))
    }

    pub(crate) fn from_vec_unchecked(steps: Vec<Transform>) -> Self {
        Chain {
            steps: Arc::from(steps),
        }
    }

    /// Wrap `steps` and assert the chain invariants when they are enabled.
    fn from_vec_checked(steps: Vec<Transform>) -> Self {
        let chain = Self::from_vec_unchecked(steps);
        chain.debug_assert_invariants();
        chain
    }

    /// New chain with `step` appended at the leaf end.
    pub fn push(&self, step: Transform) -> Result<Self, TransformError> {
        if let Some(last) = self.steps.last() {
            check_adjacent(last, &step)?;
        }
        let mut steps = self.steps.to_vec();
        steps.push(step);
        Ok(Self::from_vec_checked(steps))
    }

    /// New chain with `step` placed above the current root.
    pub fn prepend(&self, step: Transform) -> Result<Self, TransformError> {
        if let Some(first) = self.steps.first() {
            check_adjacent(&step, first)?;
        }
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.push(step);
        steps.extend(self.steps.iter().cloned());
        Ok(Self::from_vec_checked(steps))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transform> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[Transform] {
        &self.steps
    }

    pub fn get(&self, i: usize) -> Option<&Transform> {
        self.steps.get(i)
    }

    /// Dimension of the root frame.
    pub fn todim(&self) -> Option<usize> {
        self.steps.first().map(Transform::todim)
    }

    /// Dimension of the leaf coordinates.
    pub fn fromdim(&self) -> Option<usize> {
        self.steps.last().map(Transform::fromdim)
    }

    /// The whole chain as a single transform.
    ///
    /// Fails for an empty chain and wherever composition itself fails (for
    /// instance across two consecutive updims).
    pub fn composed(&self) -> Result<Transform, TransformError> {
        let (first, rest) = self.steps.split_first().ok_or_else(|| {
            TransformError::UnsupportedConfiguration("composing an empty chain".into())
        })?;
        rest.iter()
            .try_fold(first.clone(), |acc, step| acc.compose(step))
    }

    /// Map leaf coordinates to the root frame, one step at a time.
    pub fn apply(&self, points: &Points) -> Result<Points, TransformError> {
        self.steps
            .iter()
            .rev()
            .try_fold(points.clone(), |acc, step| step.apply(&acc))
    }

    /// See [`canonical`].
    pub fn canonical(&self) -> Chain {
        Self::from_vec_checked(canonical(&self.steps))
    }

    /// See [`prioritize`].
    pub fn prioritize(&self, ndims: usize) -> Chain {
        Self::from_vec_checked(prioritize(&self.steps, ndims))
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Transform;
    type IntoIter = std::slice::Iter<'a, Transform>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Chain")?;
        f.debug_list().entries(self.steps.iter()).finish()
    }
}

impl DebugInvariants for Chain {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "Chain");
    }

    fn validate_invariants(&self) -> Result<(), TransformError> {
        for step in self.steps.iter() {
            let square = step.todim() == step.fromdim() && step.sign() == 0;
            let updim = step.is_updim() && step.sign().abs() == 1;
            if !(square || updim) {
                return Err(TransformError::invalid(
                    step.kind(),
                    format!("{step:?} has sign {}", step.sign()),
                ));
            }
        }
        for (outer, inner) in self.steps.iter().tuple_windows() {
            check_adjacent(outer, inner)?;
        }
        Ok(())
    }
}

/// Uniform scale on `ndims` coordinates, collapsed to [`Transform::identity`]
/// when it does nothing.
pub(crate) fn uniform_scale(ndims: usize, factor: f64) -> Transform {
    if factor == 1.0 || ndims == 0 {
        Transform::identity(ndims)
    } else {
        Transform::scale_uniform(ndims, factor)
    }
}
