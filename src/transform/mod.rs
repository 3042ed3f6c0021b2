//! Transformation values: maps from a `fromdim`-dimensional coordinate space
//! into a `todim`-dimensional one.
//!
//! A transform is either dimension-preserving (`todim == fromdim`, `sign == 0`)
//! or an *updim* embedding of a facet into its parent (`todim == fromdim + 1`,
//! `sign = ±1` encoding which side the facet faces).
//!
//! [`Transform`] is a cheap, immutable, shareable handle. Every constructor
//! goes through a per-kind interning registry, so two constructions with equal
//! normalized arguments return the *same* node for as long as either is alive.
//! Equality, hashing and ordering of handles are therefore by identity
//! (a process-unique serial id), which is what makes [`Chain`](crate::chain::Chain)
//! usable as a map key and sort key.

pub mod compose;
pub mod construct;
pub mod linalg;
mod ops;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{DMatrix, DVector};
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

use crate::intern::{InternKey, KeyBuilder, Param, Registry, RegistryStats};
use crate::transform_error::TransformError;

pub use compose::tensor;
pub use ops::Axis;

/// Point arrays: one point per row, one coordinate per column.
pub type Points = DMatrix<f64>;

/// The closed set of transformation variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransformKind {
    Identity,
    Root,
    ScaleUniform,
    Scale,
    Linear,
    Slice,
    Affine,
    Point,
}

impl TransformKind {
    pub const ALL: [TransformKind; 8] = [
        TransformKind::Identity,
        TransformKind::Root,
        TransformKind::ScaleUniform,
        TransformKind::Scale,
        TransformKind::Linear,
        TransformKind::Slice,
        TransformKind::Affine,
        TransformKind::Point,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TransformKind::Identity => "Identity",
            TransformKind::Root => "Root",
            TransformKind::ScaleUniform => "ScaleUniform",
            TransformKind::Scale => "Scale",
            TransformKind::Linear => "Linear",
            TransformKind::Slice => "Slice",
            TransformKind::Affine => "Affine",
            TransformKind::Point => "Point",
        }
    }

    /// Declared constructor parameters, in positional order.
    pub fn params(self) -> &'static [Param] {
        const IDENTITY: &[Param] = &[Param::required("ndims")];
        const ROOT: &[Param] = &[Param::required("ndims"), Param::required("token")];
        const SCALE_UNIFORM: &[Param] = &[Param::required("ndims"), Param::required("factor")];
        const SCALE: &[Param] = &[Param::required("factors")];
        const LINEAR: &[Param] = &[Param::required("matrix"), Param::with_default("sign", 0)];
        const SLICE: &[Param] = &[
            Param::required("fromdim"),
            Param::required("start"),
            Param::required("stop"),
            Param::with_default("step", 1),
        ];
        const AFFINE: &[Param] = &[Param::required("offset"), Param::required("transform")];
        const POINT: &[Param] = &[Param::required("sign")];
        match self {
            TransformKind::Identity => IDENTITY,
            TransformKind::Root => ROOT,
            TransformKind::ScaleUniform => SCALE_UNIFORM,
            TransformKind::Scale => SCALE,
            TransformKind::Linear => LINEAR,
            TransformKind::Slice => SLICE,
            TransformKind::Affine => AFFINE,
            TransformKind::Point => POINT,
        }
    }

    /// Hit/miss statistics of this kind's interning registry.
    pub fn registry_stats(self) -> RegistryStats {
        registry(self).stats()
    }

    /// Sweep expired entries from this kind's registry.
    pub fn purge_registry(self) -> usize {
        registry(self).purge()
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque token identifying the mesh instance a [`TransformKind::Root`] belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RootToken(u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

impl RootToken {
    /// A token distinct from every other token handed out by `fresh`.
    pub fn fresh() -> Self {
        RootToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a caller-managed raw value.
    pub const fn from_raw(raw: u64) -> Self {
        RootToken(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub(crate) enum Variant {
    Identity,
    Root(RootToken),
    ScaleUniform(f64),
    Scale(DVector<f64>),
    Linear(DMatrix<f64>),
    /// Selects `x[start + k*step]` for `k in 0..todim`; `stop` is normalized
    /// to `start + todim*step`.
    Slice {
        start: i64,
        stop: i64,
        step: i64,
    },
    Affine {
        offset: DVector<f64>,
        inner: Transform,
    },
    Point,
}

pub(crate) struct TransformNode {
    id: u64,
    kind: TransformKind,
    todim: usize,
    fromdim: usize,
    sign: i8,
    variant: Variant,
    key: Option<InternKey>,
    det: OnceCell<Result<f64, TransformError>>,
}

impl Drop for TransformNode {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            registry(self.kind).forget(&key);
        }
    }
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

static REGISTRIES: Lazy<[Registry<TransformNode>; 8]> =
    Lazy::new(|| TransformKind::ALL.map(|kind| Registry::new(kind.name())));

fn registry(kind: TransformKind) -> &'static Registry<TransformNode> {
    &REGISTRIES[kind.index()]
}

/// Shared handle to an interned transformation.
#[derive(Clone)]
pub struct Transform(Arc<TransformNode>);

assert_impl_all!(Transform: Send, Sync);

fn check_dims(
    kind: TransformKind,
    todim: usize,
    fromdim: usize,
    sign: i8,
) -> Result<(), TransformError> {
    let ok = (todim == fromdim && sign == 0) || (todim == fromdim + 1 && (sign == 1 || sign == -1));
    if ok {
        Ok(())
    } else {
        Err(TransformError::invalid(
            kind,
            format!("todim={todim}, fromdim={fromdim}, sign={sign} is neither square with sign 0 nor an updim with sign ±1"),
        ))
    }
}

/// Indices selected by a range `start..stop` with stride `step`.
pub(crate) fn range_indices(start: i64, stop: i64, step: i64) -> Vec<i64> {
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    out
}

/// Like [`range_indices`], but every index must lie in `0..fromdim`. Fails on
/// the first one that does not, so at most `fromdim + 1` indices are visited.
fn checked_slice_indices(
    fromdim: usize,
    start: i64,
    stop: i64,
    step: i64,
) -> Result<Vec<i64>, TransformError> {
    let bound = i64::try_from(fromdim).unwrap_or(i64::MAX);
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        if i < 0 || i >= bound {
            return Err(TransformError::invalid(
                TransformKind::Slice,
                format!("index {i} out of range for fromdim {fromdim}"),
            ));
        }
        out.push(i);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(out)
}

impl Transform {
    fn intern(
        kind: TransformKind,
        key: Option<InternKey>,
        todim: usize,
        fromdim: usize,
        sign: i8,
        variant: Variant,
    ) -> Transform {
        let node = registry(kind).intern_with(key, |key| TransformNode {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            todim,
            fromdim,
            sign,
            variant,
            key,
            det: OnceCell::new(),
        });
        Transform(node)
    }

    /// The no-op map on `ndims` coordinates.
    pub fn identity(ndims: usize) -> Transform {
        let key = KeyBuilder::new().dim(ndims).finish();
        Self::intern(TransformKind::Identity, key, ndims, ndims, 0, Variant::Identity)
    }

    /// Identity marking the top of a chain for the mesh identified by `token`.
    pub fn root(ndims: usize, token: RootToken) -> Transform {
        let key = KeyBuilder::new().dim(ndims).token(token.get()).finish();
        Self::intern(TransformKind::Root, key, ndims, ndims, 0, Variant::Root(token))
    }

    /// Multiply all `ndims` coordinates by `factor`.
    pub fn scale_uniform(ndims: usize, factor: f64) -> Transform {
        let key = KeyBuilder::new().dim(ndims).real(factor).finish();
        Self::intern(
            TransformKind::ScaleUniform,
            key,
            ndims,
            ndims,
            0,
            Variant::ScaleUniform(factor),
        )
    }

    /// Multiply coordinate `i` by `factors[i]`.
    pub fn scale(factors: impl Into<Vec<f64>>) -> Transform {
        let factors: Vec<f64> = factors.into();
        let ndims = factors.len();
        let key = KeyBuilder::new().reals(&factors).finish();
        Self::intern(
            TransformKind::Scale,
            key,
            ndims,
            ndims,
            0,
            Variant::Scale(DVector::from_vec(factors)),
        )
    }

    /// General `todim × fromdim` matrix map.
    pub fn linear(matrix: DMatrix<f64>, sign: i8) -> Result<Transform, TransformError> {
        check_dims(TransformKind::Linear, matrix.nrows(), matrix.ncols(), sign)?;
        Ok(Self::make_linear(matrix, sign))
    }

    pub(crate) fn make_linear(matrix: DMatrix<f64>, sign: i8) -> Transform {
        let key = KeyBuilder::new().matrix(&matrix).int(i64::from(sign)).finish();
        let (todim, fromdim) = matrix.shape();
        Self::intern(TransformKind::Linear, key, todim, fromdim, sign, Variant::Linear(matrix))
    }

    /// Coordinate selection `x[start + k*step]`, `k = 0, 1, ...` while before `stop`.
    ///
    /// The selection must pick exactly `fromdim` valid indices, so a slice is
    /// either the identity ordering or its reversal.
    pub fn slice(fromdim: usize, start: i64, stop: i64, step: i64) -> Result<Transform, TransformError> {
        let kind = TransformKind::Slice;
        if step == 0 {
            return Err(TransformError::invalid(kind, "step must be non-zero"));
        }
        let idx = checked_slice_indices(fromdim, start, stop, step)?;
        check_dims(kind, idx.len(), fromdim, 0)?;
        Ok(Self::make_slice(fromdim, start, step))
    }

    pub(crate) fn make_slice(fromdim: usize, start: i64, step: i64) -> Transform {
        // With at most one coordinate the stride selects nothing extra.
        let (start, step) = match fromdim {
            0 => (0, 1),
            1 => (start, 1),
            _ => (start, step),
        };
        let stop = start + fromdim as i64 * step;
        let key = KeyBuilder::new()
            .dim(fromdim)
            .int(start)
            .int(stop)
            .int(step)
            .finish();
        Self::intern(
            TransformKind::Slice,
            key,
            fromdim,
            fromdim,
            0,
            Variant::Slice { start, stop, step },
        )
    }

    /// `offset + inner(x)`. A nested affine inner is flattened into one offset.
    pub fn affine(offset: impl Into<Vec<f64>>, inner: &Transform) -> Result<Transform, TransformError> {
        let offset: Vec<f64> = offset.into();
        if offset.len() != inner.todim() {
            return Err(TransformError::invalid(
                TransformKind::Affine,
                format!("offset has length {}, expected {}", offset.len(), inner.todim()),
            ));
        }
        Ok(Self::make_affine(offset, inner))
    }

    pub(crate) fn make_affine(mut offset: Vec<f64>, inner: &Transform) -> Transform {
        if let Variant::Affine {
            offset: inner_offset,
            inner: innermost,
        } = &inner.0.variant
        {
            for (o, i) in offset.iter_mut().zip(inner_offset.iter()) {
                *o += i;
            }
            return Self::make_affine(offset, innermost);
        }
        let key = KeyBuilder::new().reals(&offset).node(inner.id()).finish();
        Self::intern(
            TransformKind::Affine,
            key,
            inner.todim(),
            inner.fromdim(),
            inner.sign(),
            Variant::Affine {
                offset: DVector::from_vec(offset),
                inner: inner.clone(),
            },
        )
    }

    /// Embed the single point of a 0-dimensional space at coordinate `0`.
    pub fn point(sign: i8) -> Result<Transform, TransformError> {
        check_dims(TransformKind::Point, 1, 0, sign)?;
        Ok(Self::make_point(sign))
    }

    pub(crate) fn make_point(sign: i8) -> Transform {
        let key = KeyBuilder::new().int(i64::from(sign)).finish();
        Self::intern(TransformKind::Point, key, 1, 0, sign, Variant::Point)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Process-unique serial id of the underlying node.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    pub fn kind(&self) -> TransformKind {
        self.0.kind
    }

    #[inline]
    pub fn todim(&self) -> usize {
        self.0.todim
    }

    #[inline]
    pub fn fromdim(&self) -> usize {
        self.0.fromdim
    }

    #[inline]
    pub fn sign(&self) -> i8 {
        self.0.sign
    }

    /// `todim == fromdim + 1`.
    #[inline]
    pub fn is_updim(&self) -> bool {
        self.0.todim == self.0.fromdim + 1
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.0.todim == self.0.fromdim
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        matches!(self.0.variant, Variant::Root(_))
    }

    /// Whether this transform was memoized in its registry.
    pub fn is_interned(&self) -> bool {
        self.0.key.is_some()
    }

    /// Both handles refer to the same node.
    #[inline]
    pub fn ptr_eq(a: &Transform, b: &Transform) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn root_token(&self) -> Option<RootToken> {
        match self.0.variant {
            Variant::Root(token) => Some(token),
            _ => None,
        }
    }

    /// Factor of a uniform scaling (`1` for a plain identity). `None` for
    /// roots and every other variant.
    pub fn uniform_factor(&self) -> Option<f64> {
        match self.0.variant {
            Variant::Identity => Some(1.0),
            Variant::ScaleUniform(f) => Some(f),
            _ => None,
        }
    }

    /// Diagonal factors of a scaling variant (identity and root included).
    pub fn diagonal(&self) -> Option<Vec<f64>> {
        match &self.0.variant {
            Variant::Identity | Variant::Root(_) => Some(vec![1.0; self.todim()]),
            Variant::ScaleUniform(f) => Some(vec![*f; self.todim()]),
            Variant::Scale(fs) => Some(fs.iter().copied().collect()),
            _ => None,
        }
    }

    /// Offset of an affine transform.
    pub fn offset(&self) -> Option<&[f64]> {
        match &self.0.variant {
            Variant::Affine { offset, .. } => Some(offset.as_slice()),
            _ => None,
        }
    }

    /// Inner transform of an affine transform.
    pub fn inner(&self) -> Option<&Transform> {
        match &self.0.variant {
            Variant::Affine { inner, .. } => Some(inner),
            _ => None,
        }
    }

    /// `(start, stop, step)` of a slice.
    pub fn slice_range(&self) -> Option<(i64, i64, i64)> {
        match self.0.variant {
            Variant::Slice { start, stop, step } => Some((start, stop, step)),
            _ => None,
        }
    }

    pub(crate) fn variant(&self) -> &Variant {
        &self.0.variant
    }

    pub(crate) fn det_cell(&self) -> &OnceCell<Result<f64, TransformError>> {
        &self.0.det
    }
}

// -----------------------------------------------------------------------------
// Identity semantics
// -----------------------------------------------------------------------------

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        Transform::ptr_eq(self, other)
    }
}

impl Eq for Transform {}

impl Hash for Transform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialOrd for Transform {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Transform {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id().cmp(&other.id())
    }
}

// -----------------------------------------------------------------------------
// Formatting
// -----------------------------------------------------------------------------

fn write_reals(f: &mut fmt::Formatter<'_>, values: impl IntoIterator<Item = f64>) -> fmt::Result {
    f.write_str("[")?;
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{v:.2}")?;
    }
    f.write_str("]")
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.variant {
            Variant::Identity | Variant::Root(_) => f.write_str("x"),
            Variant::ScaleUniform(factor) => write!(f, "{factor} x"),
            Variant::Scale(factors) => {
                write_reals(f, factors.iter().copied())?;
                f.write_str(" x")
            }
            Variant::Linear(matrix) => {
                if matrix.ncols() == 0 {
                    return f.write_str("0");
                }
                for (i, col) in matrix.column_iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    write_reals(f, col.iter().copied())?;
                    write!(f, " x{i}")?;
                }
                Ok(())
            }
            Variant::Slice { start, stop, step } => write!(f, "x[{start}:{stop}:{step}]"),
            Variant::Affine { offset, inner } => {
                write_reals(f, offset.iter().copied())?;
                write!(f, " + {inner}")
            }
            Variant::Point => f.write_str("0"),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.inner().map_or(self.kind(), Transform::kind);
        write!(f, "{kind}[{}<-{}]({self})", self.todim(), self.fromdim())
    }
}
