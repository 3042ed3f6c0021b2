#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-transform
//!
//! mesh-transform is the coordinate-transformation core of a finite-element
//! mesh library. Every element of a mesh is described by a *chain* of small
//! affine maps from the root frame down to the element's reference
//! coordinates: uniform scalings for refinement, updim embeddings for
//! boundaries and interfaces, offsets for sub-cell placement.
//!
//! ## Features
//! - Immutable [`Transform`](transform::Transform) values in eight variants
//!   (identity, root marker, uniform and diagonal scale, dense linear, slice,
//!   affine, point), hash-consed per variant so that equal arguments yield the
//!   same instance for as long as it is alive
//! - Composition algebra with specialized rules and a dense fallback, plus
//!   `apply`, `det`, `inv`, `flipped` and offset arithmetic
//! - [`Chain`](chain::Chain) sequences with [`canonical`](chain::canonical)
//!   and [`prioritize`](chain::prioritize) rewrites used to compare ancestries
//!   built along different refinement paths
//! - Thread-safe interning: the registries use an atomic insert-if-absent, so
//!   concurrent constructions of equal transforms observe one instance
//!
//! ## Identity semantics
//!
//! `Transform` and `Chain` compare, hash and order by the identity of the
//! interned nodes they hold. Keep a handle alive while it is used as a map
//! key; a transform rebuilt after all handles were dropped is a new instance.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mesh-transform = "0.1"
//! # Optional features:
//! # features = ["check-invariants"]
//! ```

pub mod chain;
pub mod config;
pub mod debug_invariants;
pub mod intern;
pub mod transform;
pub mod transform_error;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::chain::{Chain, canonical, canonical_with, prioritize};
    pub use crate::config::CommuteConfig;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::intern::{Args, RegistryStats};
    pub use crate::transform::{Axis, Points, RootToken, Transform, TransformKind, tensor};
    pub use crate::transform_error::TransformError;
}
