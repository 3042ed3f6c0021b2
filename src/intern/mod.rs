//! Interning (hash-consing) support.
//!
//! Constructing a value twice with equal normalized arguments yields the same
//! live instance, so identity comparison implies value equality. Instances are
//! held weakly: once the last handle is dropped the entry expires and a later
//! construction allocates afresh.

pub mod key;
pub mod params;
pub mod registry;

pub use key::{InternKey, KeyBuilder, KeyPart};
pub use params::{Arg, Args, Param, normalize};
pub use registry::{Registry, RegistryStats};
