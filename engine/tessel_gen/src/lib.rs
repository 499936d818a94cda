//! Artifact generation over shape graphs.
//!
//! A [`Builder`] describes how to turn each kind of shape into an artifact (a
//! cloner, an encoder, a comparer, ...). A [`GenerationContext`] walks the
//! shape graph on the builder's behalf:
//!
//! - each `(provider, artifact kind, shape)` is built at most once and cached
//! - cycles in the type graph are broken with [`Delayed`] forward references
//! - a failed build leaves nothing in the cache and can be retried
//!
//! Collection and object construction shared by all value-producing builders
//! lives in [`construct`].

mod cache;
pub mod construct;
mod context;
mod delayed;
mod error;
mod options;

pub use cache::{
    lookup, ArtifactCache, ArtifactKind, ArtifactRegistry, CacheKey, CacheScope, Entry,
    ScopedCache,
};
pub use context::{build, Builder, GenerationContext};
pub use delayed::{Delayed, DelayedSlots};
pub use error::{GenError, GenResult};
pub use options::{DuplicateKeyPolicy, GenOptions};

#[cfg(test)]
mod tests;
