//! The generation context: cache lookup, cycle breaking and rollback.
//!
//! A context runs one traversal for one builder. `get_or_add` is the only way
//! a builder reaches a child shape's artifact:
//!
//! ```text
//! get_or_add(id)
//!   ├─ cached?     → return it
//!   ├─ in flight?  → return builder.delayed(handle)        (cycle)
//!   └─ otherwise   → allocate handle, mark in flight
//!                    builder.invoke(node, cx)               (may recurse)
//!                    Ok  → resolve handle, cache, return
//!                    Err → evict everything cached since,
//!                          abandon handle, return Err
//! ```
//!
//! # Single-threaded traversal
//!
//! A context borrows its cache mutably and is not shared across threads.
//! Concurrent builds go through [`ArtifactRegistry`](crate::ArtifactRegistry),
//! which serializes builds per provider. The artifacts produced are
//! `Send + Sync` and may be used from any thread once returned.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tessel_shape::{Shape, ShapeId, ShapeNode, ShapeProvider, ShapeVisitor};
use tessel_stack::ensure_sufficient_stack;
use tracing::{debug, trace, warn};

use crate::cache::{lookup, ArtifactKind, CacheKey, CacheScope};
use crate::{Delayed, DelayedSlots, GenError, GenResult};

/// A family of artifacts built by visiting shapes.
///
/// Implementors also implement
/// `ShapeVisitor<GenerationContext<'_, Self>, Output = GenResult<Self::Artifact>>`,
/// one method per shape kind, and obtain child artifacts through
/// [`GenerationContext::get_or_add`].
pub trait Builder: Sized + 'static {
    /// The artifact, usually an `Arc`'d closure. Clones must be cheap.
    type Artifact: Clone + Send + Sync + 'static;

    /// Cache namespace for this builder's artifacts.
    const KIND: ArtifactKind;

    /// A forwarding artifact that calls `delayed.get()` at use time.
    ///
    /// Must not read `delayed` eagerly: the handle is still pending when this
    /// is called.
    fn delayed(&self, delayed: Delayed<Self::Artifact>) -> Self::Artifact;
}

/// State of one traversal.
pub struct GenerationContext<'a, B: Builder> {
    provider: &'a dyn ShapeProvider,
    builder: &'a B,
    cache: &'a mut dyn CacheScope,
    slots: DelayedSlots<B::Artifact>,
    in_flight: FxHashMap<ShapeId, Delayed<B::Artifact>>,
    /// Keys cached during the current top-level build, oldest first.
    journal: Vec<CacheKey>,
    depth: usize,
}

impl<'a, B: Builder> GenerationContext<'a, B> {
    /// Pair a builder with a provider and that provider's cache.
    pub fn new(
        provider: &'a dyn ShapeProvider,
        builder: &'a B,
        cache: &'a mut dyn CacheScope,
    ) -> GenResult<Self> {
        if cache.provider() != provider.id() {
            return Err(GenError::ProviderMismatch {
                cache: cache.provider(),
                provider: provider.id(),
            });
        }
        Ok(GenerationContext {
            provider,
            builder,
            cache,
            slots: DelayedSlots::new(),
            in_flight: FxHashMap::default(),
            journal: Vec::new(),
            depth: 0,
        })
    }

    pub fn provider(&self) -> &'a dyn ShapeProvider {
        self.provider
    }

    pub fn builder(&self) -> &'a B {
        self.builder
    }

    /// The cache this context writes to, for layering a [`ScopedCache`](crate::ScopedCache).
    pub fn cache(&self) -> &dyn CacheScope {
        &*self.cache
    }

    pub fn shape(&self, id: ShapeId) -> GenResult<&'a Shape> {
        self.provider.shape(id).ok_or(GenError::UnknownShape {
            provider: self.provider.id(),
            id,
        })
    }

    pub fn type_name(&self, id: ShapeId) -> Arc<str> {
        match self.provider.shape(id) {
            Some(shape) => Arc::clone(&shape.name),
            None => Arc::from(id.to_string()),
        }
    }

    /// Nesting of builds currently running.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Shapes whose build has started but not finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// An `Unsupported` error tagged with this builder's kind.
    pub fn unsupported(&self, id: ShapeId, reason: impl Into<Arc<str>>) -> GenError {
        GenError::unsupported(B::KIND, self.type_name(id), reason)
    }

    fn cached(&self, key: &CacheKey) -> Option<B::Artifact> {
        lookup::<B::Artifact>(&*self.cache, key)
    }
}

impl<'a, B> GenerationContext<'a, B>
where
    B: Builder + ShapeVisitor<GenerationContext<'a, B>, Output = GenResult<B::Artifact>>,
{
    /// The artifact for `id`, built on first request.
    pub fn get_or_add(&mut self, id: ShapeId) -> GenResult<B::Artifact> {
        let key = CacheKey::new(B::KIND, id);

        if let Some(artifact) = self.cached(&key) {
            trace!(shape = %id, kind = %B::KIND, "artifact cache hit");
            return Ok(artifact);
        }

        if let Some(delayed) = self.in_flight.get(&id) {
            trace!(shape = %id, kind = %B::KIND, slot = delayed.index(), "cycle; forwarding");
            return Ok(self.builder.delayed(delayed.clone()));
        }

        let provider = self.provider;
        let node: ShapeNode<'a> = provider.node(id).ok_or(GenError::UnknownShape {
            provider: provider.id(),
            id,
        })?;

        let delayed = self.slots.allocate();
        self.in_flight.insert(id, delayed.clone());
        let mark = self.journal.len();
        debug!(shape = node.name(), kind = %B::KIND, depth = self.depth, "building artifact");

        let builder = self.builder;
        self.depth += 1;
        let result = ensure_sufficient_stack(|| builder.invoke(node, self));
        self.depth -= 1;
        self.in_flight.remove(&id);

        match result {
            Ok(artifact) => {
                self.slots.resolve(&delayed, artifact.clone());
                self.cache.store(key, Box::new(artifact.clone()));
                self.journal.push(key);
                if self.in_flight.is_empty() {
                    self.journal.clear();
                }
                debug!(shape = node.name(), kind = %B::KIND, "artifact built");
                Ok(artifact)
            }
            Err(err) => {
                let rolled_back = self.journal.len() - mark;
                for key in self.journal.drain(mark..) {
                    self.cache.evict(&key);
                }
                self.slots.abandon(&delayed);
                warn!(
                    shape = node.name(),
                    kind = %B::KIND,
                    rolled_back,
                    error = %err,
                    "artifact build failed"
                );
                Err(err)
            }
        }
    }

    /// Artifacts for several shapes, in order.
    pub fn get_all(&mut self, ids: &[ShapeId]) -> GenResult<Vec<B::Artifact>> {
        ids.iter().map(|&id| self.get_or_add(id)).collect()
    }
}

/// Build the artifact of `builder` for `shape` in a fresh context over `cache`.
pub fn build<'a, B>(
    provider: &'a dyn ShapeProvider,
    builder: &'a B,
    cache: &'a mut dyn CacheScope,
    shape: ShapeId,
) -> GenResult<B::Artifact>
where
    B: Builder + ShapeVisitor<GenerationContext<'a, B>, Output = GenResult<B::Artifact>>,
{
    let mut cx = GenerationContext::new(provider, builder, cache)?;
    let artifact = cx.get_or_add(shape)?;
    debug_assert_eq!(cx.slots.pending(), 0, "traversal left unresolved delayed artifacts");
    Ok(artifact)
}
