//! Artifact caches.
//!
//! Artifacts are cached per provider, then by `(artifact kind, shape)`. Entries
//! are type-erased so one cache can hold every builder's artifacts; the
//! typed view is recovered by downcasting with the builder's artifact type.
//!
//! - [`ArtifactCache`]: the cache for one provider.
//! - [`ScopedCache`]: reads through to a parent, writes privately. Used to
//!   build a one-off artifact without touching the session cache.
//! - [`ArtifactRegistry`]: one locked cache per provider, shareable across
//!   threads.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tessel_shape::{ProviderId, ShapeId, ShapeProvider, ShapeVisitor};

use crate::{build, Builder, GenResult, GenerationContext};

/// Name of the artifact family a builder produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKind(&'static str);

impl ArtifactKind {
    pub const fn new(name: &'static str) -> Self {
        ArtifactKind(name)
    }

    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ArtifactKind,
    pub shape: ShapeId,
}

impl CacheKey {
    pub const fn new(kind: ArtifactKind, shape: ShapeId) -> Self {
        CacheKey { kind, shape }
    }
}

/// A cached artifact with its concrete type erased.
pub type Entry = Box<dyn Any + Send + Sync>;

/// Storage the generation context reads and writes.
pub trait CacheScope {
    /// Provider whose shapes the entries describe.
    fn provider(&self) -> ProviderId;

    fn lookup(&self, key: &CacheKey) -> Option<&(dyn Any + Send + Sync)>;

    fn store(&mut self, key: CacheKey, entry: Entry);

    /// Remove an entry written through this scope. Returns whether one existed.
    fn evict(&mut self, key: &CacheKey) -> bool;

    /// Entries written through this scope.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Typed lookup.
pub fn lookup<A: Clone + 'static>(cache: &dyn CacheScope, key: &CacheKey) -> Option<A> {
    cache.lookup(key)?.downcast_ref::<A>().cloned()
}

/// Artifacts for one provider.
pub struct ArtifactCache {
    provider: ProviderId,
    entries: FxHashMap<CacheKey, Entry>,
}

impl ArtifactCache {
    pub fn new(provider: ProviderId) -> Self {
        ArtifactCache {
            provider,
            entries: FxHashMap::default(),
        }
    }

    pub fn for_provider(provider: &dyn ShapeProvider) -> Self {
        Self::new(provider.id())
    }

    /// Typed lookup for the artifact of `B` built for `shape`.
    pub fn get<B: Builder>(&self, shape: ShapeId) -> Option<B::Artifact> {
        lookup(self, &CacheKey::new(B::KIND, shape))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl CacheScope for ArtifactCache {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn lookup(&self, key: &CacheKey) -> Option<&(dyn Any + Send + Sync)> {
        self.entries.get(key).map(|entry| &**entry)
    }

    fn store(&mut self, key: CacheKey, entry: Entry) {
        self.entries.insert(key, entry);
    }

    fn evict(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("provider", &self.provider)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Read-through overlay on a parent cache.
///
/// Lookups fall back to the parent; writes and evictions only touch the
/// overlay. Dropping the overlay discards everything built through it.
pub struct ScopedCache<'p> {
    parent: &'p dyn CacheScope,
    local: ArtifactCache,
}

impl<'p> ScopedCache<'p> {
    pub fn new(parent: &'p dyn CacheScope) -> Self {
        ScopedCache {
            parent,
            local: ArtifactCache::new(parent.provider()),
        }
    }

    pub fn parent(&self) -> &'p dyn CacheScope {
        self.parent
    }
}

impl CacheScope for ScopedCache<'_> {
    fn provider(&self) -> ProviderId {
        self.local.provider
    }

    fn lookup(&self, key: &CacheKey) -> Option<&(dyn Any + Send + Sync)> {
        self.local
            .lookup(key)
            .or_else(|| self.parent.lookup(key))
    }

    fn store(&mut self, key: CacheKey, entry: Entry) {
        self.local.store(key, entry);
    }

    fn evict(&mut self, key: &CacheKey) -> bool {
        self.local.evict(key)
    }

    fn len(&self) -> usize {
        self.local.len()
    }
}

/// Caches for many providers.
///
/// Each provider's cache sits behind its own mutex, held for the whole of a
/// build so the single-traversal invariants hold. Builds for different
/// providers proceed in parallel.
#[derive(Default)]
pub struct ArtifactRegistry {
    caches: DashMap<ProviderId, Arc<Mutex<ArtifactCache>>>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache for `provider`, created empty on first use.
    pub fn cache_for(&self, provider: ProviderId) -> Arc<Mutex<ArtifactCache>> {
        let entry = self
            .caches
            .entry(provider)
            .or_insert_with(|| Arc::new(Mutex::new(ArtifactCache::new(provider))));
        Arc::clone(entry.value())
    }

    /// Drop a provider's cache, e.g. when the provider is torn down.
    pub fn remove(&self, provider: ProviderId) -> bool {
        self.caches.remove(&provider).is_some()
    }

    /// Number of providers with a cache.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Get or build the artifact of `builder` for `shape` under `provider`.
    pub fn get_or_build<B>(
        &self,
        provider: &dyn ShapeProvider,
        builder: &B,
        shape: ShapeId,
    ) -> GenResult<B::Artifact>
    where
        B: Builder + for<'x> ShapeVisitor<GenerationContext<'x, B>, Output = GenResult<B::Artifact>>,
    {
        let cache = self.cache_for(provider.id());
        let mut guard = cache.lock();
        build(provider, builder, &mut *guard, shape)
    }
}
