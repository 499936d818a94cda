//! One provider, one artifact cache, every builder.

use std::sync::Arc;

use tessel_builders::{
    CloneFn, Cloner, Comparer, DecodeFn, Decoder, Document, EncodeFn, Encoder,
    EqualityArtifact, GenerateFn, InvokeFn, Mapper, Marshaler, PrintFn, Printer,
    RandomGenerator,
};
use tessel_gen::{
    build, ArtifactCache, Builder, CacheScope, GenOptions, GenResult, GenerationContext,
};
use tessel_shape::{ShapeId, ShapeProvider, ShapeVisitor, Value};
use tracing::debug;

/// Builds and caches artifacts for the types of one provider.
///
/// Every artifact a session hands out is built at most once; later requests
/// for the same builder and type return the cached artifact. The encoder and
/// decoder (with their converters) are fixed when the session is created,
/// since cached codecs depend on them.
///
/// A session is single-threaded. Artifacts it returns are `Send + Sync` and
/// can be used from any thread; for concurrent building across providers use
/// [`ArtifactRegistry`](tessel_gen::ArtifactRegistry).
pub struct Session {
    provider: Arc<dyn ShapeProvider>,
    cache: ArtifactCache,
    options: GenOptions,
    encoder: Encoder,
    decoder: Decoder,
}

impl Session {
    pub fn new(provider: impl ShapeProvider + 'static) -> Self {
        Self::with_options(Arc::new(provider), GenOptions::default())
    }

    pub fn with_options(provider: Arc<dyn ShapeProvider>, options: GenOptions) -> Self {
        debug!(provider = %provider.id(), "session opened");
        Session {
            cache: ArtifactCache::for_provider(&*provider),
            decoder: Decoder::new(options.clone()),
            encoder: Encoder::new(),
            provider,
            options,
        }
    }

    /// Replace the codecs, e.g. to register converters. Drops every cached
    /// artifact.
    #[must_use]
    pub fn with_codecs(mut self, encoder: Encoder, decoder: Decoder) -> Self {
        self.encoder = encoder;
        self.decoder = decoder;
        self.cache.clear();
        self
    }

    pub fn provider(&self) -> &dyn ShapeProvider {
        &*self.provider
    }

    pub fn options(&self) -> &GenOptions {
        &self.options
    }

    /// The session cache, for layering one-off builds over it.
    pub fn cache(&self) -> &dyn CacheScope {
        &self.cache
    }

    /// Number of cached artifacts across all builders.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Look a type up by name.
    pub fn resolve(&self, name: &str) -> Option<ShapeId> {
        self.provider.resolve(name)
    }

    /// The artifact of any builder, including ones defined outside this
    /// crate.
    pub fn artifact<B>(&mut self, builder: &B, shape: ShapeId) -> GenResult<B::Artifact>
    where
        B: Builder
            + for<'x> ShapeVisitor<GenerationContext<'x, B>, Output = GenResult<B::Artifact>>,
    {
        build(&*self.provider, builder, &mut self.cache, shape)
    }

    // === Artifacts ===

    pub fn cloner(&mut self, shape: ShapeId) -> GenResult<CloneFn> {
        let cloner = Cloner::new(self.options.clone());
        self.artifact(&cloner, shape)
    }

    pub fn comparer(&mut self, shape: ShapeId) -> GenResult<EqualityArtifact> {
        self.artifact(&Comparer, shape)
    }

    pub fn encoder(&mut self, shape: ShapeId) -> GenResult<EncodeFn> {
        build(&*self.provider, &self.encoder, &mut self.cache, shape)
    }

    pub fn decoder(&mut self, shape: ShapeId) -> GenResult<DecodeFn> {
        build(&*self.provider, &self.decoder, &mut self.cache, shape)
    }

    pub fn generator(&mut self, shape: ShapeId) -> GenResult<GenerateFn> {
        let random = RandomGenerator::new(self.options.clone());
        self.artifact(&random, shape)
    }

    pub fn printer(&mut self, shape: ShapeId) -> GenResult<PrintFn> {
        self.artifact(&Printer, shape)
    }

    /// Document-level invoker for a function shape. Its codecs are built in
    /// a scope over the session cache and are not kept.
    pub fn marshal(&self, function: ShapeId) -> GenResult<InvokeFn> {
        let marshaler = Marshaler::new(self.encoder.clone(), self.decoder.clone());
        marshaler.invoker(&*self.provider, &self.cache, function)
    }

    /// A mapper from this session's types into `target`'s.
    pub fn mapper_to(&self, target: Arc<dyn ShapeProvider>) -> Mapper {
        Mapper::new(target, self.options.clone())
    }

    // === One-shot operations ===

    pub fn deep_clone(&mut self, shape: ShapeId, value: &Value) -> GenResult<Value> {
        self.cloner(shape)?(value)
    }

    pub fn equals(&mut self, shape: ShapeId, a: &Value, b: &Value) -> GenResult<bool> {
        self.comparer(shape)?.eq(a, b)
    }

    pub fn hash(&mut self, shape: ShapeId, value: &Value) -> GenResult<u64> {
        self.comparer(shape)?.hash(value)
    }

    pub fn encode(&mut self, shape: ShapeId, value: &Value) -> GenResult<Document> {
        self.encoder(shape)?(value)
    }

    pub fn decode(&mut self, shape: ShapeId, doc: &Document) -> GenResult<Value> {
        self.decoder(shape)?(doc)
    }

    /// One random value from `seed`.
    pub fn generate(&mut self, shape: ShapeId, seed: u64) -> GenResult<Value> {
        let generate = self.generator(shape)?;
        RandomGenerator::new(self.options.clone()).sample(&generate, seed)
    }

    pub fn print(&mut self, shape: ShapeId, value: &Value) -> GenResult<String> {
        let print = self.printer(shape)?;
        Printer::render(&print, value)
    }
}

#[cfg(test)]
mod tests;
