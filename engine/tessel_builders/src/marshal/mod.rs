//! Calling shaped functions with document arguments.
//!
//! A [`Marshaler`] turns one function shape into an invoker that decodes
//! each argument document, calls the function, and encodes its result. The
//! parameter decoders and the result encoder are built in a [`ScopedCache`]
//! over the caller's cache: anything built for the call stays private to it
//! and the caller's cache is never written.

use std::sync::Arc;

use tessel_gen::{build, ArtifactKind, CacheScope, GenError, GenResult, ScopedCache};
use tessel_shape::{ShapeData, ShapeError, ShapeId, ShapeProvider, Value};
use tracing::debug;

use crate::codec::{DecodeFn, Decoder, Document, EncodeFn, Encoder};

/// Decodes arguments, calls the function value, encodes the result.
pub type InvokeFn = Arc<dyn Fn(&Value, &[Document]) -> GenResult<Document> + Send + Sync>;

fn invoke_fn(
    f: impl Fn(&Value, &[Document]) -> GenResult<Document> + Send + Sync + 'static,
) -> InvokeFn {
    Arc::new(f)
}

#[derive(Clone, Default)]
pub struct Marshaler {
    encoder: Encoder,
    decoder: Decoder,
}

impl Marshaler {
    pub const KIND: ArtifactKind = ArtifactKind::new("marshaler");

    /// Marshal through the given codecs, converters included.
    pub fn new(encoder: Encoder, decoder: Decoder) -> Self {
        Marshaler { encoder, decoder }
    }

    /// Build the invoker for function shape `function`.
    ///
    /// `session` is only read. Asynchronous functions are unsupported.
    pub fn invoker(
        &self,
        provider: &dyn ShapeProvider,
        session: &dyn CacheScope,
        function: ShapeId,
    ) -> GenResult<InvokeFn> {
        let shape = provider.shape(function).ok_or(GenError::UnknownShape {
            provider: provider.id(),
            id: function,
        })?;
        let type_name = Arc::clone(&shape.name);
        let ShapeData::Function(signature) = &shape.data else {
            return Err(GenError::unsupported(
                Self::KIND,
                type_name,
                format!("{} shapes are not callable", shape.kind().name()),
            ));
        };
        if signature.is_async {
            return Err(GenError::unsupported(
                Self::KIND,
                type_name,
                "asynchronous functions cannot be invoked synchronously",
            ));
        }

        let mut scope = ScopedCache::new(session);
        let mut params: Vec<DecodeFn> = Vec::with_capacity(signature.params.len());
        for param in &signature.params {
            params.push(build(provider, &self.decoder, &mut scope, param.shape)?);
        }
        let returns: Option<EncodeFn> = match signature.returns {
            Some(shape) => Some(build(provider, &self.encoder, &mut scope, shape)?),
            None => None,
        };
        debug!(
            function = &*type_name,
            built = scope.len(),
            "marshaler ready"
        );

        let call = Arc::clone(&signature.invoke);
        Ok(invoke_fn(move |target, docs| {
            if docs.len() != params.len() {
                return Err(ShapeError::Arity {
                    name: Arc::clone(&type_name),
                    expected: params.len(),
                    found: docs.len(),
                }
                .into());
            }
            let args = params
                .iter()
                .zip(docs)
                .map(|(decode, doc)| decode(doc))
                .collect::<GenResult<Vec<Value>>>()?;
            let result = call(target, &args)?;
            match &returns {
                Some(encode) => encode(&result),
                None => Ok(Document::Null),
            }
        }))
    }
}
