//! Construction-strategy descriptors for enumerable and dictionary shapes.
//!
//! A collection type exposes exactly one way of being built. The descriptor
//! names that way and carries the function(s) implementing it; the engine
//! branches on the descriptor and never assumes a second protocol exists.
//!
//! `T` is the unit fed to the collection: `Value` for enumerables and
//! `(Value, Value)` for dictionaries.

use std::fmt;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::{ShapeError, Value};

/// Dimensions of a buffered collection, outermost first.
pub type Dims = SmallVec<[usize; 2]>;

/// Default-construct with a capacity hint.
pub type CreateFn = Arc<dyn Fn(usize) -> Value + Send + Sync>;

/// Append one element (or insert one entry) into a collection under construction.
pub type AddFn<T> = Arc<dyn Fn(&mut Value, T) -> Result<(), ShapeError> + Send + Sync>;

/// Build from a complete buffer.
pub type SpanFn<T> = Arc<dyn Fn(SpanBuffer<T>) -> Result<Value, ShapeError> + Send + Sync>;

/// Build by pulling from a lazy sequence.
pub type SequenceFn<T> =
    Arc<dyn Fn(&mut dyn Iterator<Item = T>) -> Result<Value, ShapeError> + Send + Sync>;

/// The declared construction protocol of a collection shape.
pub enum ConstructionStrategy<T> {
    /// Default-construct, then add elements one at a time.
    Mutable { create: CreateFn, add: AddFn<T> },
    /// Accumulate into a buffer, then hand the whole buffer to a constructor.
    BufferedSpan(SpanFn<T>),
    /// Hand the constructor a lazy sequence it drains itself.
    LazySequence(SequenceFn<T>),
    /// The type cannot be constructed.
    Unsupported,
}

/// Tag of a [`ConstructionStrategy`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StrategyKind {
    Mutable,
    BufferedSpan,
    LazySequence,
    Unsupported,
}

impl StrategyKind {
    pub const fn name(self) -> &'static str {
        match self {
            StrategyKind::Mutable => "mutable",
            StrategyKind::BufferedSpan => "buffered-span",
            StrategyKind::LazySequence => "lazy-sequence",
            StrategyKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<T> ConstructionStrategy<T> {
    pub fn mutable(
        create: impl Fn(usize) -> Value + Send + Sync + 'static,
        add: impl Fn(&mut Value, T) -> Result<(), ShapeError> + Send + Sync + 'static,
    ) -> Self {
        ConstructionStrategy::Mutable {
            create: Arc::new(create),
            add: Arc::new(add),
        }
    }

    pub fn buffered(
        build: impl Fn(SpanBuffer<T>) -> Result<Value, ShapeError> + Send + Sync + 'static,
    ) -> Self {
        ConstructionStrategy::BufferedSpan(Arc::new(build))
    }

    pub fn lazy(
        build: impl Fn(&mut dyn Iterator<Item = T>) -> Result<Value, ShapeError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        ConstructionStrategy::LazySequence(Arc::new(build))
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            ConstructionStrategy::Mutable { .. } => StrategyKind::Mutable,
            ConstructionStrategy::BufferedSpan(_) => StrategyKind::BufferedSpan,
            ConstructionStrategy::LazySequence(_) => StrategyKind::LazySequence,
            ConstructionStrategy::Unsupported => StrategyKind::Unsupported,
        }
    }
}

// Manual impl: `T` itself need not be `Clone`.
impl<T> Clone for ConstructionStrategy<T> {
    fn clone(&self) -> Self {
        match self {
            ConstructionStrategy::Mutable { create, add } => ConstructionStrategy::Mutable {
                create: Arc::clone(create),
                add: Arc::clone(add),
            },
            ConstructionStrategy::BufferedSpan(build) => {
                ConstructionStrategy::BufferedSpan(Arc::clone(build))
            }
            ConstructionStrategy::LazySequence(build) => {
                ConstructionStrategy::LazySequence(Arc::clone(build))
            }
            ConstructionStrategy::Unsupported => ConstructionStrategy::Unsupported,
        }
    }
}

impl<T> fmt::Debug for ConstructionStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstructionStrategy::{:?}", self.kind())
    }
}

/// Items accumulated for a buffered constructor, plus their dimensions.
///
/// Rank-1 buffers have a single dimension equal to the item count. Higher
/// ranks store items row-major with the product of `dims` equal to the count.
#[derive(Debug)]
pub struct SpanBuffer<T> {
    items: Vec<T>,
    dims: Dims,
}

impl<T> SpanBuffer<T> {
    pub fn linear(items: Vec<T>) -> Self {
        let dims = smallvec![items.len()];
        SpanBuffer { items, dims }
    }

    pub fn shaped(items: Vec<T>, dims: Dims) -> Result<Self, ShapeError> {
        let expected: usize = dims.iter().product();
        if expected != items.len() {
            return Err(ShapeError::GridSize {
                dims: dims.to_vec(),
                expected,
                found: items.len(),
            });
        }
        Ok(SpanBuffer { items, dims })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn into_parts(self) -> (Vec<T>, Dims) {
        (self.items, self.dims)
    }
}
