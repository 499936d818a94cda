//! Shape graph for the tessel generation engine.
//!
//! A shape is a runtime description of one type: its kind (object, enum,
//! collection, ...) and its structure, with every reference to another type
//! expressed as a [`ShapeId`]. Shapes come from a [`ShapeProvider`]; the
//! in-crate provider is [`ShapePool`].
//!
//! # Architecture
//!
//! - **`ShapeId`**: 32-bit handle; primitives have fixed ids
//! - **`Shape` / `ShapeData`**: one type's description, with accessor closures
//! - **`Value`**: runtime data that accessors read and construct
//! - **`ShapePool`**: arena provider with interning and generic instantiation
//! - **`ShapeVisitor`**: per-kind double dispatch used by generators
//!
//! Cycles in the type graph are ordinary: a shape may reference its own id.
//! Walking such a graph without revisiting is the engine's job, not this
//! crate's.

mod error;
mod id;
mod kind;
mod pool;
mod provider;
mod shape;
mod value;
mod visit;

pub use error::ShapeError;
pub use id::{ProviderId, ShapeId};
pub use kind::{Kind, PrimitiveKind};
pub use pool::{GenericTemplate, RecordBuilder, ShapePool};
pub use provider::ShapeProvider;
pub use shape::{
    AddFn, ArgumentState, ConstructFn, ConstructionStrategy, ConstructorShape, CountFn, CreateFn,
    DictionaryShape, Dims, DimensionsFn, ElementsFn, EntriesFn, EntryIter, EnumMember, EnumShape,
    EnumerableShape, Factory, FunctionParam, FunctionShape, Getter, ObjectShape, OptionalShape,
    ParameterShape, PropertyFlags, PropertyShape, Rebuild, SequenceFn, Setter, Shape, ShapeData,
    SpanBuffer, SpanFn, StrategyKind, SurrogateShape, UnionCase, UnionShape, ValueIter,
};
pub use value::{FunctionValue, GridValue, Heap, NativeFn, RecordValue, Value};
pub use visit::{reachable, Edges, Node, ShapeNode, ShapeVisitor};
