//! Shape nodes.
//!
//! A `Shape` describes one type: its name, its kind, and kind-specific
//! children (always referenced by `ShapeId`, so a shape may point back at
//! itself or an ancestor). Behaviour the engine cannot derive structurally
//! (reading a property, building a collection) is supplied as accessor
//! closures alongside the structure.
//!
//! Shapes are immutable once defined in a pool.

mod construction;

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::{Kind, PrimitiveKind, ShapeError, ShapeId, Value};

pub use construction::{
    AddFn, ConstructionStrategy, CreateFn, Dims, SequenceFn, SpanBuffer, SpanFn, StrategyKind,
};

/// Read one facet of a value.
pub type Getter = Arc<dyn Fn(&Value) -> Result<Value, ShapeError> + Send + Sync>;

/// Write one facet of a value in place.
pub type Setter = Arc<dyn Fn(&mut Value, Value) -> Result<(), ShapeError> + Send + Sync>;

/// Produce a fresh value.
pub type Factory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Consume a value and produce another.
pub type Rebuild = Arc<dyn Fn(Value) -> Result<Value, ShapeError> + Send + Sync>;

/// Lazily borrowed element sequence.
pub type ValueIter<'a> = Box<dyn Iterator<Item = Value> + 'a>;

/// Lazily borrowed entry sequence.
pub type EntryIter<'a> = Box<dyn Iterator<Item = (Value, Value)> + 'a>;

pub type ElementsFn =
    Arc<dyn for<'a> Fn(&'a Value) -> Result<ValueIter<'a>, ShapeError> + Send + Sync>;

pub type EntriesFn =
    Arc<dyn for<'a> Fn(&'a Value) -> Result<EntryIter<'a>, ShapeError> + Send + Sync>;

pub type CountFn = Arc<dyn Fn(&Value) -> Result<usize, ShapeError> + Send + Sync>;

pub type DimensionsFn = Arc<dyn Fn(&Value) -> Result<Dims, ShapeError> + Send + Sync>;

/// One type's description.
pub struct Shape {
    pub name: Arc<str>,
    pub data: ShapeData,
}

/// Kind-specific part of a shape.
#[derive(Clone)]
pub enum ShapeData {
    Primitive(PrimitiveKind),
    Object(ObjectShape),
    Enum(EnumShape),
    Optional(OptionalShape),
    Enumerable(EnumerableShape),
    Dictionary(DictionaryShape),
    Surrogate(SurrogateShape),
    Union(UnionShape),
    Function(FunctionShape),
}

impl Shape {
    pub fn new(name: impl Into<Arc<str>>, data: ShapeData) -> Self {
        Shape {
            name: name.into(),
            data,
        }
    }

    pub fn kind(&self) -> Kind {
        self.data.kind()
    }

    /// Direct child shapes, in declaration order. May contain repeats.
    pub fn children(&self) -> SmallVec<[ShapeId; 4]> {
        match &self.data {
            ShapeData::Primitive(_) => SmallVec::new(),
            ShapeData::Object(obj) => {
                let mut out: SmallVec<[ShapeId; 4]> =
                    obj.properties.iter().map(|p| p.shape).collect();
                if let Some(ctor) = &obj.constructor {
                    out.extend(ctor.params.iter().map(|p| p.shape));
                }
                out
            }
            ShapeData::Enum(e) => smallvec::smallvec![e.underlying],
            ShapeData::Optional(o) => smallvec::smallvec![o.element],
            ShapeData::Enumerable(e) => smallvec::smallvec![e.element],
            ShapeData::Dictionary(d) => smallvec::smallvec![d.key, d.value],
            ShapeData::Surrogate(s) => smallvec::smallvec![s.surrogate],
            ShapeData::Union(u) => {
                let mut out: SmallVec<[ShapeId; 4]> = smallvec::smallvec![u.base];
                out.extend(u.cases.iter().map(|c| c.shape));
                out
            }
            ShapeData::Function(f) => {
                let mut out: SmallVec<[ShapeId; 4]> = f.params.iter().map(|p| p.shape).collect();
                out.extend(f.returns);
                out
            }
        }
    }

    /// Children every value of this shape contains. Optionals, collections
    /// and dictionaries can be empty and contribute none; union options all
    /// count, since any of them may be chosen.
    pub fn required_children(&self) -> SmallVec<[ShapeId; 4]> {
        match &self.data {
            ShapeData::Object(_) | ShapeData::Surrogate(_) | ShapeData::Union(_) => {
                self.children()
            }
            ShapeData::Primitive(_)
            | ShapeData::Enum(_)
            | ShapeData::Optional(_)
            | ShapeData::Enumerable(_)
            | ShapeData::Dictionary(_)
            | ShapeData::Function(_) => SmallVec::new(),
        }
    }
}

impl ShapeData {
    pub fn kind(&self) -> Kind {
        match self {
            ShapeData::Primitive(_) => Kind::Primitive,
            ShapeData::Object(_) => Kind::Object,
            ShapeData::Enum(_) => Kind::Enum,
            ShapeData::Optional(_) => Kind::Optional,
            ShapeData::Enumerable(_) => Kind::Enumerable,
            ShapeData::Dictionary(_) => Kind::Dictionary,
            ShapeData::Surrogate(_) => Kind::Surrogate,
            ShapeData::Union(_) => Kind::Union,
            ShapeData::Function(_) => Kind::Function,
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("children", &self.children())
            .finish()
    }
}

// === Object ===

bitflags! {
    /// Accessor capabilities of a property.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct PropertyFlags: u8 {
        /// Has a getter.
        const READABLE = 1 << 0;
        /// Has a setter.
        const WRITABLE = 1 << 1;
        /// Must be supplied when the object is built from outside data.
        const REQUIRED = 1 << 2;
    }
}

#[derive(Clone)]
pub struct PropertyShape {
    pub name: Arc<str>,
    pub shape: ShapeId,
    pub getter: Option<Getter>,
    pub setter: Option<Setter>,
    pub flags: PropertyFlags,
}

impl PropertyShape {
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn is_required(&self) -> bool {
        self.flags.contains(PropertyFlags::REQUIRED)
    }

    pub fn get(&self, target: &Value) -> Option<Result<Value, ShapeError>> {
        self.getter.as_ref().map(|get| get(target))
    }
}

#[derive(Clone)]
pub struct ParameterShape {
    pub name: Arc<str>,
    pub shape: ShapeId,
    /// Index of the property this parameter initialises, if any.
    pub property: Option<usize>,
    pub required: bool,
}

/// Argument slots for one constructor call, one per parameter.
#[derive(Clone, Debug, Default)]
pub struct ArgumentState {
    slots: Vec<Option<Value>>,
}

impl ArgumentState {
    pub fn new(arity: usize) -> Self {
        ArgumentState {
            slots: vec![None; arity],
        }
    }

    /// Store an argument. Returns `false` if the slot was already filled.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                let fresh = slot.is_none();
                *slot = Some(value);
                fresh
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn take(&mut self, index: usize) -> Option<Value> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Names of required parameters with no argument, in parameter order.
    pub fn missing_required(&self, params: &[ParameterShape]) -> Vec<Arc<str>> {
        params
            .iter()
            .enumerate()
            .filter(|(i, p)| p.required && !self.is_set(*i))
            .map(|(_, p)| Arc::clone(&p.name))
            .collect()
    }
}

pub type ConstructFn = Arc<dyn Fn(ArgumentState) -> Result<Value, ShapeError> + Send + Sync>;

#[derive(Clone)]
pub struct ConstructorShape {
    pub params: Vec<ParameterShape>,
    pub construct: ConstructFn,
}

impl ConstructorShape {
    /// Parameter that initialises the given property.
    pub fn param_for_property(&self, property: usize) -> Option<usize> {
        self.params.iter().position(|p| p.property == Some(property))
    }
}

#[derive(Clone)]
pub struct ObjectShape {
    pub properties: Vec<PropertyShape>,
    pub constructor: Option<ConstructorShape>,
    /// Default constructor; properties are then filled through setters.
    pub create_default: Option<Factory>,
}

impl ObjectShape {
    pub fn property(&self, name: &str) -> Option<(usize, &PropertyShape)> {
        self.properties
            .iter()
            .enumerate()
            .find(|(_, p)| &*p.name == name)
    }
}

// === Enum ===

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumMember {
    pub name: Arc<str>,
    pub ordinal: i64,
}

#[derive(Clone)]
pub struct EnumShape {
    /// Shape of the ordinal representation.
    pub underlying: ShapeId,
    pub members: Vec<EnumMember>,
    pub ordinal_of: Arc<dyn Fn(&Value) -> Result<i64, ShapeError> + Send + Sync>,
    pub from_ordinal: Arc<dyn Fn(i64) -> Result<Value, ShapeError> + Send + Sync>,
}

impl EnumShape {
    pub fn member_by_name(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| &*m.name == name)
    }

    pub fn member_by_ordinal(&self, ordinal: i64) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.ordinal == ordinal)
    }
}

// === Optional ===

#[derive(Clone)]
pub struct OptionalShape {
    pub element: ShapeId,
    /// Test-and-extract: `Some(inner)` when a value is present.
    pub deconstruct: Arc<dyn Fn(&Value) -> Result<Option<Value>, ShapeError> + Send + Sync>,
    pub none: Factory,
    pub some: Arc<dyn Fn(Value) -> Value + Send + Sync>,
}

// === Collections ===

#[derive(Clone)]
pub struct EnumerableShape {
    pub element: ShapeId,
    /// 1 for sequences, >1 for fixed-rank grids.
    pub rank: u8,
    pub construction: ConstructionStrategy<Value>,
    /// Elements in encounter order (row-major for grids).
    pub elements: ElementsFn,
    /// Required when `rank > 1`.
    pub dimensions: Option<DimensionsFn>,
}

#[derive(Clone)]
pub struct DictionaryShape {
    pub key: ShapeId,
    pub value: ShapeId,
    pub construction: ConstructionStrategy<(Value, Value)>,
    pub entries: EntriesFn,
    /// Entry count of a built dictionary; feeds the duplicate-key check.
    pub len: CountFn,
}

// === Surrogate ===

/// A type represented through another shape.
///
/// `to_surrogate` and `from_surrogate` must be mutually inverse.
#[derive(Clone)]
pub struct SurrogateShape {
    pub surrogate: ShapeId,
    pub to_surrogate: Getter,
    pub from_surrogate: Rebuild,
}

// === Union ===

#[derive(Clone)]
pub struct UnionCase {
    pub tag: i32,
    pub name: Arc<str>,
    pub shape: ShapeId,
    /// Base value to case value.
    pub downcast: Getter,
    /// Case value to base value.
    pub upcast: Rebuild,
}

#[derive(Clone)]
pub struct UnionShape {
    pub base: ShapeId,
    pub cases: Vec<UnionCase>,
    /// Position in `cases` of the case a value belongs to; `None` for the base.
    pub selector: Arc<dyn Fn(&Value) -> Option<usize> + Send + Sync>,
}

impl UnionShape {
    pub fn case_by_tag(&self, tag: i32) -> Option<(usize, &UnionCase)> {
        self.cases.iter().enumerate().find(|(_, c)| c.tag == tag)
    }
}

// === Function ===

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionParam {
    pub name: Arc<str>,
    pub shape: ShapeId,
}

#[derive(Clone)]
pub struct FunctionShape {
    pub params: Vec<FunctionParam>,
    /// `None` for functions returning nothing.
    pub returns: Option<ShapeId>,
    pub is_async: bool,
    /// Invoke a function value with arguments.
    pub invoke: Arc<dyn Fn(&Value, &[Value]) -> Result<Value, ShapeError> + Send + Sync>,
}

#[cfg(test)]
mod tests;
