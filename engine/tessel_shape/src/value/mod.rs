//! Runtime values described by shapes.
//!
//! Shapes do not own data; their accessor functions read and build `Value`s.
//! The variants cover what stock pool shapes produce. Custom providers may use
//! any variant as long as their accessors agree with each other.
//!
//! # Ordering
//!
//! `Value` is `Eq + Ord + Hash` so it can key a `BTreeMap` and be compared by
//! the dictionary duplicate check. Floats compare by `f64::total_cmp`, so
//! `NaN == NaN` and `-0.0 != 0.0`. Functions compare by closure identity.
//!
//! # Thread Safety
//!
//! Heap variants share storage through `Arc`; cloning a value is O(1) and
//! values are `Send + Sync`.

mod heap;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::ShapeError;

pub use heap::Heap;

/// Callable body of a [`FunctionValue`].
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, ShapeError> + Send + Sync>;

/// Runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    // Scalars
    Unit,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(Heap<str>),
    Bytes(Heap<[u8]>),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),

    // Collections
    List(Heap<Vec<Value>>),
    Set(Heap<BTreeSet<Value>>),
    /// Row-major multi-dimensional array.
    Grid(GridValue),
    Map(Heap<BTreeMap<Value, Value>>),

    // Structured
    Record(RecordValue),
    Some(Heap<Value>),
    None,
    Enum { type_name: Arc<str>, ordinal: i64 },
    Function(FunctionValue),
}

/// Positional record fields tagged with the record's type name.
#[derive(Clone, Debug)]
pub struct RecordValue {
    pub type_name: Arc<str>,
    pub fields: Heap<Vec<Value>>,
}

impl RecordValue {
    pub fn field(&self, index: usize) -> Result<&Value, ShapeError> {
        self.fields
            .get(index)
            .ok_or_else(|| ShapeError::FieldOutOfRange {
                type_name: Arc::clone(&self.type_name),
                index,
            })
    }

    pub fn set_field(&mut self, index: usize, value: Value) -> Result<(), ShapeError> {
        let type_name = Arc::clone(&self.type_name);
        let slot = Heap::make_mut(&mut self.fields)
            .get_mut(index)
            .ok_or(ShapeError::FieldOutOfRange { type_name, index })?;
        *slot = value;
        Ok(())
    }
}

/// Row-major grid with explicit dimensions.
#[derive(Clone, Debug)]
pub struct GridValue {
    pub dims: SmallVec<[usize; 2]>,
    pub items: Heap<Vec<Value>>,
}

/// A callable value.
#[derive(Clone)]
pub struct FunctionValue {
    pub name: Arc<str>,
    pub arity: usize,
    body: NativeFn,
}

impl FunctionValue {
    pub fn new(
        name: impl Into<Arc<str>>,
        arity: usize,
        body: impl Fn(&[Value]) -> Result<Value, ShapeError> + Send + Sync + 'static,
    ) -> Self {
        FunctionValue {
            name: name.into(),
            arity,
            body: Arc::new(body),
        }
    }

    /// Call with an arity check.
    pub fn call(&self, args: &[Value]) -> Result<Value, ShapeError> {
        if args.len() != self.arity {
            return Err(ShapeError::Arity {
                name: Arc::clone(&self.name),
                expected: self.arity,
                found: args.len(),
            });
        }
        (self.body)(args)
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.body).cast::<()>() as usize
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionValue({}/{})", self.name, self.arity)
    }
}

// Factory Methods (ONLY way to construct heap values)

impl Value {
    #[inline]
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Heap::from_arc(Arc::from(s.as_ref())))
    }

    #[inline]
    pub fn bytes(b: impl AsRef<[u8]>) -> Self {
        Value::Bytes(Heap::from_arc(Arc::from(b.as_ref())))
    }

    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Heap::new(items))
    }

    #[inline]
    pub fn set(items: BTreeSet<Value>) -> Self {
        Value::Set(Heap::new(items))
    }

    #[inline]
    pub fn map(entries: BTreeMap<Value, Value>) -> Self {
        Value::Map(Heap::new(entries))
    }

    #[inline]
    pub fn grid(dims: &[usize], items: Vec<Value>) -> Self {
        Value::Grid(GridValue {
            dims: SmallVec::from_slice(dims),
            items: Heap::new(items),
        })
    }

    #[inline]
    pub fn record(type_name: impl Into<Arc<str>>, fields: Vec<Value>) -> Self {
        Value::Record(RecordValue {
            type_name: type_name.into(),
            fields: Heap::new(fields),
        })
    }

    #[inline]
    pub fn some(value: Value) -> Self {
        Value::Some(Heap::new(value))
    }

    #[inline]
    pub fn enumeration(type_name: impl Into<Arc<str>>, ordinal: i64) -> Self {
        Value::Enum {
            type_name: type_name.into(),
            ordinal,
        }
    }

    #[inline]
    pub fn function(function: FunctionValue) -> Self {
        Value::Function(function)
    }

    /// Variant name for diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Grid(_) => "grid",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Some(_) => "some",
            Value::None => "none",
            Value::Enum { .. } => "enum",
            Value::Function(_) => "function",
        }
    }

    fn mismatch(&self, expected: &'static str) -> ShapeError {
        ShapeError::Mismatch {
            expected,
            found: self.kind_name(),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], ShapeError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut Vec<Value>, ShapeError> {
        match self {
            Value::List(items) => Ok(Heap::make_mut(items)),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn as_set(&self) -> Result<&BTreeSet<Value>, ShapeError> {
        match self {
            Value::Set(items) => Ok(items),
            other => Err(other.mismatch("set")),
        }
    }

    pub fn as_set_mut(&mut self) -> Result<&mut BTreeSet<Value>, ShapeError> {
        match self {
            Value::Set(items) => Ok(Heap::make_mut(items)),
            other => Err(other.mismatch("set")),
        }
    }

    pub fn as_grid(&self) -> Result<&GridValue, ShapeError> {
        match self {
            Value::Grid(grid) => Ok(grid),
            other => Err(other.mismatch("grid")),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<Value, Value>, ShapeError> {
        match self {
            Value::Map(entries) => Ok(entries),
            other => Err(other.mismatch("map")),
        }
    }

    pub fn as_map_mut(&mut self) -> Result<&mut BTreeMap<Value, Value>, ShapeError> {
        match self {
            Value::Map(entries) => Ok(Heap::make_mut(entries)),
            other => Err(other.mismatch("map")),
        }
    }

    pub fn as_record(&self) -> Result<&RecordValue, ShapeError> {
        match self {
            Value::Record(record) => Ok(record),
            other => Err(other.mismatch("record")),
        }
    }

    pub fn as_record_mut(&mut self) -> Result<&mut RecordValue, ShapeError> {
        match self {
            Value::Record(record) => Ok(record),
            other => Err(other.mismatch("record")),
        }
    }

    pub fn as_function(&self) -> Result<&FunctionValue, ShapeError> {
        match self {
            Value::Function(function) => Ok(function),
            other => Err(other.mismatch("function")),
        }
    }

    pub fn as_int(&self) -> Result<i64, ShapeError> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn as_str(&self) -> Result<&str, ShapeError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(other.mismatch("str")),
        }
    }

    /// Record type name, if this is a record.
    pub fn record_type(&self) -> Option<&str> {
        match self {
            Value::Record(record) => Some(&record.type_name),
            _ => None,
        }
    }

    /// Position in the cross-variant ordering.
    const fn rank(&self) -> u8 {
        match self {
            Value::Unit => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::UInt(_) => 3,
            Value::Float(_) => 4,
            Value::Char(_) => 5,
            Value::Str(_) => 6,
            Value::Bytes(_) => 7,
            Value::Timestamp(_) => 8,
            Value::List(_) => 9,
            Value::Set(_) => 10,
            Value::Grid(_) => 11,
            Value::Map(_) => 12,
            Value::Record(_) => 13,
            Value::Some(_) => 14,
            Value::None => 15,
            Value::Enum { .. } => 16,
            Value::Function(_) => 17,
        }
    }
}

// Trait Implementations

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Unit, Value::Unit) | (Value::None, Value::None) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) | (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::UInt(a), Value::UInt(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => (**a).cmp(&**b),
            (Value::Bytes(a), Value::Bytes(b)) => (**a).cmp(&**b),
            (Value::List(a), Value::List(b)) => a.iter().cmp(b.iter()),
            (Value::Set(a), Value::Set(b)) => a.iter().cmp(b.iter()),
            (Value::Grid(a), Value::Grid(b)) => a
                .dims
                .cmp(&b.dims)
                .then_with(|| a.items.iter().cmp(b.items.iter())),
            (Value::Map(a), Value::Map(b)) => a.iter().cmp(b.iter()),
            (Value::Record(a), Value::Record(b)) => a
                .type_name
                .cmp(&b.type_name)
                .then_with(|| a.fields.iter().cmp(b.fields.iter())),
            (Value::Some(a), Value::Some(b)) => (**a).cmp(&**b),
            (
                Value::Enum {
                    type_name: t1,
                    ordinal: o1,
                },
                Value::Enum {
                    type_name: t2,
                    ordinal: o2,
                },
            ) => t1.cmp(t2).then(o1.cmp(o2)),
            (Value::Function(a), Value::Function(b)) => a.identity().cmp(&b.identity()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Unit | Value::None => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) | Value::Timestamp(n) => n.hash(state),
            Value::UInt(n) => n.hash(state),
            Value::Float(x) => x.to_bits().hash(state),
            Value::Char(c) => c.hash(state),
            Value::Str(s) => (**s).hash(state),
            Value::Bytes(b) => (**b).hash(state),
            Value::List(items) => {
                items.len().hash(state);
                for item in items.iter() {
                    item.hash(state);
                }
            }
            Value::Set(items) => {
                items.len().hash(state);
                for item in items.iter() {
                    item.hash(state);
                }
            }
            Value::Grid(grid) => {
                grid.dims.hash(state);
                for item in grid.items.iter() {
                    item.hash(state);
                }
            }
            // BTreeMap iteration is ordered, so the hash is deterministic.
            Value::Map(entries) => {
                entries.len().hash(state);
                for (k, v) in entries.iter() {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Record(record) => {
                record.type_name.hash(state);
                for field in record.fields.iter() {
                    field.hash(state);
                }
            }
            Value::Some(inner) => inner.hash(state),
            Value::Enum { type_name, ordinal } => {
                type_name.hash(state);
                ordinal.hash(state);
            }
            Value::Function(f) => f.identity().hash(state),
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}u"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::Str(s) => write!(f, "{:?}", &**s),
            Value::Bytes(b) => write!(f, "b{:?}", &**b),
            Value::Timestamp(us) => write!(f, "@{us}us"),
            Value::List(items) => {
                f.write_str("[")?;
                write_joined(f, items.iter())?;
                f.write_str("]")
            }
            Value::Set(items) => {
                f.write_str("{")?;
                write_joined(f, items.iter())?;
                f.write_str("}")
            }
            Value::Grid(grid) => {
                write!(f, "grid{:?}[", grid.dims.as_slice())?;
                write_joined(f, grid.items.iter())?;
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Record(record) => {
                write!(f, "{}(", record.type_name)?;
                write_joined(f, record.fields.iter())?;
                f.write_str(")")
            }
            Value::Some(inner) => write!(f, "Some({})", &**inner),
            Value::None => f.write_str("None"),
            Value::Enum { type_name, ordinal } => write!(f, "{type_name}#{ordinal}"),
            Value::Function(func) => write!(f, "<fn {}/{}>", func.name, func.arity),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}
