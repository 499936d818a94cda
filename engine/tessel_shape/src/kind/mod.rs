//! Shape kind tags.
//!
//! Every shape carries exactly one `Kind`. Dispatch in the visitor protocol is
//! a pure function of the kind: `ShapeNode::accept` matches on it and calls
//! the single corresponding `visit_*` method.

use std::fmt;

/// Kind discriminant of a shape.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum Kind {
    /// Leaf types with a built-in representation (ints, strings, timestamps).
    Primitive = 0,
    /// Records/classes: properties plus an optional constructor.
    Object = 1,
    /// Named integral constants.
    Enum = 2,
    /// Present-or-absent wrapper.
    Optional = 3,
    /// Sequences and fixed-rank grids.
    Enumerable = 4,
    /// Key/value collections.
    Dictionary = 5,
    /// Types represented through another shape plus a bijection.
    Surrogate = 6,
    /// Tagged choice among case shapes with a base shape.
    Union = 7,
    /// Callable values.
    Function = 8,
}

impl Kind {
    pub const ALL: [Kind; 9] = [
        Kind::Primitive,
        Kind::Object,
        Kind::Enum,
        Kind::Optional,
        Kind::Enumerable,
        Kind::Dictionary,
        Kind::Surrogate,
        Kind::Union,
        Kind::Function,
    ];

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::Object => "object",
            Self::Enum => "enum",
            Self::Optional => "optional",
            Self::Enumerable => "enumerable",
            Self::Dictionary => "dictionary",
            Self::Surrogate => "surrogate",
            Self::Union => "union",
            Self::Function => "function",
        }
    }

    /// Kinds whose shapes hold child shapes.
    #[inline]
    pub const fn has_children(self) -> bool {
        !matches!(self, Self::Primitive)
    }

    /// Kinds that are built through a construction strategy.
    #[inline]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::Enumerable | Self::Dictionary)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The built-in leaf types.
///
/// The discriminant doubles as the fixed `ShapeId` of the primitive.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum PrimitiveKind {
    Unit = 0,
    Bool = 1,
    Int = 2,
    UInt = 3,
    Float = 4,
    Char = 5,
    Str = 6,
    Bytes = 7,
    Timestamp = 8,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Unit,
        PrimitiveKind::Bool,
        PrimitiveKind::Int,
        PrimitiveKind::UInt,
        PrimitiveKind::Float,
        PrimitiveKind::Char,
        PrimitiveKind::Str,
        PrimitiveKind::Bytes,
        PrimitiveKind::Timestamp,
    ];

    #[inline]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Unit),
            1 => Some(Self::Bool),
            2 => Some(Self::Int),
            3 => Some(Self::UInt),
            4 => Some(Self::Float),
            5 => Some(Self::Char),
            6 => Some(Self::Str),
            7 => Some(Self::Bytes),
            8 => Some(Self::Timestamp),
            _ => None,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Char => "char",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests;
