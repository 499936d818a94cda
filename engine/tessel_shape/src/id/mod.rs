//! Shape and provider handles.
//!
//! `ShapeId` is the type identity used everywhere in the engine: a 32-bit
//! index into the owning provider's pool. Two shapes are the same type iff
//! their ids are equal within one provider, which makes the id a direct
//! cache key.
//!
//! Primitive shapes are pre-registered at fixed indices (0-8) so builders can
//! recognise them without a pool lookup.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::kind::PrimitiveKind;

/// A 32-bit index into a shape pool.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ShapeId(u32);

impl ShapeId {
    // === Primitive Shapes (indices 0-8) ===

    /// The unit type.
    pub const UNIT: Self = Self(0);
    /// Booleans.
    pub const BOOL: Self = Self(1);
    /// 64-bit signed integers.
    pub const INT: Self = Self(2);
    /// 64-bit unsigned integers.
    pub const UINT: Self = Self(3);
    /// 64-bit floating point.
    pub const FLOAT: Self = Self(4);
    /// Unicode scalar values.
    pub const CHAR: Self = Self(5);
    /// UTF-8 strings.
    pub const STR: Self = Self(6);
    /// Byte strings.
    pub const BYTES: Self = Self(7);
    /// Microseconds since the Unix epoch.
    pub const TIMESTAMP: Self = Self(8);

    // Reserved: 9-15 for future primitives.

    /// First index handed out for user shapes.
    pub const FIRST_DYNAMIC: u32 = 16;

    /// Number of pre-registered primitive shapes.
    pub const PRIMITIVE_COUNT: u32 = 9;

    /// Sentinel for "no shape".
    pub const NONE: Self = Self(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this id is one of the pre-registered primitives.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// The fixed id of a primitive shape.
    #[inline]
    pub const fn of_primitive(kind: PrimitiveKind) -> Self {
        Self(kind as u32)
    }

    /// The primitive kind for a fixed primitive id.
    #[inline]
    pub const fn as_primitive(self) -> Option<PrimitiveKind> {
        PrimitiveKind::from_raw(self.0)
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "ShapeId::NONE");
        }
        match self.as_primitive() {
            Some(kind) => write!(f, "ShapeId::{}", kind.name().to_ascii_uppercase()),
            None => write!(f, "ShapeId({})", self.0),
        }
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "<none>");
        }
        match self.as_primitive() {
            Some(kind) => f.write_str(kind.name()),
            None => write!(f, "shape#{}", self.0),
        }
    }
}

/// Identity of a shape provider.
///
/// Caches are keyed by provider first, so two providers describing a type
/// with the same name never share artifacts.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ProviderId(u32);

static NEXT_PROVIDER: AtomicU32 = AtomicU32::new(1);

impl ProviderId {
    /// Allocate a process-unique provider id.
    pub fn fresh() -> Self {
        Self(NEXT_PROVIDER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider#{}", self.0)
    }
}

const _: () = assert!(std::mem::size_of::<ShapeId>() == 4);

#[cfg(test)]
mod tests;
