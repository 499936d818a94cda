//! Errors raised by shape accessors and pool construction.

use std::sync::Arc;

use crate::ShapeId;

/// Failure of a shape accessor or of pool bookkeeping.
///
/// Accessors fail when the value handed to them does not have the form the
/// shape describes (a record getter called on a list, an ordinal that is not
/// an enum member).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// The value has the wrong runtime form.
    #[error("expected {expected} value, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A record value has fewer fields than the accessor expects.
    #[error("field {index} out of range for `{type_name}`")]
    FieldOutOfRange { type_name: Arc<str>, index: usize },

    /// A record value belongs to a different type than the accessor's.
    #[error("expected a `{expected}` record, found `{found}`")]
    WrongRecord { expected: Arc<str>, found: Arc<str> },

    /// An ordinal that names no enum member.
    #[error("{ordinal} is not a member of `{type_name}`")]
    UnknownOrdinal { type_name: Arc<str>, ordinal: i64 },

    /// Grid items do not fill the declared dimensions.
    #[error("grid dimensions {dims:?} need {expected} items, found {found}")]
    GridSize {
        dims: Vec<usize>,
        expected: usize,
        found: usize,
    },

    /// A function was invoked with the wrong number of arguments.
    #[error("`{name}` takes {expected} arguments, {found} given")]
    Arity {
        name: Arc<str>,
        expected: usize,
        found: usize,
    },

    /// A type name is registered twice in one pool.
    #[error("type `{0}` is already registered")]
    DuplicateName(Arc<str>),

    /// `define` on an id that was never reserved, or already defined.
    #[error("{id} is not a reserved, undefined shape")]
    NotReserved { id: ShapeId },

    /// No generic template is registered under this name.
    #[error("no generic template named `{0}`")]
    UnknownTemplate(Arc<str>),

    /// Provider-specific failure.
    #[error("{0}")]
    Custom(Arc<str>),
}

impl ShapeError {
    pub fn custom(message: impl Into<Arc<str>>) -> Self {
        ShapeError::Custom(message.into())
    }
}
