//! Generation errors.
//!
//! Every variant is terminal: nothing here is retried by the engine. A failed
//! build leaves no cache entry behind, so the caller may fix the cause and
//! ask again.

use std::sync::Arc;

use tessel_shape::{ProviderId, ShapeError, ShapeId, Value};

use crate::ArtifactKind;

pub type GenResult<T> = Result<T, GenError>;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GenError {
    /// The builder has no artifact for this shape.
    #[error("cannot build a {kind} for `{type_name}`: {reason}")]
    Unsupported {
        kind: ArtifactKind,
        type_name: Arc<str>,
        reason: Arc<str>,
    },

    /// The shape declares no usable way to construct values.
    #[error("cannot construct `{type_name}`: {detail}")]
    ConstructionUnsupported {
        type_name: Arc<str>,
        detail: Arc<str>,
    },

    /// Bulk dictionary construction received the same key twice.
    #[error("duplicate key {key} in `{type_name}`")]
    DuplicateKey { type_name: Arc<str>, key: Value },

    /// An object was given the same member twice.
    #[error("duplicate property `{property}` in `{type_name}`")]
    DuplicateProperty {
        type_name: Arc<str>,
        property: Arc<str>,
    },

    /// Required members were never supplied. Lists all of them.
    #[error("`{type_name}` is missing required members: {}", .missing.join(", "))]
    MissingRequired {
        type_name: Arc<str>,
        missing: Vec<Arc<str>>,
    },

    /// Input data does not have the form the shape expects.
    #[error("expected {expected} for `{type_name}`, found {found}")]
    Mismatch {
        type_name: Arc<str>,
        expected: &'static str,
        found: Arc<str>,
    },

    /// The provider has no shape for an id reached during generation.
    #[error("{provider} has no shape for {id}")]
    UnknownShape { provider: ProviderId, id: ShapeId },

    /// A cache was paired with a provider it does not belong to.
    #[error("cache belongs to {cache}, not {provider}")]
    ProviderMismatch {
        cache: ProviderId,
        provider: ProviderId,
    },

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl GenError {
    pub fn unsupported(
        kind: ArtifactKind,
        type_name: impl Into<Arc<str>>,
        reason: impl Into<Arc<str>>,
    ) -> Self {
        GenError::Unsupported {
            kind,
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn construction(type_name: impl Into<Arc<str>>, detail: impl Into<Arc<str>>) -> Self {
        GenError::ConstructionUnsupported {
            type_name: type_name.into(),
            detail: detail.into(),
        }
    }

    pub fn mismatch(
        type_name: impl Into<Arc<str>>,
        expected: &'static str,
        found: impl Into<Arc<str>>,
    ) -> Self {
        GenError::Mismatch {
            type_name: type_name.into(),
            expected,
            found: found.into(),
        }
    }
}
