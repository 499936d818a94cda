//! The interface through which the engine obtains shapes.

use crate::{ProviderId, Shape, ShapeId, ShapeNode};

/// Source of shapes for one set of types.
///
/// A provider is immutable for the duration of a generation session. Two
/// providers may describe types with the same name; the engine keys all of
/// its caches by [`ShapeProvider::id`] first, so their artifacts never mix.
pub trait ShapeProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// The shape behind an id, or `None` if the id is unknown or reserved but
    /// not yet defined.
    fn shape(&self, id: ShapeId) -> Option<&Shape>;

    /// Resolve a concrete type by name.
    fn resolve(&self, name: &str) -> Option<ShapeId>;

    /// Resolve a closed generic `name<args...>`.
    fn resolve_generic(&self, name: &str, args: &[ShapeId]) -> Option<ShapeId>;

    /// The shape behind an id, wrapped for visitor dispatch.
    fn node(&self, id: ShapeId) -> Option<ShapeNode<'_>> {
        self.shape(id).map(|shape| ShapeNode::new(id, shape))
    }

    /// Type name for diagnostics; falls back to the id's display form.
    fn type_name(&self, id: ShapeId) -> String {
        match self.shape(id) {
            Some(shape) => shape.name.to_string(),
            None => id.to_string(),
        }
    }
}
