//! Arena of shapes addressed by `ShapeId`.
//!
//! The pool is the in-crate [`ShapeProvider`]. Shapes live in a flat `Vec`
//! indexed by id, so a cyclic type graph is just ids pointing at each other.
//!
//! # Building cycles
//!
//! A self-referential type needs its own id before its children exist:
//!
//! ```text
//! let node = pool.reserve("Node")?;
//! let children = pool.list(node);
//! RecordBuilder::new("Node").field("value", ShapeId::INT).field("children", children)
//!     .define(&mut pool, node)?;
//! ```
//!
//! # Interning
//!
//! Shapes are interned by type name. Stock constructors (`list`, `map`, ...)
//! derive the name from their arguments, so `pool.list(ShapeId::INT)` returns
//! the same id every time.

mod construct;
mod record;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{PrimitiveKind, ProviderId, Shape, ShapeData, ShapeError, ShapeId, ShapeProvider};

pub use record::RecordBuilder;

/// Instantiates a generic type for concrete arguments.
pub type GenericTemplate =
    Arc<dyn Fn(&mut ShapePool, &[ShapeId]) -> Result<ShapeId, ShapeError> + Send + Sync>;

type GenericKey = (Arc<str>, SmallVec<[ShapeId; 2]>);

enum Slot {
    /// Index reserved for future primitives.
    Vacant,
    /// Id handed out, shape not yet defined.
    Reserved(Arc<str>),
    Defined(Shape),
}

/// Arena-backed shape provider.
pub struct ShapePool {
    id: ProviderId,
    slots: Vec<Slot>,
    by_name: FxHashMap<Arc<str>, ShapeId>,
    templates: FxHashMap<Arc<str>, GenericTemplate>,
    instances: FxHashMap<GenericKey, ShapeId>,
}

impl ShapePool {
    /// Create a pool with the primitive shapes pre-registered.
    pub fn new() -> Self {
        let mut pool = ShapePool {
            id: ProviderId::fresh(),
            slots: Vec::with_capacity(64),
            by_name: FxHashMap::default(),
            templates: FxHashMap::default(),
            instances: FxHashMap::default(),
        };

        for kind in PrimitiveKind::ALL {
            let name: Arc<str> = Arc::from(kind.name());
            pool.by_name
                .insert(Arc::clone(&name), ShapeId::of_primitive(kind));
            pool.slots
                .push(Slot::Defined(Shape::new(name, ShapeData::Primitive(kind))));
        }
        while pool.slots.len() < ShapeId::FIRST_DYNAMIC as usize {
            pool.slots.push(Slot::Vacant);
        }

        pool.register_stock_templates();
        pool
    }

    /// Number of slots, including reserved and vacant ones.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_id(&self) -> ShapeId {
        ShapeId::from_raw(self.slots.len() as u32)
    }

    /// Hand out an id for `name` without defining its shape yet.
    pub fn reserve(&mut self, name: impl Into<Arc<str>>) -> Result<ShapeId, ShapeError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ShapeError::DuplicateName(name));
        }
        let id = self.next_id();
        self.by_name.insert(Arc::clone(&name), id);
        self.slots.push(Slot::Reserved(name));
        tracing::trace!(%id, "reserved shape");
        Ok(id)
    }

    /// Define the shape of a reserved id.
    pub fn define(&mut self, id: ShapeId, data: ShapeData) -> Result<(), ShapeError> {
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(ShapeError::NotReserved { id })?;
        let name = match slot {
            Slot::Reserved(name) => Arc::clone(name),
            Slot::Vacant | Slot::Defined(_) => return Err(ShapeError::NotReserved { id }),
        };
        *slot = Slot::Defined(Shape::new(name, data));
        Ok(())
    }

    /// Reserve and define in one step.
    pub fn insert(
        &mut self,
        name: impl Into<Arc<str>>,
        data: ShapeData,
    ) -> Result<ShapeId, ShapeError> {
        let id = self.reserve(name)?;
        self.define(id, data)?;
        Ok(id)
    }

    /// Return the shape named `name`, creating it with `make` on first use.
    pub fn intern(&mut self, name: &str, make: impl FnOnce(&mut Self) -> ShapeData) -> ShapeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let name: Arc<str> = Arc::from(name);
        let id = self.next_id();
        self.by_name.insert(Arc::clone(&name), id);
        self.slots.push(Slot::Reserved(name));
        let data = make(self);
        if let Some(slot) = self.slots.get_mut(id.index()) {
            if let Slot::Reserved(name) = slot {
                let name = Arc::clone(name);
                *slot = Slot::Defined(Shape::new(name, data));
            }
        }
        id
    }

    /// Whether the id has a defined shape.
    pub fn is_defined(&self, id: ShapeId) -> bool {
        matches!(self.slots.get(id.index()), Some(Slot::Defined(_)))
    }

    /// Name registered for an id, defined or only reserved.
    pub fn name(&self, id: ShapeId) -> Option<&str> {
        match self.slots.get(id.index())? {
            Slot::Reserved(name) => Some(name),
            Slot::Defined(shape) => Some(&shape.name),
            Slot::Vacant => None,
        }
    }

    /// Display name used to derive stock type names (`List<int>`).
    pub(crate) fn display(&self, id: ShapeId) -> String {
        self.name(id)
            .map_or_else(|| id.to_string(), ToString::to_string)
    }

    // === Generics ===

    /// Register a template used by [`ShapePool::instantiate`].
    pub fn register_generic(
        &mut self,
        name: impl Into<Arc<str>>,
        template: impl Fn(&mut ShapePool, &[ShapeId]) -> Result<ShapeId, ShapeError>
            + Send
            + Sync
            + 'static,
    ) {
        self.templates.insert(name.into(), Arc::new(template));
    }

    /// Close a generic over concrete arguments, memoised per argument list.
    pub fn instantiate(&mut self, name: &str, args: &[ShapeId]) -> Result<ShapeId, ShapeError> {
        let key: GenericKey = (Arc::from(name), SmallVec::from_slice(args));
        if let Some(&id) = self.instances.get(&key) {
            return Ok(id);
        }
        let template = self
            .templates
            .get(name)
            .cloned()
            .ok_or_else(|| ShapeError::UnknownTemplate(Arc::from(name)))?;
        let id = template(self, args)?;
        self.instances.insert(key, id);
        Ok(id)
    }

    /// Record that `name<args>` resolves to `id`.
    pub(crate) fn record_instance(&mut self, name: &str, args: &[ShapeId], id: ShapeId) {
        self.instances
            .insert((Arc::from(name), SmallVec::from_slice(args)), id);
    }
}

impl Default for ShapePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeProvider for ShapePool {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn shape(&self, id: ShapeId) -> Option<&Shape> {
        match self.slots.get(id.index())? {
            Slot::Defined(shape) => Some(shape),
            Slot::Reserved(_) | Slot::Vacant => None,
        }
    }

    fn resolve(&self, name: &str) -> Option<ShapeId> {
        self.by_name.get(name).copied()
    }

    fn resolve_generic(&self, name: &str, args: &[ShapeId]) -> Option<ShapeId> {
        let key: GenericKey = (Arc::from(name), SmallVec::from_slice(args));
        self.instances.get(&key).copied()
    }
}

#[cfg(test)]
mod tests;
