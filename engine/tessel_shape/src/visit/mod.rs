//! Double-dispatch over shape kinds.
//!
//! A generator implements [`ShapeVisitor`] with one method per kind. The
//! engine never matches on `ShapeData` itself; it wraps a shape in a
//! [`ShapeNode`] and lets [`ShapeNode::accept`] pick the method.
//!
//! # State
//!
//! Visitors take `&self` and a separate `&mut S`. The visitor is shared
//! configuration (a builder); the state is the traversal (a generation
//! context) and is the only thing that mutates during a walk.

use std::ops::Deref;

use rustc_hash::FxHashSet;

use crate::{
    DictionaryShape, EnumShape, EnumerableShape, FunctionShape, Kind, ObjectShape, OptionalShape,
    PrimitiveKind, Shape, ShapeData, ShapeId, ShapeProvider, SurrogateShape, UnionShape,
};

/// A shape together with the id it was reached through.
#[derive(Copy, Clone, Debug)]
pub struct ShapeNode<'a> {
    id: ShapeId,
    shape: &'a Shape,
}

impl<'a> ShapeNode<'a> {
    pub fn new(id: ShapeId, shape: &'a Shape) -> Self {
        ShapeNode { id, shape }
    }

    #[inline]
    pub fn id(&self) -> ShapeId {
        self.id
    }

    #[inline]
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    #[inline]
    pub fn name(&self) -> &'a str {
        &self.shape.name
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.shape.kind()
    }

    /// Dispatch to the visitor method for this shape's kind.
    pub fn accept<S, V>(self, visitor: &V, state: &mut S) -> V::Output
    where
        S: ?Sized,
        V: ShapeVisitor<S> + ?Sized,
    {
        let id = self.id;
        let name: &'a str = &self.shape.name;
        match &self.shape.data {
            ShapeData::Primitive(p) => visitor.visit_primitive(Node::new(id, name, p), state),
            ShapeData::Object(o) => visitor.visit_object(Node::new(id, name, o), state),
            ShapeData::Enum(e) => visitor.visit_enum(Node::new(id, name, e), state),
            ShapeData::Optional(o) => visitor.visit_optional(Node::new(id, name, o), state),
            ShapeData::Enumerable(e) => visitor.visit_enumerable(Node::new(id, name, e), state),
            ShapeData::Dictionary(d) => visitor.visit_dictionary(Node::new(id, name, d), state),
            ShapeData::Surrogate(s) => visitor.visit_surrogate(Node::new(id, name, s), state),
            ShapeData::Union(u) => visitor.visit_union(Node::new(id, name, u), state),
            ShapeData::Function(f) => visitor.visit_function(Node::new(id, name, f), state),
        }
    }
}

/// Kind-specific view handed to a visitor method. Derefs to the kind's data.
pub struct Node<'a, T> {
    pub id: ShapeId,
    pub name: &'a str,
    data: &'a T,
}

impl<'a, T> Node<'a, T> {
    fn new(id: ShapeId, name: &'a str, data: &'a T) -> Self {
        Node { id, name, data }
    }

    /// The kind data with the node's full lifetime.
    #[inline]
    pub fn data(&self) -> &'a T {
        self.data
    }
}

impl<T> Clone for Node<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Node<'_, T> {}

impl<T> Deref for Node<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.data
    }
}

/// One method per shape kind.
///
/// `invoke` is the entry point for a visit. Generators that wrap every visit
/// (converter overrides, depth accounting) override `invoke` and delegate to
/// `node.accept(self, state)` for the default dispatch.
pub trait ShapeVisitor<S: ?Sized> {
    type Output;

    fn invoke(&self, node: ShapeNode<'_>, state: &mut S) -> Self::Output {
        node.accept(self, state)
    }

    fn visit_primitive(&self, node: Node<'_, PrimitiveKind>, state: &mut S) -> Self::Output;
    fn visit_object(&self, node: Node<'_, ObjectShape>, state: &mut S) -> Self::Output;
    fn visit_enum(&self, node: Node<'_, EnumShape>, state: &mut S) -> Self::Output;
    fn visit_optional(&self, node: Node<'_, OptionalShape>, state: &mut S) -> Self::Output;
    fn visit_enumerable(&self, node: Node<'_, EnumerableShape>, state: &mut S) -> Self::Output;
    fn visit_dictionary(&self, node: Node<'_, DictionaryShape>, state: &mut S) -> Self::Output;
    fn visit_surrogate(&self, node: Node<'_, SurrogateShape>, state: &mut S) -> Self::Output;
    fn visit_union(&self, node: Node<'_, UnionShape>, state: &mut S) -> Self::Output;
    fn visit_function(&self, node: Node<'_, FunctionShape>, state: &mut S) -> Self::Output;
}

/// Which child edges [`reachable`] follows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edges {
    /// Every child shape.
    All,
    /// Only children a value cannot omit ([`Shape::required_children`]).
    Required,
}

/// Every shape reachable from `root`, in depth-first pre-order.
///
/// Each shape appears once even when the graph is cyclic. Ids the provider
/// does not know are listed but not expanded.
pub fn reachable(provider: &dyn ShapeProvider, root: ShapeId, edges: Edges) -> Vec<ShapeId> {
    let mut seen = FxHashSet::default();
    let mut order = Vec::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        order.push(id);
        if let Some(shape) = provider.shape(id) {
            let children = match edges {
                Edges::All => shape.children(),
                Edges::Required => shape.required_children(),
            };
            // Reverse so the first child is expanded first.
            stack.extend(children.into_iter().rev());
        }
    }

    order
}

#[cfg(test)]
mod tests;
