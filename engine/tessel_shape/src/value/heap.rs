//! Shared, copy-on-write storage for heap-backed values.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Reference-counted storage behind `Value`'s heap variants.
///
/// The constructor is private to the `value` module: heap values are created
/// through the factory methods on [`Value`](super::Value), which keeps every
/// allocation going through one place.
pub struct Heap<T: ?Sized>(Arc<T>);

impl<T: ?Sized> Heap<T> {
    #[inline]
    pub(super) fn from_arc(inner: Arc<T>) -> Self {
        Heap(inner)
    }

    /// Whether two handles share the same allocation.
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T> Heap<T> {
    #[inline]
    pub(super) fn new(value: T) -> Self {
        Heap(Arc::new(value))
    }
}

impl<T: Clone> Heap<T> {
    /// Mutable access, cloning the contents first if they are shared.
    #[inline]
    pub fn make_mut(this: &mut Self) -> &mut T {
        Arc::make_mut(&mut this.0)
    }

    /// Take the contents, cloning only if other handles remain.
    #[inline]
    pub fn into_inner(this: Self) -> T {
        Arc::try_unwrap(this.0).unwrap_or_else(|shared| (*shared).clone())
    }
}

impl<T: ?Sized> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        Heap(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Heap<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (*self.0).fmt(f)
    }
}
