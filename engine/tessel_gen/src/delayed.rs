//! Forward references for artifacts still under construction.
//!
//! When the context starts building a type it allocates a slot and hands out
//! [`Delayed`] handles to it. A build that reaches the same type again gets a
//! handle instead of recursing, and the builder wraps that handle in a
//! forwarding artifact. Once the outer build finishes the slot is resolved,
//! and every forwarding artifact observes the same final value.
//!
//! # Slot states
//!
//! ```text
//! Pending ──resolve──▶ Resolved(A)
//!    │
//!    └──abandon──▶ Abandoned      (the build failed)
//! ```
//!
//! Reading a `Pending` or `Abandoned` slot is an engine bug, not a data
//! error, and panics. The context never lets an artifact holding such a
//! handle escape: on failure every artifact cached since the build began is
//! evicted along with the slot.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

enum Slot<A> {
    Pending,
    Resolved(A),
    Abandoned,
}

type Table<A> = Arc<RwLock<Vec<Slot<A>>>>;

/// Slot table owned by one generation context.
pub struct DelayedSlots<A> {
    table: Table<A>,
}

impl<A: Clone> DelayedSlots<A> {
    pub fn new() -> Self {
        DelayedSlots {
            table: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Allocate a pending slot.
    pub fn allocate(&self) -> Delayed<A> {
        let mut table = self.table.write();
        let index = table.len();
        table.push(Slot::Pending);
        Delayed {
            table: Arc::clone(&self.table),
            index,
            memo: Arc::new(OnceLock::new()),
        }
    }

    /// Install the final artifact. Resolving twice is an engine bug.
    pub fn resolve(&self, delayed: &Delayed<A>, artifact: A) {
        let mut table = self.table.write();
        match table.get_mut(delayed.index) {
            Some(slot) if matches!(slot, Slot::Pending) => *slot = Slot::Resolved(artifact),
            _ => panic!("delayed slot {} resolved twice or not owned", delayed.index),
        }
    }

    /// Mark a slot as belonging to a failed build.
    pub fn abandon(&self, delayed: &Delayed<A>) {
        if let Some(slot) = self.table.write().get_mut(delayed.index) {
            *slot = Slot::Abandoned;
        }
    }

    /// Slots neither resolved nor abandoned.
    pub fn pending(&self) -> usize {
        self.table
            .read()
            .iter()
            .filter(|slot| matches!(slot, Slot::Pending))
            .count()
    }
}

impl<A: Clone> Default for DelayedSlots<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one slot. Clones share the resolved value once it is read.
pub struct Delayed<A> {
    table: Table<A>,
    index: usize,
    memo: Arc<OnceLock<A>>,
}

impl<A: Clone> Delayed<A> {
    /// The resolved artifact.
    ///
    /// # Panics
    ///
    /// If the slot is still pending or its build failed.
    pub fn get(&self) -> &A {
        self.memo.get_or_init(|| match self.table.read().get(self.index) {
            Some(Slot::Resolved(artifact)) => artifact.clone(),
            Some(Slot::Pending) => panic!(
                "delayed artifact {} invoked before its build finished",
                self.index
            ),
            Some(Slot::Abandoned) => {
                panic!("delayed artifact {} belongs to a failed build", self.index)
            }
            None => panic!("delayed artifact {} has no slot", self.index),
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.memo.get().is_some()
            || matches!(self.table.read().get(self.index), Some(Slot::Resolved(_)))
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<A> Clone for Delayed<A> {
    fn clone(&self) -> Self {
        Delayed {
            table: Arc::clone(&self.table),
            index: self.index,
            memo: Arc::clone(&self.memo),
        }
    }
}

impl<A> fmt::Debug for Delayed<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Delayed#{}", self.index)
    }
}
