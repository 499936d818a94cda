//! Builder configuration.

/// What bulk dictionary construction does when a key repeats.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DuplicateKeyPolicy {
    /// Fail with the offending key.
    #[default]
    Reject,
    /// Keep whatever the collection kept (usually the last entry).
    LastWins,
}

/// Options shared by every builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenOptions {
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Upper bound on collection sizes produced by value generators.
    pub max_collection_len: usize,
    /// Nesting depth after which value generators stop expanding
    /// collections and optionals.
    pub max_depth: usize,
}

impl Default for GenOptions {
    fn default() -> Self {
        GenOptions {
            duplicate_keys: DuplicateKeyPolicy::Reject,
            max_collection_len: 8,
            max_depth: 6,
        }
    }
}

impl GenOptions {
    #[must_use]
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    #[must_use]
    pub fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
