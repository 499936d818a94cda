//! Stack growth for recursive artifact construction and invocation.
//!
//! Two places recurse without a static bound:
//!
//! - the generation context, which descends one frame per shape edge while
//!   building artifacts for a type graph, and
//! - the artifacts themselves, which call into child artifacts once per level
//!   of the value being processed (a linked list of 100k nodes is 100k frames).
//!
//! Both wrap their recursive step in [`ensure_sufficient_stack`]. On native
//! targets this grows the stack on demand through `stacker`; on WASM it is a
//! plain call.

/// Grow when less than this much stack remains (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first growing the stack if the remaining space is below the red zone.
///
/// ```text
/// fn clone_node(&self, value: &Value) -> GenResult<Value> {
///     ensure_sufficient_stack(|| (self.children)(value))
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// WASM manages its own stack; call through.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests;
