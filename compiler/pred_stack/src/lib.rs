//! Stack growth for recursive walks over expression graphs.
//!
//! Rule expressions can nest arbitrarily deep (long `and` chains produced by
//! rule generators are common), and canonical-form rendering and merging
//! recurse on node depth. [`with_stack_headroom`] grows the
//! stack on demand.
//!
//! On `wasm32` the call is a plain passthrough.

/// Remaining stack below which we allocate a new segment (128KB).
const HEADROOM: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT: usize = 2 * 1024 * 1024;

/// Run `f`, first growing the stack if fewer than `HEADROOM` bytes remain.
///
/// Wrap the body of any function that recurses once per expression depth:
///
/// ```text
/// fn render(&self, id: NodeId, out: &mut String) {
///     with_stack_headroom(|| {
///         for child in self.children(id) {
///             self.render(*child, out);
///         }
///     });
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn with_stack_headroom<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(HEADROOM, SEGMENT, f)
}

/// Passthrough on WASM, which manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn with_stack_headroom<R>(f: impl FnOnce() -> R) -> R {
    f()
}
