//! Stack growth for recursive walks.
//!
//! Linearizing a deep chain of parent traits and walking long ancestor
//! chains both recurse once per level. Wrapping each level in
//! [`ensure_sufficient_stack`] keeps pathological hierarchies from
//! overflowing the thread stack.
//!
//! On native targets the `stacker` crate grows the stack on demand; on
//! WASM the closure runs directly.

/// Grow when less than this much stack remains (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if it is close to exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
