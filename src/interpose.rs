//! Symbol interposition shim: exports `malloc`/`free`/`calloc`/
//! `realloc` under their libc names so this allocator can be loaded
//! ahead of the system allocator (e.g. via `LD_PRELOAD`).
//!
//! Gated behind the `interpose` feature since linking these symbols
//! into a process that also links the system's own libc allocator
//! definitions is a deliberate, whole-process decision, not something
//! to do by default when this crate is used as an ordinary Rust
//! dependency.
use std::os::raw::c_void;

use crate::heap;

/// # Safety
///
/// Same contract as libc's `malloc`: the returned pointer, if
/// non-null, must eventually be passed to `free` (or `realloc`) from
/// this same allocator, exactly once.
#[no_mangle]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
    heap::allocate(size)
}

/// # Safety
///
/// Same contract as libc's `free`: `ptr` must be null, or a pointer
/// previously returned by `malloc`/`calloc`/`realloc` from this
/// allocator that has not already been freed.
#[no_mangle]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    heap::release(ptr)
}

/// # Safety
///
/// Same contract as libc's `calloc`.
#[no_mangle]
pub unsafe extern "C" fn calloc(nmemb: usize, size: usize) -> *mut c_void {
    heap::zero_allocate(nmemb, size)
}

/// # Safety
///
/// Same contract as libc's `realloc`.
#[no_mangle]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    heap::resize(ptr, size)
}
