//! The page provider: reserves fresh anonymous, read-write,
//! process-private memory regions directly from the operating system.
//!
//! Pages are never returned to the OS during the process lifetime
//! (spec non-goal); this module therefore only ever grows the
//! process's mappings.
use std::ffi::c_void;
use std::ptr::NonNull;

use crate::audit;

/// Fixed chunk granularity the allocator carves chunks out of. Shrunk
/// under `test_only_small_constants` so tests can exhaust a page, force
/// splits, and trigger new-page acquisition without huge allocations.
pub const PAGE_SIZE: usize = if cfg!(feature = "test_only_small_constants") {
    256
} else {
    4096
};

lazy_static::lazy_static! {
    static ref SYSTEM_PAGE_SIZE: usize = system_page_size();
}

fn system_page_size() -> usize {
    let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

    if ret <= 0 {
        panic!("unable to determine system page size");
    }

    ret as usize
}

/// Returns the OS page size, mostly so callers can assert our fixed
/// `PAGE_SIZE` is an exact multiple of it.
#[inline]
pub fn system_page_granularity() -> usize {
    *SYSTEM_PAGE_SIZE
}

/// Reserves one page-sized, zero-initialized, read+write,
/// process-private anonymous region.
///
/// On OS failure, logs an `Error` audit event and returns the raw
/// `errno`.
pub fn acquire_page() -> Result<NonNull<c_void>, i32> {
    // Under `test_only_small_constants`, PAGE_SIZE is deliberately
    // smaller than the OS page granularity to make splits and
    // new-page acquisition easy to exercise; mmap still hands back (at
    // least) a full OS page either way.
    if !cfg!(feature = "test_only_small_constants") {
        debug_assert_eq!(PAGE_SIZE % system_page_granularity(), 0);
    }

    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            PAGE_SIZE,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        log::warn!("mmap failed while acquiring a page: errno={}", errno);
        audit::log_error("allocate_page", PAGE_SIZE, std::ptr::null());
        return Err(errno);
    }

    // MAP_ANONYMOUS guarantees a zero-filled mapping; no need to
    // memset here.
    Ok(NonNull::new(ptr).expect("mmap returned a non-MAP_FAILED null pointer"))
}

/// Fills `buf` with OS-supplied entropy, for drawing a per-process
/// canary value (spec §9's hardening suggestion). Returns `false` on
/// platforms or failures where entropy isn't available; the caller
/// falls back to the fixed canary literal in that case.
pub fn fill_random(buf: &mut [u8]) -> bool {
    #[cfg(target_os = "linux")]
    {
        let ret = unsafe { libc::getrandom(buf.as_mut_ptr() as *mut c_void, buf.len(), 0) };
        ret >= 0 && ret as usize == buf.len()
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = buf;
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn page_size_is_sane() {
        assert_ne!(system_page_granularity(), 0);
        if !cfg!(feature = "test_only_small_constants") {
            assert_eq!(PAGE_SIZE % system_page_granularity(), 0);
        }
    }

    #[test]
    fn acquire_page_is_zero_filled_and_writable() {
        let page = acquire_page().expect("mmap should succeed");
        let bytes = unsafe { std::slice::from_raw_parts(page.as_ptr() as *const u8, PAGE_SIZE) };

        assert!(bytes.iter().all(|&b| b == 0));

        unsafe {
            std::ptr::write_bytes(page.as_ptr() as *mut u8, 0x42, PAGE_SIZE);
        }
    }

    #[test]
    fn fill_random_does_not_panic() {
        let mut buf = [0u8; 4];
        let _ = fill_random(&mut buf);
    }
}
