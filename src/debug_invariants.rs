//! Debug-only invariant checking for the free list and chunk state
//! machine: compiled in for `cfg(test)` builds, or whenever the
//! `check_contracts` feature is turned on.
//!
//! None of this runs in a release build without `check_contracts`: it
//! exists to catch invariant violations (I2, I3, I5) during
//! development and testing, not to be part of the hot path.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::chunk::ChunkState;

lazy_static::lazy_static! {
    static ref KNOWN_STATE: Mutex<HashMap<usize, ChunkState>> = Default::default();
}

/// Records the state of a freshly carved chunk (either a whole new
/// page, or a split-off remainder).
pub fn observe_birth(addr: usize, state: ChunkState) {
    let mut map = KNOWN_STATE.lock().unwrap();
    map.insert(addr, state);
}

/// Validates and records a `from -> to` state transition (spec
/// invariant I3: only `Free -> Busy` on allocate and `Busy -> Free` on
/// release are legal).
pub fn observe_transition(
    addr: usize,
    from: ChunkState,
    to: ChunkState,
) -> Result<(), &'static str> {
    let mut map = KNOWN_STATE.lock().unwrap();

    match map.get(&addr) {
        Some(&current) if current == from => {
            map.insert(addr, to);
            Ok(())
        }
        Some(_) => Err("illegal chunk state transition"),
        None => Err("transition on an untracked chunk"),
    }
}

/// Spec invariant I5: the free list contains no cycles and each record
/// appears at most once. Called with every address visited while
/// walking the free list; fails as soon as an address repeats.
pub fn check_walk_has_no_duplicates(visited: &[usize]) -> Result<(), &'static str> {
    let mut seen = HashSet::with_capacity(visited.len());
    for &addr in visited {
        if !seen.insert(addr) {
            return Err("cycle or duplicate entry in free list");
        }
    }
    Ok(())
}

/// Test-only: clears all tracked state between independent test cases
/// that reuse the same process-wide map.
#[cfg(test)]
pub fn reset_for_test() {
    KNOWN_STATE.lock().unwrap().clear();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transition_must_match_recorded_state() {
        reset_for_test();
        observe_birth(0x1000, ChunkState::Free);

        assert!(observe_transition(0x1000, ChunkState::Free, ChunkState::Busy).is_ok());
        // A second Free->Busy transition is a double-allocation of a
        // chunk the map thinks is already Busy.
        assert!(observe_transition(0x1000, ChunkState::Free, ChunkState::Busy).is_err());

        assert!(observe_transition(0x1000, ChunkState::Busy, ChunkState::Free).is_ok());
        // Double free: already Free.
        assert!(observe_transition(0x1000, ChunkState::Busy, ChunkState::Free).is_err());
    }

    #[test]
    fn duplicate_walk_entries_are_rejected() {
        assert!(check_walk_has_no_duplicates(&[0x10, 0x20, 0x30]).is_ok());
        assert!(check_walk_has_no_duplicates(&[0x10, 0x20, 0x10]).is_err());
    }
}
