use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// A panic while holding the lock leaves the LRU structurally intact, so the
/// inner guard is reused.
fn recover<G>(poisoned: PoisonError<G>, op: &'static str, mode: &'static str) -> G {
    warn!(cache = "page", op, mode, "page cache lock poisoned, recovering");
    poisoned.into_inner()
}

pub(crate) fn rw_read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read()
        .unwrap_or_else(|poisoned| recover(poisoned, op, "read"))
}

pub(crate) fn rw_write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    lock.write()
        .unwrap_or_else(|poisoned| recover(poisoned, op, "write"))
}
