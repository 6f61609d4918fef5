//! Row-level lock table.
//!
//! Locks are acquired only at `prepare`, never held across the whole
//! transaction lifetime, and acquisition always uses `try_lock` (never a
//! blocking wait) — callers are expected to sort keys before acquiring a
//! batch so two transactions racing on the same key set never livelock each
//! other by acquiring in opposite orders.

use parking_lot::Mutex;
use resv_core::Xid;
use rustc_hash::FxHashMap;

/// Maps a normalized key to the xid currently holding its row lock.
#[derive(Debug, Default)]
pub struct RowLockManager {
    locks: Mutex<FxHashMap<String, Xid>>,
}

impl RowLockManager {
    /// An empty lock table.
    pub fn new() -> Self {
        RowLockManager {
            locks: Mutex::new(FxHashMap::default()),
        }
    }

    /// Attempt to acquire the lock on `key` for `xid`. Idempotent: if `xid`
    /// already holds the lock, this returns `true` without changing state.
    /// Returns `false` if a different xid holds it.
    pub fn try_lock(&self, key: &str, xid: Xid) -> bool {
        let mut locks = self.locks.lock();
        match locks.get(key) {
            Some(holder) if *holder == xid => true,
            Some(_) => false,
            None => {
                locks.insert(key.to_string(), xid);
                true
            }
        }
    }

    /// Which xid, if any, currently holds the lock on `key`.
    pub fn holder_of(&self, key: &str) -> Option<Xid> {
        self.locks.lock().get(key).copied()
    }

    /// Release every lock held by `xid`. Called once the transaction reaches
    /// a terminal state (committed or aborted), regardless of outcome.
    pub fn unlock_all(&self, xid: Xid) {
        let mut locks = self.locks.lock();
        locks.retain(|_, holder| *holder != xid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_lock_is_idempotent_for_the_same_xid() {
        let mgr = RowLockManager::new();
        assert!(mgr.try_lock("0001", 1));
        assert!(mgr.try_lock("0001", 1));
    }

    #[test]
    fn try_lock_fails_for_a_different_xid() {
        let mgr = RowLockManager::new();
        assert!(mgr.try_lock("0001", 1));
        assert!(!mgr.try_lock("0001", 2));
    }

    #[test]
    fn unlock_all_releases_only_that_xids_locks() {
        let mgr = RowLockManager::new();
        mgr.try_lock("0001", 1);
        mgr.try_lock("0002", 2);
        mgr.unlock_all(1);
        assert_eq!(mgr.holder_of("0001"), None);
        assert_eq!(mgr.holder_of("0002"), Some(2));
    }

    #[test]
    fn lock_is_available_again_after_unlock() {
        let mgr = RowLockManager::new();
        mgr.try_lock("0001", 1);
        mgr.unlock_all(1);
        assert!(mgr.try_lock("0001", 2));
    }
}
