//! Prepare-time optimistic-concurrency validation.
//!
//! Runs two checks against the *current* committed state of every key this
//! transaction touched, in the order `prepare` performs them once locks are
//! held (see `resv_rm::prepare`):
//!
//! 1. **Write-set validation.** A write with no recorded start-version is a
//!    pure insert: it must find no visible committed record (absent or
//!    tombstoned), else `KEY_EXISTS`. A write with a recorded start-version
//!    is an update or delete: it must find a non-deleted committed record
//!    at exactly that version, else `VERSION_CONFLICT`; a missing or
//!    tombstoned record fails `KEY_NOT_FOUND`, unless the shadow op is
//!    itself a delete, which is treated as an already-satisfied no-op.
//! 2. **Read-set revalidation.** Every key this transaction read — even if
//!    never written — must still show the version it had at read time,
//!    else `READ_WRITE_CONFLICT`.
//!
//! The first conflict found fails the whole `prepare` call; the caller
//! aborts the transaction.

use crate::shadow::TxnShadow;
use resv_core::{RmError, Version};

/// The currently visible committed state of a key, as seen by `prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommittedStatus {
    /// No committed record at this key.
    Absent,
    /// A committed record exists but is tombstoned.
    Tombstone,
    /// A non-deleted committed record exists at this version.
    Present(Version),
}

/// Validate a transaction's shadow against current committed state.
/// `lookup` must return the committed status of any key it is asked about,
/// or the backing-store error that kept it from finding out — which this
/// function propagates as-is rather than treating as "key absent".
pub fn validate_prepare(
    shadow: &TxnShadow,
    lookup: impl Fn(&str) -> Result<CommittedStatus, RmError>,
) -> Result<(), RmError> {
    for (key, write) in &shadow.writes {
        let is_delete = write.is_none();
        let start_version = shadow.start_versions.get(key).copied().flatten();
        match start_version {
            None => match lookup(key)? {
                CommittedStatus::Absent | CommittedStatus::Tombstone => {}
                CommittedStatus::Present(_) => return Err(RmError::key_exists(key)),
            },
            Some(expected) => match lookup(key)? {
                CommittedStatus::Absent | CommittedStatus::Tombstone => {
                    if !is_delete {
                        return Err(RmError::key_not_found(key));
                    }
                }
                CommittedStatus::Present(actual) if actual == expected => {}
                CommittedStatus::Present(actual) => {
                    return Err(RmError::version_conflict(key, expected, actual))
                }
            },
        }
    }

    for (key, &read_version) in &shadow.reads {
        if shadow.writes.contains_key(key) {
            continue;
        }
        match lookup(key)? {
            CommittedStatus::Present(actual) if actual == read_version => {}
            CommittedStatus::Present(actual) => {
                return Err(RmError::read_write_conflict(key, read_version, actual))
            }
            CommittedStatus::Absent | CommittedStatus::Tombstone => {
                return Err(RmError::read_write_conflict(key, read_version, 0))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::ShadowSet;
    use resv_core::{FieldValue, Record, RmErrorKind};
    use std::collections::BTreeMap;

    fn rec() -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("numAvail".to_string(), FieldValue::Int(1));
        Record::new(fields)
    }

    #[test]
    fn passes_when_nothing_changed() {
        let set = ShadowSet::new();
        set.record_write(1, "0001", Some(rec()), Some(3));
        let shadow = set.snapshot(1);
        assert!(validate_prepare(&shadow, |_| Ok(CommittedStatus::Present(3))).is_ok());
    }

    #[test]
    fn update_conflicts_when_committed_version_moved() {
        let set = ShadowSet::new();
        set.record_write(1, "0001", Some(rec()), Some(3));
        let shadow = set.snapshot(1);
        let err = validate_prepare(&shadow, |_| Ok(CommittedStatus::Present(4))).unwrap_err();
        assert_eq!(err.kind, RmErrorKind::VersionConflict);
    }

    #[test]
    fn insert_conflicts_with_a_concurrent_insert() {
        let set = ShadowSet::new();
        set.record_write(1, "0001", Some(rec()), None);
        let shadow = set.snapshot(1);
        let err = validate_prepare(&shadow, |_| Ok(CommittedStatus::Present(7))).unwrap_err();
        assert_eq!(err.kind, RmErrorKind::KeyExists);
    }

    #[test]
    fn insert_passes_over_a_tombstone() {
        let set = ShadowSet::new();
        set.record_write(1, "0001", Some(rec()), None);
        let shadow = set.snapshot(1);
        assert!(validate_prepare(&shadow, |_| Ok(CommittedStatus::Tombstone)).is_ok());
    }

    #[test]
    fn delete_of_an_already_absent_key_is_a_no_op() {
        let set = ShadowSet::new();
        set.record_write(1, "0001", None, Some(5));
        let shadow = set.snapshot(1);
        assert!(validate_prepare(&shadow, |_| Ok(CommittedStatus::Absent)).is_ok());
    }

    #[test]
    fn update_of_an_absent_key_fails_key_not_found() {
        let set = ShadowSet::new();
        set.record_write(1, "0001", Some(rec()), Some(5));
        let shadow = set.snapshot(1);
        let err = validate_prepare(&shadow, |_| Ok(CommittedStatus::Absent)).unwrap_err();
        assert_eq!(err.kind, RmErrorKind::KeyNotFound);
    }

    #[test]
    fn read_only_key_conflicts_if_it_changed_since_read() {
        let set = ShadowSet::new();
        set.record_read(1, "0002", 5);
        let shadow = set.snapshot(1);
        let err = validate_prepare(&shadow, |_| Ok(CommittedStatus::Present(6))).unwrap_err();
        assert_eq!(err.kind, RmErrorKind::ReadWriteConflict);
    }

    #[test]
    fn written_key_is_not_double_checked_as_a_read() {
        let set = ShadowSet::new();
        set.record_read(1, "0001", 3);
        set.record_write(1, "0001", Some(rec()), Some(3));
        let shadow = set.snapshot(1);
        assert!(validate_prepare(&shadow, |_| Ok(CommittedStatus::Present(3))).is_ok());
    }

    #[test]
    fn a_lookup_failure_propagates_instead_of_reading_as_absent() {
        let set = ShadowSet::new();
        set.record_write(1, "0001", Some(rec()), Some(3));
        let shadow = set.snapshot(1);
        let err = validate_prepare(&shadow, |key| Err(RmError::io_error(format!("disk fault reading {key}"))))
            .unwrap_err();
        assert_eq!(err.kind, RmErrorKind::IoError);
    }
}
