//! RM error taxonomy.
//!
//! Mirrors the error-kind enumeration used throughout the RM, TM, and WC:
//! client/semantic errors (safe to surface, transaction may continue),
//! concurrency errors (prepare must fail, transaction must be aborted), and
//! system errors (I/O or invariant violation). `RmError` pairs a kind with
//! the contextual fields callers need to act on it, following the
//! constructor-plus-classification-method shape this workspace uses for its
//! other error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The discriminated error kind returned by RM operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RmErrorKind {
    /// A required argument was missing or malformed.
    InvalidArgument,
    /// `insert` found a visible committed non-tombstone record already at that key.
    KeyExists,
    /// `update`/`delete`/`read` found no visible record at that key.
    KeyNotFound,
    /// The xid is not known to this RM.
    TxnNotFound,
    /// The operation is not legal in the xid's current state (e.g. CRUD after prepare).
    InvalidTxState,
    /// `try_lock` failed because another xid holds the row lock.
    LockConflict,
    /// The committed version of a write-set key no longer matches the recorded start-version.
    VersionConflict,
    /// The committed version of a read-set key changed since it was read.
    ReadWriteConflict,
    /// The backing store or durable log failed to read or write.
    IoError,
    /// A backing-store operation exceeded its deadline.
    Timeout,
    /// An internal invariant was violated (bug or corruption). Fatal to the transaction,
    /// not to the process.
    InternalInvariant,
    /// Catch-all for anything not otherwise classified.
    UnknownError,
}

impl RmErrorKind {
    /// The wire-protocol string for this kind, per the RM error taxonomy.
    pub fn as_str(&self) -> &'static str {
        match self {
            RmErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            RmErrorKind::KeyExists => "KEY_EXISTS",
            RmErrorKind::KeyNotFound => "KEY_NOT_FOUND",
            RmErrorKind::TxnNotFound => "TXN_NOT_FOUND",
            RmErrorKind::InvalidTxState => "INVALID_TX_STATE",
            RmErrorKind::LockConflict => "LOCK_CONFLICT",
            RmErrorKind::VersionConflict => "VERSION_CONFLICT",
            RmErrorKind::ReadWriteConflict => "READ_WRITE_CONFLICT",
            RmErrorKind::IoError => "IO_ERROR",
            RmErrorKind::Timeout => "TIMEOUT",
            RmErrorKind::InternalInvariant => "INTERNAL_INVARIANT",
            RmErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Whether this kind was raised at `prepare` as a concurrency conflict,
    /// meaning the whole transaction must now be aborted by the coordinator.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            RmErrorKind::LockConflict | RmErrorKind::VersionConflict | RmErrorKind::ReadWriteConflict
        )
    }

    /// Whether this kind is a client/semantic error: final for the calling
    /// operation, but leaves the transaction's state untouched.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RmErrorKind::InvalidArgument
                | RmErrorKind::KeyExists
                | RmErrorKind::KeyNotFound
                | RmErrorKind::TxnNotFound
                | RmErrorKind::InvalidTxState
        )
    }

    /// Whether this kind indicates a system-level failure (I/O, timeout, or
    /// a broken invariant) rather than an expected client or conflict outcome.
    pub fn is_system_error(&self) -> bool {
        matches!(
            self,
            RmErrorKind::IoError | RmErrorKind::Timeout | RmErrorKind::InternalInvariant
        )
    }
}

/// An RM error: a kind plus whatever context the caller needs to report or
/// retry intelligently.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct RmError {
    /// The discriminated kind.
    pub kind: RmErrorKind,
    /// Human-readable detail (key, expected/actual version, etc.).
    pub message: String,
}

impl std::fmt::Display for RmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl RmError {
    /// Build an error of the given kind with a message.
    pub fn new(kind: RmErrorKind, message: impl Into<String>) -> Self {
        RmError {
            kind,
            message: message.into(),
        }
    }

    /// `INVALID_ARGUMENT` constructor.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RmErrorKind::InvalidArgument, message)
    }

    /// `KEY_EXISTS` constructor.
    pub fn key_exists(key: &str) -> Self {
        Self::new(RmErrorKind::KeyExists, format!("key {key:?} already exists"))
    }

    /// `KEY_NOT_FOUND` constructor.
    pub fn key_not_found(key: &str) -> Self {
        Self::new(RmErrorKind::KeyNotFound, format!("key {key:?} not found"))
    }

    /// `TXN_NOT_FOUND` constructor.
    pub fn txn_not_found(xid: u64) -> Self {
        Self::new(RmErrorKind::TxnNotFound, format!("xid {xid} not known to this RM"))
    }

    /// `INVALID_TX_STATE` constructor.
    pub fn invalid_tx_state(xid: u64, detail: impl Into<String>) -> Self {
        Self::new(
            RmErrorKind::InvalidTxState,
            format!("xid {xid}: {}", detail.into()),
        )
    }

    /// `LOCK_CONFLICT` constructor.
    pub fn lock_conflict(key: &str, held_by: u64) -> Self {
        Self::new(
            RmErrorKind::LockConflict,
            format!("key {key:?} is locked by xid {held_by}"),
        )
    }

    /// `VERSION_CONFLICT` constructor.
    pub fn version_conflict(key: &str, expected: u64, actual: u64) -> Self {
        Self::new(
            RmErrorKind::VersionConflict,
            format!("key {key:?} expected version {expected}, committed version is {actual}"),
        )
    }

    /// `READ_WRITE_CONFLICT` constructor.
    pub fn read_write_conflict(key: &str, read_version: u64, actual: u64) -> Self {
        Self::new(
            RmErrorKind::ReadWriteConflict,
            format!("key {key:?} read at version {read_version}, now {actual}"),
        )
    }

    /// `IO_ERROR` constructor.
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::new(RmErrorKind::IoError, message)
    }

    /// `INTERNAL_INVARIANT` constructor.
    pub fn internal_invariant(message: impl Into<String>) -> Self {
        Self::new(RmErrorKind::InternalInvariant, message)
    }

    /// Whether retrying the surrounding transaction from scratch might
    /// succeed (true for concurrency conflicts and I/O hiccups).
    pub fn is_retryable(&self) -> bool {
        self.kind.is_concurrency_conflict() || matches!(self.kind, RmErrorKind::IoError | RmErrorKind::Timeout)
    }
}

impl From<std::io::Error> for RmError {
    fn from(e: std::io::Error) -> Self {
        RmError::io_error(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_taxonomy() {
        assert_eq!(RmErrorKind::KeyExists.as_str(), "KEY_EXISTS");
        assert_eq!(RmErrorKind::VersionConflict.as_str(), "VERSION_CONFLICT");
        assert_eq!(RmErrorKind::UnknownError.as_str(), "UNKNOWN_ERROR");
    }

    #[test]
    fn concurrency_kinds_are_classified() {
        assert!(RmErrorKind::LockConflict.is_concurrency_conflict());
        assert!(RmErrorKind::VersionConflict.is_concurrency_conflict());
        assert!(RmErrorKind::ReadWriteConflict.is_concurrency_conflict());
        assert!(!RmErrorKind::KeyNotFound.is_concurrency_conflict());
    }

    #[test]
    fn client_errors_do_not_overlap_concurrency_errors() {
        for kind in [
            RmErrorKind::InvalidArgument,
            RmErrorKind::KeyExists,
            RmErrorKind::KeyNotFound,
            RmErrorKind::TxnNotFound,
            RmErrorKind::InvalidTxState,
        ] {
            assert!(kind.is_client_error());
            assert!(!kind.is_concurrency_conflict());
        }
    }

    #[test]
    fn version_conflict_message_contains_both_versions() {
        let err = RmError::version_conflict("1005", 7, 9);
        assert_eq!(err.kind, RmErrorKind::VersionConflict);
        assert!(err.message.contains('7'));
        assert!(err.message.contains('9'));
    }

    #[test]
    fn retryable_covers_conflicts_and_io() {
        assert!(RmError::new(RmErrorKind::LockConflict, "x").is_retryable());
        assert!(RmError::io_error("disk full").is_retryable());
        assert!(!RmError::key_not_found("1001").is_retryable());
    }
}
