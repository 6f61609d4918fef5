//! WC-level errors.
//!
//! A narrower vocabulary than `resv_core::RmError`: the WC only ever reports
//! outcomes a business client needs to act on, following the
//! constructor-plus-classification shape used throughout this workspace.

use resv_core::{RmError, RmErrorKind};
use resv_tm::TmError;
use thiserror::Error;

/// A failure at the business-orchestration layer.
#[derive(Debug, Clone, Error)]
pub enum WcError {
    /// The TM could not be reached or returned a coordinator-level failure.
    #[error("transaction manager communication failed: {0}")]
    TmCommunication(String),
    /// An RM endpoint could not be reached or returned a non-taxonomy failure.
    #[error("resource manager {rm_name} communication failed: {message}")]
    RmCommunication {
        /// Which RM endpoint failed.
        rm_name: String,
        /// Detail from the underlying failure.
        message: String,
    },
    /// The xid named in the request has no active transaction.
    #[error("transaction not found: {0}")]
    TransactionNotFound(u64),
    /// The named resource does not exist at the RM.
    #[error("{resource_type} not found: {resource_key}")]
    ResourceNotFound {
        /// e.g. "flight", "hotel", "car".
        resource_type: String,
        /// The key that was looked up.
        resource_key: String,
    },
    /// The resource exists but the requested operation conflicts with its
    /// current state (insufficient inventory, concurrent writer, etc.).
    #[error("{resource_type} {resource_key}: {message}")]
    ResourceConflict {
        /// e.g. "flight", "hotel", "car".
        resource_type: String,
        /// The key in conflict.
        resource_key: String,
        /// Detail message.
        message: String,
    },
    /// The reservation failed for a reason not covered by a more specific
    /// variant above.
    #[error("reservation failed: {0}")]
    Reservation(String),
    /// Commit did not fully drain within its reporting window; the decision
    /// is durable but phase 2 is still in flight.
    #[error("transaction {0} is in doubt, query status to resolve")]
    InDoubt(u64),
    /// Abort itself failed (distinct from abort-during-cleanup, which is
    /// logged and swallowed rather than surfaced as this variant).
    #[error("failed to abort transaction {0}: {1}")]
    Abort(u64, String),
    /// The request itself was malformed.
    #[error("validation error: {0}")]
    Validation(String),
}

impl WcError {
    /// The HTTP status code this error would be reported under, per the
    /// RM/TM/WC error taxonomy's propagation policy.
    pub fn status_code(&self) -> u16 {
        match self {
            WcError::TmCommunication(_) => 503,
            WcError::RmCommunication { .. } => 503,
            WcError::TransactionNotFound(_) => 404,
            WcError::ResourceNotFound { .. } => 404,
            WcError::ResourceConflict { .. } => 409,
            WcError::Reservation(_) => 400,
            WcError::InDoubt(_) => 200,
            WcError::Abort(..) => 500,
            WcError::Validation(_) => 400,
        }
    }

    /// Convert an RM-level error observed mid-orchestration, tagging it with
    /// which resource, endpoint, and xid it came from.
    pub fn from_rm_error(rm_name: &str, resource_key: &str, xid: u64, err: RmError) -> Self {
        match err.kind {
            RmErrorKind::KeyNotFound => WcError::ResourceNotFound {
                resource_type: rm_name.to_string(),
                resource_key: resource_key.to_string(),
            },
            RmErrorKind::KeyExists
            | RmErrorKind::LockConflict
            | RmErrorKind::VersionConflict
            | RmErrorKind::ReadWriteConflict => WcError::ResourceConflict {
                resource_type: rm_name.to_string(),
                resource_key: resource_key.to_string(),
                message: err.message,
            },
            RmErrorKind::TxnNotFound | RmErrorKind::InvalidTxState => WcError::TransactionNotFound(xid),
            RmErrorKind::InvalidArgument => WcError::Validation(err.message),
            RmErrorKind::IoError | RmErrorKind::Timeout | RmErrorKind::InternalInvariant | RmErrorKind::UnknownError => {
                WcError::RmCommunication {
                    rm_name: rm_name.to_string(),
                    message: err.message,
                }
            }
        }
    }
}

impl From<TmError> for WcError {
    fn from(err: TmError) -> Self {
        WcError::TmCommunication(err.to_string())
    }
}
