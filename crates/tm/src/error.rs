//! TM-level errors.
//!
//! These are coordinator-level failures — distinct from `resv_core::RmError`,
//! which is what a participant's `prepare`/`commit`/`abort` call can fail
//! with and which the TM only ever logs, never surfaces to its own caller.

use resv_core::Xid;
use thiserror::Error;

/// A failure at the TM's own coordination layer.
#[derive(Debug, Clone, Error)]
pub enum TmError {
    /// No transaction table entry for this xid.
    #[error("xid {0} not found")]
    TxnNotFound(Xid),
    /// The operation requires an ACTIVE transaction and this one is not.
    #[error("xid {0} is not ACTIVE")]
    NotActive(Xid),
    /// `enlist` named an endpoint this TM has no participant registered for.
    #[error("no participant registered for endpoint {0:?}")]
    UnknownParticipant(String),
    /// The decision log failed to read or write.
    #[error("decision log error: {0}")]
    Durability(String),
}
