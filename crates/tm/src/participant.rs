//! The TM's view of an RM participant.

use resv_core::{RmError, Xid};

/// What the TM needs from an RM to run 2PC against it. A real deployment
/// implements this over an HTTP client to the RM's `/txn/*` endpoints; tests
/// and the in-process demo implement it directly over a `ResourceManager`.
pub trait RmParticipant: Send + Sync {
    /// The endpoint identifier this participant enlists under.
    fn endpoint(&self) -> &str;

    /// Phase 1: ask this participant to vote on `xid`.
    fn prepare(&self, xid: Xid) -> Result<(), RmError>;

    /// Phase 2: tell this participant to commit `xid`. Must be idempotent.
    fn commit(&self, xid: Xid) -> Result<(), RmError>;

    /// Phase 2: tell this participant to abort `xid`. Must be idempotent.
    fn abort(&self, xid: Xid) -> Result<(), RmError>;
}
