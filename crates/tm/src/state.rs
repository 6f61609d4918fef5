//! TM-side transaction state and client-visible status.

/// The TM's internal transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmTxnState {
    /// Accepting `enlist` calls, not yet asked to commit or abort.
    Active,
    /// The COMMIT decision is durable; phase 2 may still be draining.
    Committed,
    /// The ABORT decision is durable; phase 2 may still be draining.
    Aborted,
}

/// The outcome reported to a client, per §4.5/§7: exactly one of these,
/// never a fourth option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmStatus {
    /// Still accepting enlistments; no decision made.
    Active,
    /// All writes persisted at every participant.
    Committed,
    /// No writes persisted anywhere.
    Aborted,
    /// The decision is durable but phase 2 has not fully drained within the
    /// reporting deadline. Re-querying `status` will eventually resolve to
    /// COMMITTED or ABORTED.
    InDoubt,
}
