//! The 2PC coordinator.

use crate::config::TmConfig;
use crate::error::TmError;
use crate::participant::RmParticipant;
use crate::state::{TmStatus, TmTxnState};
use dashmap::DashMap;
use resv_core::Xid;
use resv_durability::{DecisionLog, Outcome};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

struct TxnEntry {
    state: TmTxnState,
    participants: HashSet<String>,
}

/// The Transaction Manager: coordinates 2PC across whatever RM endpoints
/// enlist themselves into each transaction.
pub struct TransactionManager {
    config: TmConfig,
    next_xid: AtomicU64,
    table: DashMap<Xid, TxnEntry>,
    registry: DashMap<String, Arc<dyn RmParticipant>>,
    decisions: DecisionLog,
}

impl TransactionManager {
    /// Open (or create) the TM's decision log at `decision_log_path` and
    /// resume any phase-2 broadcasts left pending by a previous process.
    pub fn open(
        config: TmConfig,
        decision_log_path: impl Into<std::path::PathBuf>,
    ) -> Result<Self, TmError> {
        let decisions = DecisionLog::open(decision_log_path).map_err(|e| {
            error!(error = %e, "failed to open decision log");
            TmError::Durability(e.to_string())
        })?;

        let tm = TransactionManager {
            config,
            next_xid: AtomicU64::new(1),
            table: DashMap::new(),
            registry: DashMap::new(),
            decisions,
        };

        tm.recover();
        Ok(tm)
    }

    /// Register an RM participant under its endpoint identifier, so later
    /// `enlist` calls naming that endpoint succeed.
    pub fn register_participant(&self, participant: Arc<dyn RmParticipant>) {
        self.registry.insert(participant.endpoint().to_string(), participant);
    }

    /// Assign a fresh xid and open an ACTIVE entry for it. Not durable: a
    /// crash before any enlistment loses it, which is equivalent to the
    /// client never having obtained it.
    #[instrument(skip(self))]
    pub fn start(&self) -> Xid {
        let xid = self.next_xid.fetch_add(1, Ordering::SeqCst);
        self.table.insert(
            xid,
            TxnEntry {
                state: TmTxnState::Active,
                participants: HashSet::new(),
            },
        );
        info!(xid, "transaction started");
        xid
    }

    /// Add `endpoint` to `xid`'s participant set. Idempotent; fails if the
    /// endpoint has no registered participant or the transaction is not
    /// ACTIVE.
    pub fn enlist(&self, xid: Xid, endpoint: &str) -> Result<(), TmError> {
        if !self.registry.contains_key(endpoint) {
            return Err(TmError::UnknownParticipant(endpoint.to_string()));
        }
        let mut entry = self.table.get_mut(&xid).ok_or(TmError::TxnNotFound(xid))?;
        if entry.state != TmTxnState::Active {
            return Err(TmError::NotActive(xid));
        }
        entry.participants.insert(endpoint.to_string());
        Ok(())
    }

    /// Current client-visible status. An xid with no transaction-table entry
    /// has no decision record either — per §4.5, that means it never reached
    /// a decision before some crash (or was never issued at all), so no
    /// participant can have committed on its behalf. Both cases report
    /// ABORTED rather than an error: the client-visible contract never has
    /// a fifth "not found" outcome.
    pub fn status(&self, xid: Xid) -> Result<TmStatus, TmError> {
        Ok(match self.table.get(&xid) {
            Some(entry) => match entry.state {
                TmTxnState::Active => TmStatus::Active,
                TmTxnState::Committed => TmStatus::Committed,
                TmTxnState::Aborted => TmStatus::Aborted,
            },
            None => TmStatus::Aborted,
        })
    }

    /// Run 2PC to completion (or IN_DOUBT) for `xid`.
    #[instrument(skip(self))]
    pub fn commit(&self, xid: Xid) -> Result<TmStatus, TmError> {
        let participants: Vec<String> = {
            let entry = self.table.get(&xid).ok_or(TmError::TxnNotFound(xid))?;
            match entry.state {
                TmTxnState::Committed => return Ok(TmStatus::Committed),
                TmTxnState::Aborted => return Ok(TmStatus::Aborted),
                TmTxnState::Active => entry.participants.iter().cloned().collect(),
            }
        };

        let all_voted_ok = participants.iter().all(|endpoint| match self.lookup(endpoint) {
            Some(p) => match p.prepare(xid) {
                Ok(()) => true,
                Err(e) => {
                    warn!(xid, endpoint, error = %e, "participant voted NO at prepare");
                    false
                }
            },
            None => {
                warn!(xid, endpoint, "participant not registered at commit time");
                false
            }
        });

        let outcome = if all_voted_ok { Outcome::Commit } else { Outcome::Abort };
        self.decisions
            .record_decision(xid, outcome, participants.clone())
            .map_err(|e| {
                error!(xid, error = %e, "failed to durably record decision");
                TmError::Durability(e.to_string())
            })?;

        {
            let mut entry = self.table.get_mut(&xid).unwrap();
            entry.state = match outcome {
                Outcome::Commit => TmTxnState::Committed,
                Outcome::Abort => TmTxnState::Aborted,
            };
        }

        let drained = self.run_phase2(xid, outcome, &participants);

        match (outcome, drained) {
            (Outcome::Commit, true) => Ok(TmStatus::Committed),
            (Outcome::Abort, true) => Ok(TmStatus::Aborted),
            (_, false) => Ok(TmStatus::InDoubt),
        }
    }

    /// Abort `xid`. Idempotent; always resolves to ABORTED.
    #[instrument(skip(self))]
    pub fn abort(&self, xid: Xid) -> Result<TmStatus, TmError> {
        let participants: Vec<String> = {
            let entry = self.table.get(&xid).ok_or(TmError::TxnNotFound(xid))?;
            match entry.state {
                TmTxnState::Aborted => return Ok(TmStatus::Aborted),
                TmTxnState::Committed => return Err(TmError::NotActive(xid)),
                TmTxnState::Active => entry.participants.iter().cloned().collect(),
            }
        };

        self.decisions
            .record_decision(xid, Outcome::Abort, participants.clone())
            .map_err(|e| {
                error!(xid, error = %e, "failed to durably record abort decision");
                TmError::Durability(e.to_string())
            })?;

        {
            let mut entry = self.table.get_mut(&xid).unwrap();
            entry.state = TmTxnState::Aborted;
        }

        self.run_phase2(xid, Outcome::Abort, &participants);
        Ok(TmStatus::Aborted)
    }

    fn lookup(&self, endpoint: &str) -> Option<Arc<dyn RmParticipant>> {
        self.registry.get(endpoint).map(|r| r.clone())
    }

    /// Broadcast `outcome`'s phase-2 call to every participant not yet
    /// acknowledged, up to `max_phase2_attempts` rounds. Returns whether
    /// every participant is now acknowledged.
    fn run_phase2(&self, xid: Xid, outcome: Outcome, _participants: &[String]) -> bool {
        for attempt in 0..self.config.max_phase2_attempts {
            let outstanding: Vec<String> = match self.decisions.get(xid) {
                Some(decision) => decision.outstanding(),
                None => return true,
            };
            if outstanding.is_empty() {
                return true;
            }

            for endpoint in &outstanding {
                let Some(participant) = self.lookup(endpoint) else {
                    warn!(xid, endpoint, "no participant registered, cannot complete phase 2");
                    continue;
                };
                let result = match outcome {
                    Outcome::Commit => participant.commit(xid),
                    Outcome::Abort => participant.abort(xid),
                };
                match result {
                    Ok(()) => {
                        if let Err(e) = self.decisions.ack(xid, endpoint) {
                            error!(xid, endpoint, error = %e, "failed to durably record ack");
                        }
                    }
                    Err(e) => {
                        warn!(xid, endpoint, attempt, error = %e, "phase 2 call failed, will retry");
                    }
                }
            }
        }

        self.decisions.get(xid).is_none()
    }

    /// Resume phase-2 broadcast for every decision left pending by a
    /// previous process. Transactions with no decision record are
    /// implicitly ABORTed: they had not yet reached a decision before the
    /// crash, so the transaction table simply has no entry for them.
    fn recover(&self) {
        for decision in self.decisions.recover() {
            warn!(xid = decision.xid, outcome = ?decision.outcome, "resuming phase 2 after restart");
            self.table.insert(
                decision.xid,
                TxnEntry {
                    state: match decision.outcome {
                        Outcome::Commit => TmTxnState::Committed,
                        Outcome::Abort => TmTxnState::Aborted,
                    },
                    participants: decision.participants.iter().cloned().collect(),
                },
            );
            self.run_phase2(decision.xid, decision.outcome, &decision.participants);
        }
    }
}
