//! The TM's durable decision log.
//!
//! A per-TM JSON document holding one entry per xid whose phase-2 broadcast
//! has not yet fully drained: `{decisions: {"<xid>": {outcome, participants,
//! acked}}}`. An entry is the authoritative, irrevocable outcome of 2PC for
//! that xid; it is removed only once every participant has acknowledged.

use crate::atomic_json::{read_json_opt, write_json_atomic, DurabilityError};
use parking_lot::Mutex;
use resv_core::Xid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// The 2PC outcome fixed by a decision record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// Every participant voted OK at phase 1.
    Commit,
    /// At least one participant voted no, or the coordinator aborted.
    Abort,
}

/// One xid's durable decision: its outcome, the participants it must
/// broadcast to, and which of them have acknowledged so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// The xid this decision fixes.
    pub xid: Xid,
    /// COMMIT or ABORT.
    pub outcome: Outcome,
    /// Every RM endpoint enlisted in this transaction.
    pub participants: Vec<String>,
    /// Endpoints that have acknowledged phase 2 so far.
    pub acked: Vec<String>,
}

impl Decision {
    /// Whether every participant has acknowledged.
    pub fn is_fully_acked(&self) -> bool {
        self.participants.iter().all(|p| self.acked.contains(p))
    }

    /// Participants still owed a phase-2 call.
    pub fn outstanding(&self) -> Vec<String> {
        self.participants
            .iter()
            .filter(|p| !self.acked.contains(*p))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    decisions: BTreeMap<String, Decision>,
}

/// The durable decision log for one TM. All writes are serialized through
/// an internal lock and rewrite the whole document atomically.
pub struct DecisionLog {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl DecisionLog {
    /// Open (or create) the log at `path`, loading any pending decisions.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DurabilityError> {
        let path = path.into();
        let doc = read_json_opt(&path)?.unwrap_or_default();
        Ok(DecisionLog {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// Durably record the decision for `xid`. Called once, immediately
    /// after phase 1 completes and before phase 2 begins.
    pub fn record_decision(
        &self,
        xid: Xid,
        outcome: Outcome,
        participants: Vec<String>,
    ) -> Result<(), DurabilityError> {
        let mut doc = self.doc.lock();
        doc.decisions.insert(
            xid.to_string(),
            Decision {
                xid,
                outcome,
                participants,
                acked: Vec::new(),
            },
        );
        write_json_atomic(&self.path, &*doc)?;
        info!(xid, ?outcome, "decision recorded");
        Ok(())
    }

    /// Record that `participant` acknowledged phase 2 for `xid`. If every
    /// participant has now acknowledged, the decision record is removed.
    /// A no-op if `xid` has no pending decision.
    pub fn ack(&self, xid: Xid, participant: &str) -> Result<(), DurabilityError> {
        let mut doc = self.doc.lock();
        let key = xid.to_string();
        let done = if let Some(decision) = doc.decisions.get_mut(&key) {
            if !decision.acked.iter().any(|p| p == participant) {
                decision.acked.push(participant.to_string());
            }
            decision.is_fully_acked()
        } else {
            return Ok(());
        };

        if done {
            doc.decisions.remove(&key);
            info!(xid, "decision fully acked, record removed");
        }
        write_json_atomic(&self.path, &*doc)?;
        Ok(())
    }

    /// Every decision still pending phase-2 completion, for resuming
    /// broadcast after a TM restart.
    pub fn recover(&self) -> Vec<Decision> {
        self.doc.lock().decisions.values().cloned().collect()
    }

    /// The decision recorded for `xid`, if any.
    pub fn get(&self, xid: Xid) -> Option<Decision> {
        self.doc.lock().decisions.get(&xid.to_string()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_then_get_returns_the_decision() {
        let dir = tempdir().unwrap();
        let log = DecisionLog::open(dir.path().join("decisions.json")).unwrap();
        log.record_decision(1, Outcome::Commit, vec!["rm-flight".into(), "rm-customer".into()])
            .unwrap();
        let decision = log.get(1).unwrap();
        assert_eq!(decision.outcome, Outcome::Commit);
        assert_eq!(decision.outstanding().len(), 2);
    }

    #[test]
    fn ack_removes_the_record_once_all_have_acked() {
        let dir = tempdir().unwrap();
        let log = DecisionLog::open(dir.path().join("decisions.json")).unwrap();
        log.record_decision(1, Outcome::Commit, vec!["rm-flight".into(), "rm-customer".into()])
            .unwrap();
        log.ack(1, "rm-flight").unwrap();
        assert!(log.get(1).is_some());
        log.ack(1, "rm-customer").unwrap();
        assert!(log.get(1).is_none());
    }

    #[test]
    fn recover_after_reopen_returns_pending_decisions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("decisions.json");
        {
            let log = DecisionLog::open(&path).unwrap();
            log.record_decision(9, Outcome::Abort, vec!["rm-flight".into()]).unwrap();
        }
        let reopened = DecisionLog::open(&path).unwrap();
        let pending = reopened.recover();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].xid, 9);
    }

    #[test]
    fn ack_is_idempotent() {
        let dir = tempdir().unwrap();
        let log = DecisionLog::open(dir.path().join("decisions.json")).unwrap();
        log.record_decision(1, Outcome::Commit, vec!["rm-flight".into()]).unwrap();
        log.ack(1, "rm-flight").unwrap();
        log.ack(1, "rm-flight").unwrap();
        assert!(log.get(1).is_none());
    }
}
