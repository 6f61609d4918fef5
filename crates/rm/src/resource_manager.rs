//! The `ResourceManager`: CRUD under an xid, plus `prepare`/`commit`/`abort`
//! and startup `recover`.

use crate::config::RmConfig;
use crate::state::TxnState;
use parking_lot::Mutex;
use resv_concurrency::validation::{validate_prepare, CommittedStatus};
use resv_concurrency::{RowLockManager, ShadowSet};
use resv_core::{normalize_key, Record, RmError, Xid};
use resv_durability::PreparedLog;
use resv_storage::{CommittedPagePool, PageIndex, PageIo};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, instrument, warn};

/// The Resource Manager. Generic over the page index and backing-store
/// adapter so the same transactional core runs against an in-memory store
/// in tests and a real adapter in production.
pub struct ResourceManager<I, IO> {
    config: RmConfig,
    committed: CommittedPagePool<I, IO>,
    shadows: ShadowSet,
    locks: RowLockManager,
    prepared_log: PreparedLog,
    txn_states: Mutex<HashMap<Xid, TxnState>>,
}

impl<I, IO> ResourceManager<I, IO>
where
    I: PageIndex,
    IO: PageIo,
{
    /// Build an RM over the given page index and backing store, with its
    /// PREPARED log at `prepared_log_path`. Runs `recover` before
    /// returning, so a freshly constructed RM is already caught up on any
    /// transactions left PREPARED by a previous process.
    pub fn open(
        config: RmConfig,
        index: I,
        io: IO,
        prepared_log_path: impl Into<std::path::PathBuf>,
    ) -> Result<Self, RmError> {
        let prepared_log = PreparedLog::open(prepared_log_path).map_err(|e| RmError::io_error(e.to_string()))?;
        let rm = ResourceManager {
            config,
            committed: CommittedPagePool::new(index, io),
            shadows: ShadowSet::new(),
            locks: RowLockManager::new(),
            prepared_log,
            txn_states: Mutex::new(HashMap::new()),
        };
        rm.recover()?;
        Ok(rm)
    }

    fn normalize(&self, raw: &str) -> Result<String, RmError> {
        normalize_key(raw, self.config.key_width).map_err(|e| RmError::invalid_argument(e.to_string()))
    }

    fn state_of(&self, xid: Xid) -> TxnState {
        self.txn_states.lock().get(&xid).copied().unwrap_or(TxnState::Active)
    }

    fn ensure_active(&self, xid: Xid) -> Result<(), RmError> {
        match self.state_of(xid) {
            TxnState::Active => Ok(()),
            other => Err(RmError::invalid_tx_state(xid, format!("{other:?} does not accept CRUD"))),
        }
    }

    /// The value this transaction currently sees at `key`: its own shadow
    /// write if it has one (`None` meaning shadow-deleted), else the
    /// committed record if present and not a tombstone.
    fn effective_record(&self, xid: Xid, key: &str) -> Result<Option<Record>, RmError> {
        if let Some(shadowed) = self.shadows.write_for(xid, key) {
            return Ok(shadowed);
        }
        Ok(self.committed.get_record(key)?.filter(|r| !r.deleted))
    }

    /// The committed version at `key` for a non-deleted record, else `None`
    /// (absent or tombstoned) — used to fix a key's OCC start-version on
    /// first touch.
    fn committed_version_for(&self, key: &str) -> Result<Option<u64>, RmError> {
        Ok(self.committed.get_record(key)?.filter(|r| !r.deleted).map(|r| r.version))
    }

    fn committed_status(&self, key: &str) -> Result<CommittedStatus, RmError> {
        Ok(match self.committed.get_record(key)? {
            Some(r) if r.deleted => CommittedStatus::Tombstone,
            Some(r) => CommittedStatus::Present(r.version),
            None => CommittedStatus::Absent,
        })
    }

    /// Read the current visible record at `key` under `xid`.
    #[instrument(skip(self))]
    pub fn read(&self, xid: Xid, key: &str) -> Result<Record, RmError> {
        self.ensure_active(xid)?;
        let key = self.normalize(key)?;

        if let Some(shadowed) = self.shadows.write_for(xid, &key) {
            return shadowed.ok_or_else(|| RmError::key_not_found(&key));
        }

        match self.committed.get_record(&key)? {
            Some(r) if !r.deleted => {
                self.shadows.record_read(xid, &key, r.version);
                Ok(r)
            }
            _ => Err(RmError::key_not_found(&key)),
        }
    }

    /// Stage a new record in the shadow set. Fails `KEY_EXISTS` if a
    /// visible committed non-tombstone record already sits at its key.
    #[instrument(skip(self, record))]
    pub fn insert(&self, xid: Xid, record: Record) -> Result<(), RmError> {
        self.ensure_active(xid)?;
        let raw_key = record
            .primary_key_raw(&self.config.primary_key_field)
            .ok_or_else(|| RmError::invalid_argument("record is missing its primary key field"))?;
        let key = self.normalize(&raw_key)?;

        if self.effective_record(xid, &key)?.is_some() {
            return Err(RmError::key_exists(&key));
        }

        self.shadows.record_write(xid, &key, Some(record), None);
        Ok(())
    }

    /// Stage a field-level patch in the shadow set.
    #[instrument(skip(self, patch))]
    pub fn update(&self, xid: Xid, key: &str, patch: BTreeMap<String, resv_core::FieldValue>) -> Result<(), RmError> {
        self.ensure_active(xid)?;
        let key = self.normalize(key)?;

        let base = self.effective_record(xid, &key)?.ok_or_else(|| RmError::key_not_found(&key))?;
        let mut patched = base.deep_copy();
        patched.apply_patch(patch);

        let committed_version = self.committed_version_for(&key)?;
        self.shadows.record_write(xid, &key, Some(patched), committed_version);
        Ok(())
    }

    /// Stage a tombstone in the shadow set.
    #[instrument(skip(self))]
    pub fn delete(&self, xid: Xid, key: &str) -> Result<(), RmError> {
        self.ensure_active(xid)?;
        let key = self.normalize(key)?;

        if self.effective_record(xid, &key)?.is_none() {
            return Err(RmError::key_not_found(&key));
        }

        let committed_version = self.committed_version_for(&key)?;
        self.shadows.record_write(xid, &key, None, committed_version);
        Ok(())
    }

    /// Validate and durably commit this xid to eventual commit. Idempotent
    /// once PREPARED.
    #[instrument(skip(self))]
    pub fn prepare(&self, xid: Xid) -> Result<(), RmError> {
        match self.state_of(xid) {
            TxnState::Prepared => return Ok(()),
            TxnState::Committed | TxnState::Aborted => {
                return Err(RmError::invalid_tx_state(xid, "transaction already terminal"))
            }
            TxnState::Active => {}
        }

        let shadow = self.shadows.snapshot(xid);
        let mut keys: Vec<&String> = shadow.written_keys().collect();
        keys.sort();

        for key in keys.iter().copied() {
            if !self.locks.try_lock(key, xid) {
                self.locks.unlock_all(xid);
                let holder = self.locks.holder_of(key).unwrap_or(0);
                return Err(RmError::lock_conflict(key, holder));
            }
        }

        if let Err(e) = validate_prepare(&shadow, |key| self.committed_status(key)) {
            self.locks.unlock_all(xid);
            return Err(e);
        }

        let start_versions: HashMap<String, u64> = shadow
            .start_versions
            .iter()
            .map(|(k, v)| (k.clone(), v.unwrap_or(0)))
            .collect();

        self.prepared_log
            .mark_prepared(xid, &shadow.writes, &start_versions)
            .map_err(|e| RmError::io_error(e.to_string()))?;

        self.txn_states.lock().insert(xid, TxnState::Prepared);
        info!(xid, "prepared");
        Ok(())
    }

    /// Apply the shadow set to committed state, flush touched pages,
    /// release locks, and mark COMMITTED. Idempotent once COMMITTED.
    #[instrument(skip(self))]
    pub fn commit(&self, xid: Xid) -> Result<(), RmError> {
        match self.state_of(xid) {
            TxnState::Committed => return Ok(()),
            TxnState::Aborted | TxnState::Active => {
                return Err(RmError::invalid_tx_state(xid, "commit requires a prepared transaction"))
            }
            TxnState::Prepared => {}
        }

        let shadow = self.shadows.snapshot(xid);
        let mut keys: Vec<&String> = shadow.written_keys().collect();
        keys.sort();

        let mut touched_pages = HashSet::new();
        for key in keys.iter().copied() {
            touched_pages.insert(self.committed.page_id_for(key));
            match shadow.writes.get(key).unwrap() {
                Some(record) => {
                    let mut committed_record = record.deep_copy();
                    committed_record.version = xid;
                    committed_record.deleted = false;
                    self.committed.put_record(key, committed_record)?;
                }
                None => {
                    self.committed.delete_record(key)?;
                }
            }
        }

        for page_id in touched_pages {
            self.committed.flush_page(page_id)?;
        }

        self.locks.unlock_all(xid);
        self.shadows.discard(xid);
        self.prepared_log.clear(xid).map_err(|e| RmError::io_error(e.to_string()))?;
        self.txn_states.lock().insert(xid, TxnState::Committed);
        info!(xid, "committed");
        Ok(())
    }

    /// Discard the shadow set and release locks. Idempotent once ABORTED.
    #[instrument(skip(self))]
    pub fn abort(&self, xid: Xid) -> Result<(), RmError> {
        match self.state_of(xid) {
            TxnState::Aborted => return Ok(()),
            TxnState::Committed => {
                return Err(RmError::invalid_tx_state(xid, "cannot abort an already-committed transaction"))
            }
            TxnState::Active | TxnState::Prepared => {}
        }

        self.shadows.discard(xid);
        self.locks.unlock_all(xid);
        self.prepared_log.clear(xid).map_err(|e| RmError::io_error(e.to_string()))?;
        self.txn_states.lock().insert(xid, TxnState::Aborted);
        info!(xid, "aborted");
        Ok(())
    }

    /// Rebuild PREPARED state from the durable log. Called once at
    /// construction, before any request is served.
    fn recover(&self) -> Result<(), RmError> {
        for (xid, (writes, start_versions)) in self.prepared_log.recover() {
            let mut keys: Vec<&String> = writes.keys().collect();
            keys.sort();
            for key in keys.iter().copied() {
                if !self.locks.try_lock(key, xid) {
                    return Err(RmError::internal_invariant(format!(
                        "recovery could not re-acquire lock on {key:?} for xid {xid}"
                    )));
                }
            }

            let restored_start_versions: HashMap<String, Option<u64>> = start_versions
                .into_iter()
                .map(|(k, v)| (k, if v == 0 { None } else { Some(v) }))
                .collect();

            self.shadows.restore(xid, writes, restored_start_versions);
            self.txn_states.lock().insert(xid, TxnState::Prepared);
            warn!(xid, "recovered PREPARED transaction from durable log");
        }
        Ok(())
    }
}
