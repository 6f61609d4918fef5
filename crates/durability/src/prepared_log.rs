//! The RM's durable PREPARED log.
//!
//! A per-RM JSON document at a well-known path holding, for every currently
//! PREPARED xid, enough of its shadow set to rebuild it exactly on restart:
//! `{prepared: {"<xid>": {records: {"<key>": {data, deleted, version}}}}}`.

use crate::atomic_json::{read_json_opt, write_json_atomic, DurabilityError};
use parking_lot::Mutex;
use resv_core::{FieldValue, Record, Xid};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::info;

/// One record as captured in the PREPARED log: enough to reconstruct a
/// shadow `Record` (or a shadow delete) without consulting committed state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreparedRecord {
    /// Field values, or absent for a shadow delete (`deleted: true`).
    pub data: BTreeMap<String, FieldValue>,
    /// Whether this shadow entry is a tombstone.
    pub deleted: bool,
    /// The committed version this shadow entry started from (`0` for a
    /// pure insert with no prior committed record).
    pub version: u64,
}

impl PreparedRecord {
    fn from_shadow(record: Option<&Record>, start_version: u64) -> Self {
        match record {
            Some(r) => PreparedRecord {
                data: r.fields.clone(),
                deleted: false,
                version: start_version,
            },
            None => PreparedRecord {
                data: BTreeMap::new(),
                deleted: true,
                version: start_version,
            },
        }
    }

    /// Rebuild the shadow entry this log record represents: `None` for a
    /// delete, `Some(record)` otherwise.
    pub fn to_shadow(&self) -> Option<Record> {
        if self.deleted {
            None
        } else {
            Some(Record {
                fields: self.data.clone(),
                version: self.version,
                deleted: false,
            })
        }
    }
}

/// One PREPARED transaction's durable shadow set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreparedTxn {
    /// `key -> shadow record`.
    pub records: BTreeMap<String, PreparedRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    prepared: BTreeMap<String, PreparedTxn>,
}

/// The durable PREPARED log for one RM. All writes are serialized through
/// an internal lock and rewrite the whole document atomically.
pub struct PreparedLog {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl PreparedLog {
    /// Open (or create) the log at `path`, loading any existing PREPARED
    /// transactions into memory for `recover` to return.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DurabilityError> {
        let path = path.into();
        let doc = read_json_opt(&path)?.unwrap_or_default();
        Ok(PreparedLog {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// Durably record `xid` as PREPARED with the given shadow writes.
    /// `writes` maps key to `Some(record)` for a put or `None` for a
    /// delete; `start_versions` gives the committed version each key had
    /// when first touched, or `0` for a pure insert.
    pub fn mark_prepared(
        &self,
        xid: Xid,
        writes: &HashMap<String, Option<Record>>,
        start_versions: &HashMap<String, u64>,
    ) -> Result<(), DurabilityError> {
        let mut records = BTreeMap::new();
        for (key, value) in writes {
            let start_version = start_versions.get(key).copied().unwrap_or(0);
            records.insert(key.clone(), PreparedRecord::from_shadow(value.as_ref(), start_version));
        }

        let mut doc = self.doc.lock();
        doc.prepared.insert(xid.to_string(), PreparedTxn { records });
        write_json_atomic(&self.path, &*doc)?;
        info!(xid, "xid marked PREPARED in durable log");
        Ok(())
    }

    /// Remove `xid`'s durable PREPARED entry (called after commit or
    /// abort). A no-op if the xid has no entry.
    pub fn clear(&self, xid: Xid) -> Result<(), DurabilityError> {
        let mut doc = self.doc.lock();
        if doc.prepared.remove(&xid.to_string()).is_some() {
            write_json_atomic(&self.path, &*doc)?;
            info!(xid, "xid PREPARED entry cleared");
        }
        Ok(())
    }

    /// Every PREPARED transaction currently on disk, as rebuilt shadow
    /// write sets plus the start-version each key was recorded at. Called
    /// once at RM startup before serving any request.
    pub fn recover(&self) -> HashMap<Xid, (HashMap<String, Option<Record>>, HashMap<String, u64>)> {
        let doc = self.doc.lock();
        doc.prepared
            .iter()
            .filter_map(|(xid_str, txn)| {
                let xid: Xid = xid_str.parse().ok()?;
                let mut writes = HashMap::new();
                let mut start_versions = HashMap::new();
                for (key, rec) in &txn.records {
                    writes.insert(key.clone(), rec.to_shadow());
                    start_versions.insert(key.clone(), rec.version);
                }
                Some((xid, (writes, start_versions)))
            })
            .collect()
    }

    /// The path this log is backed by, for diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resv_core::FieldValue;
    use tempfile::tempdir;

    fn rec() -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("numAvail".to_string(), FieldValue::Int(9));
        Record::new(fields)
    }

    #[test]
    fn mark_then_recover_rebuilds_the_shadow() {
        let dir = tempdir().unwrap();
        let log = PreparedLog::open(dir.path().join("prepared.json")).unwrap();

        let mut writes = HashMap::new();
        writes.insert("0001".to_string(), Some(rec()));
        let mut start_versions = HashMap::new();
        start_versions.insert("0001".to_string(), 3);

        log.mark_prepared(42, &writes, &start_versions).unwrap();

        let recovered = log.recover();
        let (recovered_writes, recovered_versions) = recovered.get(&42).unwrap();
        assert!(recovered_writes.get("0001").unwrap().is_some());
        assert_eq!(recovered_versions.get("0001"), Some(&3));
    }

    #[test]
    fn mark_then_reopen_recovers_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prepared.json");

        let mut writes = HashMap::new();
        writes.insert("0002".to_string(), None);
        let mut start_versions = HashMap::new();
        start_versions.insert("0002".to_string(), 5);

        {
            let log = PreparedLog::open(&path).unwrap();
            log.mark_prepared(7, &writes, &start_versions).unwrap();
        }

        let reopened = PreparedLog::open(&path).unwrap();
        let recovered = reopened.recover();
        let (recovered_writes, _) = recovered.get(&7).unwrap();
        assert_eq!(recovered_writes.get("0002"), Some(&None));
    }

    #[test]
    fn clear_removes_the_entry() {
        let dir = tempdir().unwrap();
        let log = PreparedLog::open(dir.path().join("prepared.json")).unwrap();

        let mut writes = HashMap::new();
        writes.insert("0001".to_string(), Some(rec()));
        log.mark_prepared(1, &writes, &HashMap::new()).unwrap();
        log.clear(1).unwrap();

        assert!(log.recover().is_empty());
    }
}
