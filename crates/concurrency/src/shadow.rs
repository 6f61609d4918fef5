//! Transaction-local shadow writes, read set, and start-version tracking.
//!
//! Every value a transaction writes or reads is deep-copied into its own
//! shadow before any shared state is touched, so concurrent transactions
//! never observe each other's in-flight changes — the committed page pool
//! is only mutated once a transaction reaches `commit`.

use dashmap::DashMap;
use resv_core::{Record, Version, Xid};
use std::collections::HashMap;

/// One transaction's isolated view: its write set (keyed deep copies, `None`
/// meaning a delete), the committed version each touched key had when first
/// observed, and the version each read key had at read time.
#[derive(Debug, Default, Clone)]
pub struct TxnShadow {
    /// `key -> Some(record)` for inserts/updates, `key -> None` for deletes.
    pub writes: HashMap<String, Option<Record>>,
    /// `key -> Some(version)` recorded the first time this xid touched an
    /// *existing* committed record at that key, by read or write. `key ->
    /// None` (present but no version) marks a pure insert: the key had no
    /// visible committed record when this xid first wrote it.
    pub start_versions: HashMap<String, Option<Version>>,
    /// `key -> version` recorded for every key this xid has read an
    /// existing record at, including keys it never writes. `prepare`
    /// revalidates these too.
    pub reads: HashMap<String, Version>,
}

impl TxnShadow {
    /// All keys this transaction has written, in no particular order.
    pub fn written_keys(&self) -> impl Iterator<Item = &String> {
        self.writes.keys()
    }
}

/// The set of all in-flight transactions' shadows, keyed by xid.
#[derive(Debug, Default)]
pub struct ShadowSet {
    txns: DashMap<Xid, TxnShadow>,
}

impl ShadowSet {
    /// An empty shadow set.
    pub fn new() -> Self {
        ShadowSet {
            txns: DashMap::new(),
        }
    }

    /// Start tracking a new xid. A no-op if the xid is already tracked.
    pub fn begin(&self, xid: Xid) {
        self.txns.entry(xid).or_default();
    }

    /// Record that `xid` read an existing record at `key` with committed
    /// version `version`. The first read of a key wins for both
    /// `start_versions` and `reads` — later reads in the same transaction
    /// see its own uncommitted writes instead, via `write_for`, and never
    /// call this again for that key.
    pub fn record_read(&self, xid: Xid, key: &str, version: Version) {
        let mut shadow = self.txns.entry(xid).or_default();
        shadow.reads.entry(key.to_string()).or_insert(version);
        shadow.start_versions.entry(key.to_string()).or_insert(Some(version));
    }

    /// Record a write (`Some(record)`) or delete (`None`) by `xid` on `key`,
    /// deep-copying the record into the shadow. `committed_version` is the
    /// version an existing committed record had the first time this xid
    /// touched it, or `None` if no visible committed record exists (a pure
    /// insert). Ignored on the second and later writes to the same key.
    pub fn record_write(
        &self,
        xid: Xid,
        key: &str,
        record: Option<Record>,
        committed_version: Option<Version>,
    ) {
        let mut shadow = self.txns.entry(xid).or_default();
        shadow.start_versions.entry(key.to_string()).or_insert(committed_version);
        shadow.writes.insert(key.to_string(), record.map(|r| r.deep_copy()));
    }

    /// The shadowed value for `key` under `xid`, if this transaction has
    /// written it. `Some(None)` means the key is shadow-deleted.
    pub fn write_for(&self, xid: Xid, key: &str) -> Option<Option<Record>> {
        self.txns.get(&xid).and_then(|s| s.writes.get(key).cloned())
    }

    /// A snapshot copy of `xid`'s full shadow, for validation and commit.
    pub fn snapshot(&self, xid: Xid) -> TxnShadow {
        self.txns.get(&xid).map(|s| s.clone()).unwrap_or_default()
    }

    /// Drop `xid`'s shadow entirely. Called once the transaction reaches a
    /// terminal state, whether committed or aborted.
    pub fn discard(&self, xid: Xid) {
        self.txns.remove(&xid);
    }

    /// Overwrite `xid`'s shadow wholesale with a rebuilt write set and
    /// start-version map, bypassing the first-touch-wins insertion rule.
    /// Used only during crash recovery, where the durable log is the
    /// authoritative source of the original shadow state, not first touch
    /// order during this process's lifetime.
    pub fn restore(
        &self,
        xid: Xid,
        writes: HashMap<String, Option<Record>>,
        start_versions: HashMap<String, Option<Version>>,
    ) {
        self.txns.insert(
            xid,
            TxnShadow {
                writes,
                start_versions,
                reads: HashMap::new(),
            },
        );
    }
}
