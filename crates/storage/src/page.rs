//! A page: a group of records sharing a key range.

use resv_core::Record;
use std::collections::BTreeMap;

/// A logical page of committed records, keyed by normalized primary key.
///
/// Pages exist so that a backing-store adapter can batch reads and writes
/// (one query per page-in, one upsert batch per page-out) instead of doing
/// one round trip per key. Within a page, records are still addressed and
/// validated individually.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// The page identifier, as produced by a `PageIndex`.
    pub page_id: u64,
    /// Records in this page, keyed by normalized primary key.
    pub records: BTreeMap<String, Record>,
}

impl Page {
    /// An empty page with the given id.
    pub fn new(page_id: u64) -> Self {
        Page {
            page_id,
            records: BTreeMap::new(),
        }
    }

    /// Look up a record by normalized key.
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    /// Insert or overwrite a record.
    pub fn put(&mut self, key: String, record: Record) {
        self.records.insert(key, record);
    }

    /// Remove a record, if present.
    pub fn delete(&mut self, key: &str) {
        self.records.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resv_core::FieldValue;
    use std::collections::BTreeMap as Map;

    fn rec() -> Record {
        let mut fields = Map::new();
        fields.insert("flightNum".to_string(), FieldValue::Str("CA1234".into()));
        Record::new(fields)
    }

    #[test]
    fn put_get_delete_roundtrip() {
        let mut page = Page::new(0);
        page.put("0000CA1234".to_string(), rec());
        assert!(page.get("0000CA1234").is_some());
        page.delete("0000CA1234");
        assert!(page.get("0000CA1234").is_none());
    }
}
