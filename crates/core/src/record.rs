//! The record model.
//!
//! A [`Record`] is an open field map plus the two control fields the RM
//! needs to do its job: `version` (who last committed it) and `deleted`
//! (tombstone flag). The RM treats every field opaquely except the one
//! configured as the primary key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar field value.
///
/// The source system treats records as dynamically typed key-value maps;
/// here that is modeled as a closed set of scalar variants rather than an
/// arbitrary dynamic type, which is enough to represent the flight/hotel/
/// car/customer records in the test scenarios while staying statically
/// checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// UTF-8 string field.
    Str(String),
    /// Signed integer field.
    Int(i64),
    /// Floating point field (e.g. prices).
    Float(f64),
    /// Boolean field.
    Bool(bool),
}

impl FieldValue {
    /// Read this field as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Read this field as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A single record: an open field map plus version/tombstone control fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Field name → value. Sorted so that two records built from the same
    /// field set serialize identically (load-bearing for the durable
    /// PREPARED log, which compares recovered bytes against the original).
    pub fields: BTreeMap<String, FieldValue>,
    /// The xid that last committed this record. `0` for a record that has
    /// never been committed (pure in-flight shadow state).
    pub version: u64,
    /// Tombstone flag. A deleted record is never visible to readers and is
    /// never present in the committed page pool across a commit boundary.
    pub deleted: bool,
}

impl Record {
    /// Construct a fresh, uncommitted record from its fields.
    pub fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        Record {
            fields,
            version: 0,
            deleted: false,
        }
    }

    /// Read the normalized primary-key value out of this record's fields.
    ///
    /// Returns `None` if the configured primary-key field is absent or is
    /// not a string/int field (the only two variants the RM accepts as key
    /// material).
    pub fn primary_key_raw(&self, pk_field: &str) -> Option<String> {
        match self.fields.get(pk_field)? {
            FieldValue::Str(s) => Some(s.clone()),
            FieldValue::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Apply a field-level patch in place (used by `update`).
    pub fn apply_patch(&mut self, patch: BTreeMap<String, FieldValue>) {
        for (k, v) in patch {
            self.fields.insert(k, v);
        }
    }

    /// Shallow-copy-free deep copy. `Record` only holds owned data, so this
    /// is a plain `Clone`, but the method exists to name the operation the
    /// shadow-set contract requires explicitly (see `resv_concurrency::shadow`).
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(version: u64) -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("flightNum".to_string(), FieldValue::Str("CA1234".into()));
        fields.insert("numAvail".to_string(), FieldValue::Int(10));
        Record {
            fields,
            version,
            deleted: false,
        }
    }

    #[test]
    fn primary_key_extraction() {
        let r = rec(0);
        assert_eq!(r.primary_key_raw("flightNum").as_deref(), Some("CA1234"));
        assert_eq!(r.primary_key_raw("missing"), None);
    }

    #[test]
    fn patch_overwrites_fields_only() {
        let mut r = rec(5);
        let mut patch = BTreeMap::new();
        patch.insert("numAvail".to_string(), FieldValue::Int(9));
        r.apply_patch(patch);
        assert_eq!(r.fields.get("numAvail").unwrap().as_int(), Some(9));
        assert_eq!(r.fields.get("flightNum").unwrap().as_str(), Some("CA1234"));
    }

    #[test]
    fn deep_copy_is_independent() {
        let r = rec(1);
        let mut copy = r.deep_copy();
        copy.version = 2;
        assert_eq!(r.version, 1);
        assert_eq!(copy.version, 2);
    }
}
