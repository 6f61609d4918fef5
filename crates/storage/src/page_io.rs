//! `PageIo`: bulk load/write-back against a backing store.

use crate::page::Page;
use parking_lot::Mutex;
use resv_core::RmError;
use rustc_hash::FxHashMap;

/// Bulk page transfer to/from a backing store. An RM calls `page_in` once
/// per page touched by a transaction and `page_out` once per page dirtied
/// at commit, rather than doing per-record round trips.
pub trait PageIo: Send + Sync {
    /// Load a page by id. A page with no records yet is returned empty, not
    /// as an error — pages are implicit, not pre-allocated.
    fn page_in(&self, page_id: u64) -> Result<Page, RmError>;

    /// Write a page back in full. Overwrites whatever was previously stored
    /// under the same id.
    fn page_out(&self, page: &Page) -> Result<(), RmError>;
}

/// A `PageIo` backed by an in-process map, for tests and the in-memory
/// deployment profile. Never touches disk; `resv_durability` is what
/// actually makes a transaction's effects durable across a process restart.
#[derive(Debug, Default)]
pub struct InMemoryPageIo {
    pages: Mutex<FxHashMap<u64, Page>>,
}

impl InMemoryPageIo {
    /// An empty backing store.
    pub fn new() -> Self {
        InMemoryPageIo {
            pages: Mutex::new(FxHashMap::default()),
        }
    }
}

impl PageIo for InMemoryPageIo {
    fn page_in(&self, page_id: u64) -> Result<Page, RmError> {
        let pages = self.pages.lock();
        Ok(pages.get(&page_id).cloned().unwrap_or_else(|| Page::new(page_id)))
    }

    fn page_out(&self, page: &Page) -> Result<(), RmError> {
        let mut pages = self.pages.lock();
        pages.insert(page.page_id, page.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resv_core::{FieldValue, Record};
    use std::collections::BTreeMap;

    #[test]
    fn page_in_on_unknown_id_is_empty() {
        let io = InMemoryPageIo::new();
        let page = io.page_in(7).unwrap();
        assert_eq!(page.page_id, 7);
        assert!(page.records.is_empty());
    }

    #[test]
    fn page_out_then_page_in_roundtrips() {
        let io = InMemoryPageIo::new();
        let mut page = Page::new(3);
        let mut fields = BTreeMap::new();
        fields.insert("flightNum".to_string(), FieldValue::Str("CA1234".into()));
        page.put("0003".to_string(), Record::new(fields));
        io.page_out(&page).unwrap();

        let back = io.page_in(3).unwrap();
        assert!(back.get("0003").is_some());
    }
}
