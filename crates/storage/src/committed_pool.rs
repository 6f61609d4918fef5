//! The committed page pool: the RM's in-memory view of committed state.

use crate::page::Page;
use crate::page_index::PageIndex;
use crate::page_io::PageIo;
use parking_lot::RwLock;
use resv_core::{Record, RmError};
use rustc_hash::FxHashMap;

/// Holds pages that have been paged in, lazily fetching from `PageIo` on
/// first touch and writing back through it on `flush_page`. This is the
/// single source of truth readers and `prepare`-time version checks read
/// against; transaction-local changes live in the shadow set until commit.
pub struct CommittedPagePool<I, IO> {
    index: I,
    io: IO,
    pages: RwLock<FxHashMap<u64, Page>>,
}

impl<I, IO> CommittedPagePool<I, IO>
where
    I: PageIndex,
    IO: PageIo,
{
    /// Build an empty pool over the given index and backing store.
    pub fn new(index: I, io: IO) -> Self {
        CommittedPagePool {
            index,
            io,
            pages: RwLock::new(FxHashMap::default()),
        }
    }

    /// Whether the page owning `key` is currently resident.
    pub fn has_page(&self, key: &str) -> bool {
        let page_id = self.index.record_to_page(key);
        self.pages.read().contains_key(&page_id)
    }

    /// Fetch the committed record at `key`, paging its owning page in from
    /// the backing store if it is not already resident.
    pub fn get_record(&self, key: &str) -> Result<Option<Record>, RmError> {
        let page_id = self.index.record_to_page(key);
        self.ensure_resident(page_id)?;
        Ok(self.pages.read().get(&page_id).and_then(|p| p.get(key).cloned()))
    }

    /// Write a single record into its owning page, paging the page in first
    /// if needed. Does not write back to the backing store — callers flush
    /// explicitly once a batch of changes is ready.
    pub fn put_record(&self, key: &str, record: Record) -> Result<(), RmError> {
        let page_id = self.index.record_to_page(key);
        self.ensure_resident(page_id)?;
        let mut pages = self.pages.write();
        let page = pages.entry(page_id).or_insert_with(|| Page::new(page_id));
        page.put(key.to_string(), record);
        Ok(())
    }

    /// Remove a record from its owning page, paging the page in first if
    /// needed. Used at commit to drop tombstones: the committed page pool
    /// never holds a deleted record across a commit boundary.
    pub fn delete_record(&self, key: &str) -> Result<(), RmError> {
        let page_id = self.index.record_to_page(key);
        self.ensure_resident(page_id)?;
        let mut pages = self.pages.write();
        if let Some(page) = pages.get_mut(&page_id) {
            page.delete(key);
        }
        Ok(())
    }

    /// Write a page back through the backing store.
    pub fn flush_page(&self, page_id: u64) -> Result<(), RmError> {
        let pages = self.pages.read();
        if let Some(page) = pages.get(&page_id) {
            self.io.page_out(page)?;
        }
        Ok(())
    }

    /// Drop a page from residency without writing it back. Used only for
    /// test isolation and cache eviction, never for committed-state mutation.
    pub fn evict_page(&self, page_id: u64) {
        self.pages.write().remove(&page_id);
    }

    /// The page id a key belongs to, for callers coordinating flush batches.
    pub fn page_id_for(&self, key: &str) -> u64 {
        self.index.record_to_page(key)
    }

    fn ensure_resident(&self, page_id: u64) -> Result<(), RmError> {
        if self.pages.read().contains_key(&page_id) {
            return Ok(());
        }
        let page = self.io.page_in(page_id)?;
        self.pages.write().entry(page_id).or_insert(page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_index::LinearPageIndex;
    use crate::page_io::InMemoryPageIo;
    use resv_core::FieldValue;
    use std::collections::BTreeMap;

    fn pool() -> CommittedPagePool<LinearPageIndex, InMemoryPageIo> {
        CommittedPagePool::new(LinearPageIndex::new(100, 4), InMemoryPageIo::new())
    }

    fn rec() -> Record {
        let mut fields = BTreeMap::new();
        fields.insert("flightNum".to_string(), FieldValue::Str("CA1234".into()));
        Record::new(fields)
    }

    #[test]
    fn put_then_get_sees_the_record() {
        let pool = pool();
        pool.put_record("0007", rec()).unwrap();
        assert!(pool.get_record("0007").unwrap().is_some());
    }

    #[test]
    fn get_on_unknown_key_is_none() {
        let pool = pool();
        assert!(pool.get_record("0099").unwrap().is_none());
    }

    #[test]
    fn flush_then_evict_then_reload_roundtrips() {
        let pool = pool();
        pool.put_record("0007", rec()).unwrap();
        pool.flush_page(pool.page_id_for("0007")).unwrap();
        pool.evict_page(pool.page_id_for("0007"));
        assert!(pool.get_record("0007").unwrap().is_some());
    }

    #[test]
    fn delete_record_removes_it() {
        let pool = pool();
        pool.put_record("0007", rec()).unwrap();
        pool.delete_record("0007").unwrap();
        assert!(pool.get_record("0007").unwrap().is_none());
    }
}
