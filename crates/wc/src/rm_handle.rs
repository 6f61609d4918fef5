//! The WC's view of an RM: the CRUD surface `reserve` needs, abstracted
//! over the concrete store so the orchestration logic below is the same
//! whether it is driving an in-process `ResourceManager` or (eventually) an
//! HTTP client to one.

use resv_core::{FieldValue, Record, RmError, Xid};
use resv_rm::ResourceManager;
use resv_storage::{PageIndex, PageIo};
use std::collections::BTreeMap;

/// CRUD surface an RM exposes to the WC. A real deployment implements this
/// over the RM's `/records/*` HTTP endpoints (§6); the in-process demo and
/// tests implement it directly over `resv_rm::ResourceManager`.
pub trait RmHandle: Send + Sync {
    /// This RM's registered endpoint name, for error attribution.
    fn name(&self) -> &str;

    /// Read the current record at `key` under `xid`.
    fn read(&self, xid: Xid, key: &str) -> Result<Record, RmError>;

    /// Insert a brand new record under `xid`.
    fn insert(&self, xid: Xid, record: Record) -> Result<(), RmError>;

    /// Apply a field-level patch to the record at `key` under `xid`.
    fn update(&self, xid: Xid, key: &str, patch: BTreeMap<String, FieldValue>) -> Result<(), RmError>;
}

/// Pairs an in-process `ResourceManager` with the endpoint name it enlists
/// under, so a single concrete RM type can back several differently-named
/// endpoints (flights, hotels, cars, customers) in one process.
pub struct NamedResourceManager<I, IO> {
    name: String,
    rm: ResourceManager<I, IO>,
}

impl<I, IO> NamedResourceManager<I, IO> {
    /// Wrap `rm` under `name`.
    pub fn new(name: impl Into<String>, rm: ResourceManager<I, IO>) -> Self {
        NamedResourceManager { name: name.into(), rm }
    }

    /// The wrapped `ResourceManager`, for calls outside the `RmHandle`
    /// surface (e.g. `prepare`/`commit`/`abort` via `resv_tm::RmParticipant`).
    pub fn inner(&self) -> &ResourceManager<I, IO> {
        &self.rm
    }
}

impl<I, IO> RmHandle for NamedResourceManager<I, IO>
where
    I: PageIndex + Send + Sync,
    IO: PageIo + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, xid: Xid, key: &str) -> Result<Record, RmError> {
        self.rm.read(xid, key)
    }

    fn insert(&self, xid: Xid, record: Record) -> Result<(), RmError> {
        self.rm.insert(xid, record)
    }

    fn update(&self, xid: Xid, key: &str, patch: BTreeMap<String, FieldValue>) -> Result<(), RmError> {
        self.rm.update(xid, key, patch)
    }
}

impl<I, IO> resv_tm::RmParticipant for NamedResourceManager<I, IO>
where
    I: PageIndex + Send + Sync,
    IO: PageIo + Send + Sync,
{
    fn endpoint(&self) -> &str {
        &self.name
    }

    fn prepare(&self, xid: Xid) -> Result<(), RmError> {
        self.rm.prepare(xid)
    }

    fn commit(&self, xid: Xid) -> Result<(), RmError> {
        self.rm.commit(xid)
    }

    fn abort(&self, xid: Xid) -> Result<(), RmError> {
        self.rm.abort(xid)
    }
}
