//! # resv
//!
//! A distributed reservation service: page-buffered OCC resource managers
//! (RMs) coordinated by a two-phase-commit transaction manager (TM), with a
//! workflow controller (WC) on top that drives cross-RM reservations as
//! single transactions.
//!
//! # Architecture
//!
//! - A [`resv_rm::ResourceManager`] owns one shard's records behind an OCC
//!   prepare/commit/abort protocol, buffering committed pages over a
//!   pluggable page store.
//! - A [`resv_tm::TransactionManager`] drives the 2PC round across the RMs
//!   enlisted in a transaction and keeps a durable decision log so phase-2
//!   can resume after a crash.
//! - [`resv_wc::reserve`] is the orchestration entry point: it enlists a
//!   resource RM and a customer RM in one transaction, deducts inventory,
//!   records the reservation, and drives the transaction to completion.
//!
//! Internal crates (storage, concurrency, durability) are not exposed here —
//! only the public API surface in this crate is stable. A concrete RM is
//! generic over its page index and page I/O backend (see `resv-storage`),
//! so constructing one requires depending on `resv-storage` directly, the
//! way `resv-cli` does.
//!
//! Re-exported are the RM, TM, and WC crates' public items plus the shared
//! error/record/key types from `resv-core`.

pub use resv_core::{normalize_key, FieldValue, KeyError, Record, RmError, RmErrorKind, Version, Xid};
pub use resv_rm::{RmConfig, ResourceManager, TxnState};
pub use resv_tm::{RmParticipant, TmConfig, TmError, TmStatus, TransactionManager};
pub use resv_wc::{reserve, NamedResourceManager, ReservationOutcome, ReservationType, RmHandle, WcConfig, WcError};
