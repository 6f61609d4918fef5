//! The Resource Manager: a page-buffered, record-granular, optimistic- and
//! row-locking transactional store over a single keyed table.
//!
//! Combines `resv_storage`'s committed page pool, `resv_concurrency`'s
//! shadow sets / row locks / prepare-time validation, and
//! `resv_durability`'s PREPARED log into the CRUD + 2PC-participant
//! contract a Transaction Manager coordinates against.

#![warn(missing_docs)]

pub mod config;
pub mod resource_manager;
pub mod state;

pub use config::RmConfig;
pub use resource_manager::ResourceManager;
pub use state::TxnState;
