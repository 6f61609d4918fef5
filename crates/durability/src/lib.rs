//! Durable logs for the Resource Manager and Transaction Manager.
//!
//! Both logs are single JSON documents rewritten in full on every mutation,
//! using the same atomic temp-file + fsync + rename pattern: a torn write
//! can never leave the well-known path holding a partial document.

#![warn(missing_docs)]

pub mod atomic_json;
pub mod decision_log;
pub mod prepared_log;

pub use atomic_json::{write_json_atomic, DurabilityError};
pub use decision_log::{Decision, DecisionLog, Outcome};
pub use prepared_log::{PreparedLog, PreparedRecord, PreparedTxn};
