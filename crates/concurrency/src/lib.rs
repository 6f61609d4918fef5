//! Transaction-local isolation for the Resource Manager: shadow writes, row
//! locks, and prepare-time optimistic-concurrency validation.
//!
//! None of this crate's state is durable on its own — `resv_durability`
//! persists the outcome of `prepare` so it survives a restart; everything
//! here is scoped to one live RM process.

#![warn(missing_docs)]

pub mod lock;
pub mod shadow;
pub mod validation;

pub use lock::RowLockManager;
pub use shadow::{ShadowSet, TxnShadow};
pub use validation::validate_prepare;
