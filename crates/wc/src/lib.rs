//! The Workflow Controller: composes one business request into a single TM
//! transaction touching whichever RMs it needs. Not on the hot path of the
//! core 2PC algorithms — this crate is the narrow contract the RM/TM expose
//! upward to a business layer, plus the wire shapes a networked front end
//! would bind to.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod rm_handle;
pub mod wire;

pub use config::WcConfig;
pub use error::WcError;
pub use orchestrator::{reserve, ReservationOutcome, ReservationType};
pub use rm_handle::{NamedResourceManager, RmHandle};
