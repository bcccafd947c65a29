//! hosting-teardown - Ordered teardown of a hosting connection
//!
//! Drains the active provisioning tasks of a hosting connection in a
//! desktop-delivery site, then removes its resource connections, the
//! connection object and the broker registration. Every destructive step is
//! confirmation-gated and bracketed by a high-level audit operation.

pub mod audit;
pub mod config;
pub mod confirm;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod site;

pub use error::{ConfigError, TeardownError};
pub use orchestrator::{TeardownOrchestrator, TeardownReport, run_teardown};
