//! hosting-teardown-common - Shared types
//!
//! Domain types shared by the teardown library, its binary and the test
//! fixtures, without any process or database dependencies.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`model`]: Hosting connections, resource units and provisioning tasks
//! - [`outcome`]: Per-step outcome of a destructive step
//! - [`step_kind`]: Destructive step kinds and teardown ordering

pub mod defaults;
pub mod model;
pub mod outcome;
pub mod step_kind;

pub use model::{HostingConnection, ProvisioningTask, ResourceUnit};
pub use outcome::StepOutcome;
pub use step_kind::StepKind;
