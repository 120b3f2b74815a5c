//! Windows agent lifecycle management for Gantry.
//!
//! The manager runs a worker on each Windows host as an OS service. This
//! crate owns those services end to end, from installing the agent package
//! to starting and stopping it, with every transition confirmed against
//! the broker control plane before it is declared done.

pub mod confirm;
pub mod installer;
pub mod launch;
pub mod registry;

pub use confirm::await_state;
pub use installer::AgentInstaller;
pub use registry::{OperationGuard, OperationRegistry};
