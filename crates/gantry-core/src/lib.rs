//! Gantry Core
//!
//! Core domain types, traits, and error handling for Gantry.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across the manager-side crates.

pub mod agent;
pub mod error;
pub mod manager;
pub mod ports;

pub use agent::{AgentDescriptor, ServicePolicy, TargetState};
pub use error::{Error, Result};
pub use manager::ManagerEndpoints;
pub use ports::{QueueAdmin, RemoteExecutor, WorkerInspector, WorkerStats};
