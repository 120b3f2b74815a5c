//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the lifecycle operations and
//! the platform services that carry them out: command execution on the
//! agent host and the message broker's control plane.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Executes file and command operations against one agent host.
///
/// Implementations hold the connection details for a single host; the
/// lifecycle operations only ever speak in remote paths and command lines.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Download `url` to `dest` on the agent host.
    async fn download(&self, url: &str, dest: &str) -> Result<()>;

    /// Write `content` to the file at `dest` on the agent host.
    async fn put(&self, content: &str, dest: &str) -> Result<()>;

    /// Run a command on the agent host and return its output.
    ///
    /// `quiet` suppresses output logging for commands whose output is
    /// large and uninteresting, such as archive extraction.
    async fn run(&self, command: &str, quiet: bool) -> Result<String>;

    /// Delete a file or directory tree on the agent host.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check whether a path exists on the agent host.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Read the contents of a file on the agent host.
    async fn read(&self, path: &str) -> Result<String>;
}

/// Worker liveness as reported by the broker's control plane.
#[async_trait]
pub trait WorkerInspector: Send + Sync {
    /// Query the control plane for a worker's statistics.
    ///
    /// `Ok(None)` means the control plane answered and no worker with this
    /// identifier is registered. `Err` means the query itself failed and
    /// says nothing about the worker either way; callers must not read it
    /// as presence or absence.
    async fn worker_stats(&self, worker_id: &str) -> Result<Option<WorkerStats>>;
}

/// Broker queue administration.
#[async_trait]
pub trait QueueAdmin: Send + Sync {
    /// Delete a queue from the broker. Deleting a queue that does not
    /// exist is not an error.
    async fn delete_queue(&self, queue: &str) -> Result<()>;
}

/// Statistics record the control plane reports for one live worker.
///
/// Presence of the record is what liveness checks go on; the fields are
/// informational and whatever the worker chose to report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// OS process id of the worker's main process.
    pub pid: Option<u32>,
    /// Current size of the worker's process pool.
    pub pool_size: Option<u32>,
    /// Seconds since the worker came up.
    pub uptime_secs: Option<u64>,
}
