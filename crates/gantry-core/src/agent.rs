//! Agent descriptor types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Prefix joining an agent name to its worker identifier on the control plane.
const WORKER_ID_PREFIX: &str = "celery";

/// Everything the manager needs to know to drive one agent's lifecycle.
///
/// The name doubles as the agent's task queue name and, prefixed, as its
/// worker identifier, so it must be unique across the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Agent name. Also the broker queue the worker consumes from.
    pub name: String,
    /// Lower autoscale bound for the worker's process pool.
    #[serde(default = "default_min_workers")]
    pub min_workers: u32,
    /// Upper autoscale bound for the worker's process pool.
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
    /// OS service failure-recovery settings.
    #[serde(default)]
    pub service: ServicePolicy,
    /// How long to wait for the worker to come up after a start.
    #[serde(default = "default_state_timeout")]
    pub start_timeout_secs: u64,
    /// Pause between liveness polls while waiting for a start.
    #[serde(default = "default_poll_interval")]
    pub start_interval_secs: u64,
    /// How long to wait for the worker to go away after a stop.
    #[serde(default = "default_state_timeout")]
    pub stop_timeout_secs: u64,
    /// Pause between liveness polls while waiting for a stop.
    #[serde(default = "default_poll_interval")]
    pub stop_interval_secs: u64,
    /// Delete the agent's broker queues before installing.
    ///
    /// Set this when the agent host can be re-created under the same name
    /// (auto-heal), which would otherwise hand stale queues to the fresh
    /// worker.
    #[serde(default)]
    pub delete_queues: bool,
}

impl AgentDescriptor {
    /// Create a descriptor with default tuning for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_workers: default_min_workers(),
            max_workers: default_max_workers(),
            service: ServicePolicy::default(),
            start_timeout_secs: default_state_timeout(),
            start_interval_secs: default_poll_interval(),
            stop_timeout_secs: default_state_timeout(),
            stop_interval_secs: default_poll_interval(),
            delete_queues: false,
        }
    }

    /// Load a descriptor from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Identifier the worker registers on the control plane.
    pub fn worker_id(&self) -> String {
        format!("{WORKER_ID_PREFIX}.{}", self.name)
    }

    /// Broker queue the worker consumes tasks from.
    pub fn task_queue(&self) -> String {
        self.name.clone()
    }

    /// Broker queue the control plane addresses the worker on.
    pub fn control_queue(&self) -> String {
        format!("{}.celery.pidbox", self.worker_id())
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn start_interval(&self) -> Duration {
        Duration::from_secs(self.start_interval_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn stop_interval(&self) -> Duration {
        Duration::from_secs(self.stop_interval_secs)
    }

    /// Reject descriptors that cannot drive a meaningful operation.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("agent name must not be empty".into()));
        }
        if self.start_interval_secs == 0 || self.stop_interval_secs == 0 {
            return Err(Error::Validation(
                "poll interval must be at least one second".into(),
            ));
        }
        if self.start_timeout_secs < self.start_interval_secs {
            return Err(Error::Validation(format!(
                "start timeout ({}s) is shorter than the start poll interval ({}s)",
                self.start_timeout_secs, self.start_interval_secs
            )));
        }
        if self.stop_timeout_secs < self.stop_interval_secs {
            return Err(Error::Validation(format!(
                "stop timeout ({}s) is shorter than the stop poll interval ({}s)",
                self.stop_timeout_secs, self.stop_interval_secs
            )));
        }
        Ok(())
    }
}

/// OS-level failure recovery for the agent service.
///
/// Applied with `sc failure` at install time: the service restarts itself
/// after a crash, and its failure counter resets once it has stayed up for
/// the reset timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePolicy {
    /// Seconds of uptime after which the service failure counter resets.
    #[serde(default = "default_failure_reset_timeout")]
    pub failure_reset_timeout_secs: u64,
    /// Milliseconds the service manager waits before restarting a failed
    /// service.
    #[serde(default = "default_failure_restart_delay")]
    pub failure_restart_delay_ms: u64,
}

impl ServicePolicy {
    pub fn failure_reset_timeout(&self) -> Duration {
        Duration::from_secs(self.failure_reset_timeout_secs)
    }

    pub fn failure_restart_delay(&self) -> Duration {
        Duration::from_millis(self.failure_restart_delay_ms)
    }
}

impl Default for ServicePolicy {
    fn default() -> Self {
        Self {
            failure_reset_timeout_secs: default_failure_reset_timeout(),
            failure_restart_delay_ms: default_failure_restart_delay(),
        }
    }
}

/// Liveness state a confirmation wait drives toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// The worker is registered on the control plane.
    Started,
    /// The worker is gone from the control plane.
    Stopped,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetState::Started => write!(f, "started"),
            TargetState::Stopped => write!(f, "stopped"),
        }
    }
}

fn default_min_workers() -> u32 {
    2
}

fn default_max_workers() -> u32 {
    5
}

fn default_state_timeout() -> u64 {
    15
}

fn default_poll_interval() -> u64 {
    1
}

fn default_failure_reset_timeout() -> u64 {
    60
}

fn default_failure_restart_delay() -> u64 {
    5000
}
