//! In-process exclusion of concurrent operations on one agent.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gantry_core::{Error, Result};

/// Tracks agent names with a lifecycle operation in flight.
///
/// An agent's name doubles as its queue names and its service identity on
/// the host, so two interleaved operations on the same name would corrupt
/// each other's remote state. The registry rejects the second operation up
/// front instead of letting the command sequences race.
///
/// Clones share one claim set; every [`AgentInstaller`] in the process
/// must be built from the same registry. Exclusion across manager
/// processes is owned by the orchestration layer, not here.
///
/// [`AgentInstaller`]: crate::installer::AgentInstaller
#[derive(Clone, Default)]
pub struct OperationRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for one operation. The claim holds until the guard
    /// drops.
    pub fn acquire(&self, name: &str) -> Result<OperationGuard> {
        let mut active = self.lock();
        if !active.insert(name.to_string()) {
            return Err(Error::ConcurrentOperation(name.to_string()));
        }
        Ok(OperationGuard {
            registry: self.clone(),
            name: name.to_string(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its agent name when dropped.
#[must_use = "the claim is released as soon as the guard drops"]
pub struct OperationGuard {
    registry: OperationRegistry,
    name: String,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.name);
    }
}
