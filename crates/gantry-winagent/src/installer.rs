//! Agent lifecycle operations.
//!
//! The manager drives each agent's OS service through five operations:
//! install, start, stop, restart, and uninstall. Commands reach the agent
//! host through a [`RemoteExecutor`]; starts and stops only count as done
//! once [`confirm::await_state`] sees the broker control plane agree.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use gantry_core::ports::{QueueAdmin, RemoteExecutor, WorkerInspector, WorkerStats};
use gantry_core::{AgentDescriptor, ManagerEndpoints, Result, TargetState};

use crate::confirm;
use crate::launch;
use crate::registry::OperationRegistry;

/// Service name registered with the service manager on the agent host.
pub const SERVICE_NAME: &str = "GantryAgent";

/// Where the agent package is downloaded to on the agent host.
pub const AGENT_EXEC_PATH: &str = r"C:\GantryAgent.exe";

/// Directory the package extracts into. The name is baked into the package
/// itself, so it is fixed here too.
pub const RUNTIME_DIR: &str = r"C:\GantryAgent";

/// Drives the lifecycle of agent services on remote Windows hosts.
///
/// One installer serves any number of agents; per-agent exclusion comes
/// from the shared [`OperationRegistry`].
pub struct AgentInstaller {
    executor: Arc<dyn RemoteExecutor>,
    inspector: Arc<dyn WorkerInspector>,
    queues: Arc<dyn QueueAdmin>,
    manager: ManagerEndpoints,
    registry: OperationRegistry,
    shutdown: Option<watch::Receiver<bool>>,
}

impl AgentInstaller {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        inspector: Arc<dyn WorkerInspector>,
        queues: Arc<dyn QueueAdmin>,
        manager: ManagerEndpoints,
        registry: OperationRegistry,
    ) -> Self {
        Self {
            executor,
            inspector,
            queues,
            manager,
            registry,
            shutdown: None,
        }
    }

    /// Abort confirmation waits once `shutdown` observes `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Install the agent service on the host.
    ///
    /// Downloads and extracts the agent package, registers the worker as an
    /// OS service with auto start and restart-on-failure, and writes the
    /// worker's launch parameters. The service is left stopped;
    /// [`start`](Self::start) brings it up.
    pub async fn install(&self, agent: &AgentDescriptor) -> Result<()> {
        agent.validate()?;
        let _claim = self.registry.acquire(&agent.name)?;

        if agent.delete_queues {
            self.purge_queues(agent).await;
        }

        info!(agent = %agent.name, "Installing agent");

        self.executor
            .download(&self.manager.agent_package_url(), AGENT_EXEC_PATH)
            .await?;

        debug!(agent = %agent.name, dir = RUNTIME_DIR, "Extracting agent package");
        self.executor
            .run(&format!("{AGENT_EXEC_PATH} -o{RUNTIME_DIR} -y"), true)
            .await?;

        let params = launch::launch_params(agent, &self.manager);
        self.run_cmd(&format!(
            r"{RUNTIME_DIR}\nssm\nssm.exe install {SERVICE_NAME} {RUNTIME_DIR}\Scripts\celeryd.exe {params}"
        ))
        .await?;

        let environment = launch::env_block(&self.manager);
        self.run_cmd(&format!(
            r"{RUNTIME_DIR}\nssm\nssm.exe set {SERVICE_NAME} AppEnvironmentExtra {environment}"
        ))
        .await?;

        self.run_cmd(&format!("sc config {SERVICE_NAME} start= auto"))
            .await?;
        self.run_cmd(&format!(
            "sc failure {SERVICE_NAME} reset= {reset} actions= restart/{delay}",
            reset = agent.service.failure_reset_timeout_secs,
            delay = agent.service.failure_restart_delay_ms,
        ))
        .await?;

        info!(agent = %agent.name, params = %params, "Writing launch parameters");
        self.executor
            .put(&params, &format!(r"{RUNTIME_DIR}\AppParameters"))
            .await?;

        Ok(())
    }

    /// Start the agent service and wait for its worker to come up.
    pub async fn start(&self, agent: &AgentDescriptor) -> Result<()> {
        agent.validate()?;
        let _claim = self.registry.acquire(&agent.name)?;
        self.start_service(agent).await
    }

    /// Stop the agent service and wait for its worker to go away.
    pub async fn stop(&self, agent: &AgentDescriptor) -> Result<()> {
        agent.validate()?;
        let _claim = self.registry.acquire(&agent.name)?;
        self.stop_service(agent).await
    }

    /// Stop and then start the agent service under a single claim.
    ///
    /// The start is never attempted while the stop remains unconfirmed.
    pub async fn restart(&self, agent: &AgentDescriptor) -> Result<()> {
        agent.validate()?;
        let _claim = self.registry.acquire(&agent.name)?;

        info!(agent = %agent.name, "Restarting agent");
        self.stop_service(agent).await?;
        self.start_service(agent).await
    }

    /// Remove the agent service and its files from the host.
    pub async fn uninstall(&self, agent: &AgentDescriptor) -> Result<()> {
        agent.validate()?;
        let _claim = self.registry.acquire(&agent.name)?;

        info!(agent = %agent.name, "Uninstalling agent");
        self.run_cmd(&format!(
            r"{RUNTIME_DIR}\nssm\nssm.exe remove {SERVICE_NAME} confirm"
        ))
        .await?;
        self.executor.delete(RUNTIME_DIR).await?;
        self.executor.delete(AGENT_EXEC_PATH).await?;
        Ok(())
    }

    /// Control plane statistics for the agent's worker, if it is
    /// registered.
    pub async fn worker_stats(&self, agent: &AgentDescriptor) -> Result<Option<WorkerStats>> {
        self.inspector.worker_stats(&agent.worker_id()).await
    }

    async fn start_service(&self, agent: &AgentDescriptor) -> Result<()> {
        info!(agent = %agent.name, "Starting agent");
        self.run_cmd(&format!("sc start {SERVICE_NAME}")).await?;
        info!(agent = %agent.name, service = SERVICE_NAME, "Waiting for service to start");
        self.await_state(agent, TargetState::Started).await
    }

    async fn stop_service(&self, agent: &AgentDescriptor) -> Result<()> {
        info!(agent = %agent.name, "Stopping agent");
        self.run_cmd(&format!("sc stop {SERVICE_NAME}")).await?;
        self.await_state(agent, TargetState::Stopped).await
    }

    async fn await_state(&self, agent: &AgentDescriptor, target: TargetState) -> Result<()> {
        let mut shutdown = self.shutdown.clone();
        confirm::await_state(
            self.executor.as_ref(),
            self.inspector.as_ref(),
            agent,
            target,
            shutdown.as_mut(),
        )
        .await
    }

    /// Queue deletion is best effort: failures are logged and the install
    /// carries on.
    async fn purge_queues(&self, agent: &AgentDescriptor) {
        for queue in [agent.task_queue(), agent.control_queue()] {
            debug!(agent = %agent.name, queue = %queue, "Deleting broker queue");
            if let Err(e) = self.queues.delete_queue(&queue).await {
                warn!(agent = %agent.name, queue = %queue, error = %e, "Queue deletion failed, continuing");
            }
        }
    }

    async fn run_cmd(&self, command: &str) -> Result<String> {
        self.executor.run(command, false).await
    }
}
