//! State confirmation for start and stop transitions.
//!
//! `sc start` and `sc stop` return as soon as the service manager accepts
//! the request, well before the worker has actually registered on (or left)
//! the broker control plane. Every start and stop therefore issues the OS
//! command first and then waits here until the control plane agrees or the
//! configured budget runs out.
//!
//! A worker that dies in its own error handler never shows up on the
//! control plane at all. Its crash handler writes the error report to a
//! well-known file on the agent host; that file is checked before the wait
//! begins and again when the budget runs out, and short-circuits the
//! result with the captured report.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use gantry_core::ports::{RemoteExecutor, WorkerInspector, WorkerStats};
use gantry_core::{AgentDescriptor, Error, Result, TargetState};

use crate::installer::RUNTIME_DIR;

/// File the worker's crash handler writes on an uncaught error.
const AGENT_ERROR_FILE: &str = "celery_error.out";

/// Remote path of the worker's crash report.
///
/// Built by string formatting rather than path joining: the manager may
/// run on any OS while the agent host is always Windows.
pub fn error_file_path() -> String {
    format!(r"{RUNTIME_DIR}\{AGENT_ERROR_FILE}")
}

/// Wait until the control plane confirms `target` for `agent`.
///
/// Polls immediately, then once per configured interval, until the
/// configured timeout has elapsed. A crash report on the agent host fails
/// the wait with the report's content. A failed control plane query
/// confirms nothing either way and is retried on the next poll.
///
/// `cancel` aborts the wait between polls once it observes `true`.
pub async fn await_state(
    executor: &dyn RemoteExecutor,
    inspector: &dyn WorkerInspector,
    agent: &AgentDescriptor,
    target: TargetState,
    mut cancel: Option<&mut watch::Receiver<bool>>,
) -> Result<()> {
    verify_no_agent_fault(executor).await?;

    let (timeout, interval) = match target {
        TargetState::Started => (agent.start_timeout(), agent.start_interval()),
        TargetState::Stopped => (agent.stop_timeout(), agent.stop_interval()),
    };
    let worker_id = agent.worker_id();
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        match inspector.worker_stats(&worker_id).await {
            Ok(stats) if reached(target, stats.as_ref()) => {
                debug!(worker = %worker_id, state = %target, "Worker reached target state");
                return Ok(());
            }
            Ok(_) => {
                debug!(worker = %worker_id, state = %target, "Worker not in target state yet");
            }
            Err(e) => {
                // A failed query confirms neither presence nor absence.
                // Keep polling; persistent failure ends in the timeout
                // below.
                warn!(worker = %worker_id, error = %e, "Control plane query failed, retrying");
            }
        }
        pause(interval, cancel.as_deref_mut()).await?;
    }

    verify_no_agent_fault(executor).await?;
    Err(Error::ConfirmationTimeout {
        target,
        waited_secs: timeout.as_secs(),
    })
}

fn reached(target: TargetState, stats: Option<&WorkerStats>) -> bool {
    match target {
        TargetState::Started => stats.is_some(),
        TargetState::Stopped => stats.is_none(),
    }
}

/// Sleep for one poll interval, or bail out early on cancellation.
async fn pause(interval: Duration, cancel: Option<&mut watch::Receiver<bool>>) -> Result<()> {
    let Some(rx) = cancel else {
        sleep(interval).await;
        return Ok(());
    };
    tokio::select! {
        () = sleep(interval) => Ok(()),
        () = cancelled(rx) => Err(Error::Cancelled),
    }
}

/// Resolves once the channel reports `true`. A dropped sender can no
/// longer request cancellation, so that case parks forever instead.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Fail if the worker left a crash report on the agent host.
///
/// The report is deleted before it is surfaced, so an error handled here
/// cannot fire again on the next operation.
pub(crate) async fn verify_no_agent_fault(executor: &dyn RemoteExecutor) -> Result<()> {
    let path = error_file_path();
    if !executor.exists(&path).await? {
        return Ok(());
    }
    let report = executor.read(&path).await?;
    executor.delete(&path).await?;
    warn!(path = %path, "Agent left a crash report");
    Err(Error::AgentFault(report))
}
