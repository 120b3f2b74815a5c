//! Scripted test doubles for the gantry-core ports.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use gantry_core::ports::{QueueAdmin, RemoteExecutor, WorkerInspector, WorkerStats};
use gantry_core::{Error, ManagerEndpoints, Result};

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,gantry_winagent=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Endpoints of the manager every test agent reports back to.
pub fn manager_endpoints() -> ManagerEndpoints {
    ManagerEndpoints {
        ip: "10.0.4.47".to_string(),
        file_server_url: "http://10.0.4.47:53229".to_string(),
        blueprints_root_url: "http://10.0.4.47:53229/blueprints".to_string(),
        rest_port: 8100,
    }
}

/// Remote executor that records every call and serves an in-memory
/// filesystem.
#[derive(Default)]
pub struct MockExecutor {
    pub commands: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<(String, String)>>,
    pub uploads: Mutex<Vec<(String, String)>>,
    pub deleted: Mutex<Vec<String>>,
    pub files: Mutex<HashMap<String, String>>,
    fail_matching: Mutex<Option<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any command containing `needle`.
    pub fn fail_command_containing(&self, needle: &str) {
        *self.fail_matching.lock().unwrap() = Some(needle.to_string());
    }

    /// Put a file on the fake host.
    pub fn plant_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    pub fn command_log(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    async fn download(&self, url: &str, dest: &str) -> Result<()> {
        self.downloads
            .lock()
            .unwrap()
            .push((url.to_string(), dest.to_string()));
        Ok(())
    }

    async fn put(&self, content: &str, dest: &str) -> Result<()> {
        self.uploads
            .lock()
            .unwrap()
            .push((dest.to_string(), content.to_string()));
        self.plant_file(dest, content);
        Ok(())
    }

    async fn run(&self, command: &str, _quiet: bool) -> Result<String> {
        self.commands.lock().unwrap().push(command.to_string());
        if let Some(needle) = self.fail_matching.lock().unwrap().as_deref() {
            if command.contains(needle) {
                return Err(Error::RemoteCommand(format!("{command}: access is denied")));
            }
        }
        Ok(String::new())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(path.to_string());
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn read(&self, path: &str) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::RemoteCommand(format!("no such file: {path}")))
    }
}

/// One scripted control plane reply.
#[derive(Debug, Clone, Copy)]
pub enum Probe {
    /// Worker registered; stats come back.
    Up,
    /// Control plane answered, worker unknown.
    Down,
    /// The query itself failed.
    Broken,
}

/// Control plane stub that replays a scripted sequence of replies and then
/// repeats the fallback disposition forever.
pub struct MockInspector {
    script: Mutex<VecDeque<Probe>>,
    fallback: Probe,
    pub queries: Mutex<Vec<String>>,
}

impl MockInspector {
    pub fn scripted(script: impl IntoIterator<Item = Probe>, fallback: Probe) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn always_up() -> Self {
        Self::scripted([], Probe::Up)
    }

    pub fn always_down() -> Self {
        Self::scripted([], Probe::Down)
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkerInspector for MockInspector {
    async fn worker_stats(&self, worker_id: &str) -> Result<Option<WorkerStats>> {
        self.queries.lock().unwrap().push(worker_id.to_string());
        let probe = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match probe {
            Probe::Up => Ok(Some(WorkerStats {
                pid: Some(4412),
                pool_size: Some(2),
                uptime_secs: Some(8),
            })),
            Probe::Down => Ok(None),
            Probe::Broken => Err(Error::ControlPlane("connection refused".to_string())),
        }
    }
}

/// Queue admin stub; the failing variant errors every deletion.
#[derive(Default)]
pub struct MockQueueAdmin {
    pub deleted: Mutex<Vec<String>>,
    fail: bool,
}

impl MockQueueAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            deleted: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl QueueAdmin for MockQueueAdmin {
    async fn delete_queue(&self, queue: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(queue.to_string());
        if self.fail {
            return Err(Error::QueueDelete(format!("{queue}: broker unavailable")));
        }
        Ok(())
    }
}
