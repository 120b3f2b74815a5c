//! Manager endpoints as seen by agents.

use serde::{Deserialize, Serialize};
use std::env;

use crate::{Error, Result};

/// Environment variable naming the manager's private IP address.
pub const MANAGER_IP_KEY: &str = "GANTRY_MANAGER_IP";

/// Environment variable naming the manager's file server URL.
pub const FILE_SERVER_URL_KEY: &str = "GANTRY_FILE_SERVER_URL";

/// Environment variable naming the file server's blueprints root URL.
pub const BLUEPRINTS_ROOT_URL_KEY: &str = "GANTRY_BLUEPRINTS_ROOT_URL";

/// Environment variable naming the manager's REST service port.
pub const REST_PORT_KEY: &str = "GANTRY_MANAGER_REST_PORT";

/// Location of the Windows agent package on the file server, relative to
/// its root. Fixed by the packaging process.
pub const AGENT_PACKAGE_PATH: &str = "packages/agents/GantryWindowsAgent.exe";

/// Addresses an agent uses to reach back to its manager.
///
/// Resolved once on the manager and exported into the agent service's
/// environment under the same variable names, so code on both sides reads
/// the same keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerEndpoints {
    /// Manager IP address, reachable from agent hosts.
    pub ip: String,
    /// Base URL of the manager's file server.
    pub file_server_url: String,
    /// URL under which deployed blueprints are served.
    pub blueprints_root_url: String,
    /// Port of the manager's REST service.
    pub rest_port: u16,
}

impl ManagerEndpoints {
    /// Resolve endpoints from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| env::var(key).ok())
    }

    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require =
            |key: &str| lookup(key).ok_or_else(|| Error::Config(format!("{key} is not set")));

        let ip = require(MANAGER_IP_KEY)?;
        let file_server_url = require(FILE_SERVER_URL_KEY)?;
        let blueprints_root_url = require(BLUEPRINTS_ROOT_URL_KEY)?;
        let rest_port = require(REST_PORT_KEY)?;
        let rest_port = rest_port
            .parse()
            .map_err(|_| Error::Config(format!("{REST_PORT_KEY} is not a valid port: {rest_port}")))?;

        Ok(Self {
            ip,
            file_server_url,
            blueprints_root_url,
            rest_port,
        })
    }

    /// Download URL of the Windows agent package.
    pub fn agent_package_url(&self) -> String {
        format!(
            "{}/{AGENT_PACKAGE_PATH}",
            self.file_server_url.trim_end_matches('/')
        )
    }
}
