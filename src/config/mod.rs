// ABOUTME: Agent-wide configuration: node identity, registry defaults, engine and timing knobs.
// ABOUTME: Loaded from hoist.yml and passed explicitly to the orchestrator and backend.

mod env_value;
mod init;
mod restart_policy;

pub use env_value::EnvValue;
pub use init::init_config;
pub use restart_policy::RestartPolicy;

use crate::deploy::FailurePolicy;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "hoist.yml";
pub const CONFIG_FILENAME_ALT: &str = "hoist.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hoist/config.yml";

/// Configuration shared by every deployment the agent runs.
///
/// Nothing reads this from global state; callers hand an `AgentConfig` to the
/// orchestrator and to the engine facade factory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default = "default_node_name")]
    pub node_name: String,

    #[serde(default = "default_registry")]
    pub default_registry: String,

    #[serde(default)]
    pub ingress_root_domain: Option<String>,

    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default)]
    pub docker_socket: Option<String>,

    #[serde(default = "default_deploy_timeout", with = "humantime_serde")]
    pub deploy_timeout: Duration,

    #[serde(default = "default_readiness_timeout", with = "humantime_serde")]
    pub readiness_timeout: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default)]
    pub labels: HashMap<String, String>,

    #[serde(default)]
    pub restart: RestartPolicy,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_node_name() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

fn default_registry() -> String {
    "docker.io".to_string()
}

fn default_network() -> String {
    "hoist".to_string()
}

fn default_deploy_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            node_name: default_node_name(),
            default_registry: default_registry(),
            ingress_root_domain: None,
            network: default_network(),
            docker_socket: None,
            deploy_timeout: default_deploy_timeout(),
            readiness_timeout: default_readiness_timeout(),
            poll_interval: default_poll_interval(),
            labels: HashMap::new(),
            restart: RestartPolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AgentConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AgentConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first config file found in `dir`, or defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("loading agent config from {}", path.display());
                return Self::load(path);
            }
        }

        tracing::debug!("no agent config in {}, using defaults", dir.display());
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.node_name.trim().is_empty() {
            return Err(Error::InvalidConfig("node_name cannot be empty".to_string()));
        }
        if self.network.trim().is_empty() {
            return Err(Error::InvalidConfig("network cannot be empty".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Public host name a container would be routed under, if exposure is configured.
    pub fn ingress_host(&self, container: &str) -> Option<String> {
        self.ingress_root_domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|domain| format!("{}.{}", container, domain.trim_start_matches('.')))
    }

    pub fn template() -> Self {
        AgentConfig {
            node_name: "node-1".to_string(),
            ingress_root_domain: Some("apps.example.com".to_string()),
            ..Self::default()
        }
    }
}
