// ABOUTME: Narrow capability trait over a Docker-compatible engine, plus its value types.
// ABOUTME: Sealed so only in-crate engines (bollard and test fakes) implement it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::config::RestartPolicy;
use crate::request::MountEntry;
use crate::types::{ContainerId, ImageLocator, NetworkId};

pub(crate) mod sealed {
    /// Keeps `EngineOps` implementable only inside this crate.
    pub trait Sealed {}
}

/// Errors from engine calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine unreachable: {0}")]
    Unreachable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("image pull failed: {0}")]
    PullFailed(String),

    #[error("engine error: {0}")]
    Api(String),
}

/// Health as reported by the engine's healthcheck, if the image has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Health {
    #[default]
    None,
    Starting,
    Healthy,
    Unhealthy,
}

/// Snapshot of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub id: ContainerId,
    pub name: String,
    pub running: bool,
    pub health: Health,
    pub exit_code: Option<i64>,
    pub labels: HashMap<String, String>,
    /// Names of the networks the container is attached to.
    pub networks: Vec<String>,
}

impl ContainerStatus {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Registry credentials for a pull.
#[derive(Clone, PartialEq, Eq)]
pub struct PullCredentials {
    pub username: String,
    pub password: String,
    pub server: String,
}

impl fmt::Debug for PullCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}

/// Container port, optionally published on a host port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    pub container_port: u16,
    pub host_port: Option<u16>,
}

/// Everything the engine needs to create one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub name: String,
    /// Full image reference, `repository:tag`.
    pub image: String,
    /// `KEY=VALUE` entries.
    pub env: Vec<String>,
    pub labels: HashMap<String, String>,
    pub ports: Vec<PortBinding>,
    pub mounts: Vec<MountEntry>,
    pub user: Option<String>,
    pub restart: RestartPolicy,
    pub network_mode: Option<String>,
}

impl WorkloadSpec {
    /// Bare container of `image`, no ports, env or restart.
    pub fn helper(name: impl Into<String>, image: impl Into<String>) -> Self {
        WorkloadSpec {
            name: name.into(),
            image: image.into(),
            env: Vec::new(),
            labels: HashMap::new(),
            ports: Vec::new(),
            mounts: Vec::new(),
            user: None,
            restart: RestartPolicy::No,
            network_mode: None,
        }
    }
}

/// Engine operations the facade relies on.
#[async_trait]
pub trait EngineOps: sealed::Sealed + Send + Sync {
    async fn ping(&self) -> Result<(), EngineError>;

    /// Container with exactly this name, running or not.
    async fn find_container(&self, name: &str) -> Result<Option<ContainerStatus>, EngineError>;

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerStatus, EngineError>;

    async fn network_exists(&self, name: &str) -> Result<bool, EngineError>;

    async fn create_network(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> Result<NetworkId, EngineError>;

    async fn pull_image(
        &self,
        image: &ImageLocator,
        credentials: Option<&PullCredentials>,
    ) -> Result<(), EngineError>;

    async fn create_container(&self, spec: &WorkloadSpec) -> Result<ContainerId, EngineError>;

    async fn start_container(&self, id: &ContainerId) -> Result<(), EngineError>;

    async fn stop_container(&self, id: &ContainerId, timeout: Duration) -> Result<(), EngineError>;

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), EngineError>;

    /// Remove a named volume. A missing volume is not an error.
    async fn remove_volume(&self, name: &str) -> Result<(), EngineError>;

    async fn connect_to_network(
        &self,
        container: &ContainerId,
        network: &str,
        aliases: &[String],
    ) -> Result<(), EngineError>;
}
