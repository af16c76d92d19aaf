// ABOUTME: Inbound deployment request: image, registry credentials and workload configuration.
// ABOUTME: Requests are immutable once parsed; validation happens before any phase runs.

mod describe;
mod piped;
mod runtime_config;

pub use piped::{EnvEntry, MountEntry, parse_env_list, parse_mount};
pub use runtime_config::{RuntimeConfig, appconfig_env};

use crate::config::EnvValue;
use crate::types::{ContainerName, ContainerNameError, Principal, RequestId};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors from parsing or validating a deployment request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("image name cannot be empty")]
    EmptyImageName,

    #[error("invalid image name: {0}")]
    InvalidImageName(String),

    #[error("invalid container name: {0}")]
    InvalidContainerName(#[from] ContainerNameError),

    #[error("invalid environment entry: {0}")]
    InvalidEnvironment(String),

    #[error("invalid mount entry: {0}")]
    InvalidMount(String),

    #[error("invalid runtime config: {0}")]
    InvalidRuntimeConfig(String),

    #[error("failed to parse request: {0}")]
    Parse(String),
}

/// Everything needed to deploy one container image.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentRequest {
    pub id: RequestId,

    #[serde(default)]
    pub registry: Option<String>,

    #[serde(default)]
    pub registry_auth: Option<RegistryAuth>,

    pub image_name: String,

    #[serde(default)]
    pub tag: String,

    #[serde(default)]
    pub instance_config: InstanceConfig,

    pub container_config: ContainerConfig,

    #[serde(default)]
    pub runtime_config: RuntimeConfig,

    #[serde(default)]
    pub issuer: Principal,
}

/// Credentials for a private registry.
#[derive(Clone, Default, Deserialize)]
pub struct RegistryAuth {
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: EnvValue,
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &format_args!("{}", self.password))
            .finish()
    }
}

/// Settings shared by every container of one deployed instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceConfig {
    /// Namespace for the instance's containers and network.
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub mount_path: Option<String>,

    /// Piped `KEY|VALUE` entries applied to every container.
    #[serde(default)]
    pub environment: Vec<String>,

    #[serde(default)]
    pub repository_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
    pub name: String,

    /// Overrides the instance prefix for this container.
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub ports: Vec<Port>,

    /// Piped `name|/path` entries.
    #[serde(default)]
    pub mounts: Vec<String>,

    /// Piped `KEY|VALUE` entries.
    #[serde(default)]
    pub environments: Vec<String>,

    #[serde(default)]
    pub network_mode: Option<String>,

    #[serde(default)]
    pub runtime_config_type: Option<RuntimeConfigType>,

    #[serde(default)]
    pub expose: Option<Expose>,

    #[serde(default)]
    pub config_container: Option<ConfigContainer>,

    #[serde(default)]
    pub user: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Port {
    /// Port the container listens on.
    pub internal: u16,
    /// Host port to publish on, if any.
    #[serde(default)]
    pub external: Option<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Expose {
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub tls: bool,
}

/// A helper image whose files are copied into a volume before the workload starts.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigContainer {
    pub image: String,
    pub volume: String,
    pub path: String,
    #[serde(default)]
    pub keep_files: bool,
}

/// How the runtime config payload is turned into container settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeConfigType {
    /// Nested JSON flattened into `Section__Key` environment variables.
    DotnetAppconfig,
}

impl fmt::Display for RuntimeConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeConfigType::DotnetAppconfig => f.write_str("dotnet_appconfig"),
        }
    }
}

impl DeploymentRequest {
    /// Minimal request for `image_name:tag` deploying `container`.
    pub fn new(
        id: RequestId,
        image_name: impl Into<String>,
        tag: impl Into<String>,
        container: ContainerConfig,
    ) -> Self {
        DeploymentRequest {
            id,
            registry: None,
            registry_auth: None,
            image_name: image_name.into(),
            tag: tag.into(),
            instance_config: InstanceConfig::default(),
            container_config: container,
            runtime_config: RuntimeConfig::default(),
            issuer: Principal::default(),
        }
    }

    /// Parse a request from YAML. JSON is accepted as well, being a YAML subset.
    pub fn from_yaml(yaml: &str) -> Result<Self, RequestError> {
        let request: DeploymentRequest =
            serde_yaml::from_str(yaml).map_err(|e| RequestError::Parse(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Check the fields the pipeline cannot start without.
    pub fn validate(&self) -> Result<(), RequestError> {
        let image = self.image_name.trim();
        if image.is_empty() {
            return Err(RequestError::EmptyImageName);
        }
        if image.contains(char::is_whitespace) || image.contains(':') || image.contains('@') {
            return Err(RequestError::InvalidImageName(self.image_name.clone()));
        }
        self.container_name()?;
        Ok(())
    }

    /// Image name with the instance's repository prefix applied.
    pub fn image_path(&self) -> String {
        let name = self.image_name.trim();
        let prefix = self
            .instance_config
            .repository_prefix
            .as_deref()
            .map(|p| p.trim().trim_matches('/'))
            .unwrap_or_default();
        if prefix.is_empty() || name.starts_with(&format!("{}/", prefix)) {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        }
    }

    /// Name the workload container gets on the backend.
    pub fn container_name(&self) -> Result<ContainerName, RequestError> {
        Ok(ContainerName::prefixed(
            self.container_config.effective_prefix(&self.instance_config),
            &self.container_config.name,
        )?)
    }
}

impl ContainerConfig {
    pub fn named(name: impl Into<String>) -> Self {
        ContainerConfig {
            name: name.into(),
            prefix: None,
            ports: Vec::new(),
            mounts: Vec::new(),
            environments: Vec::new(),
            network_mode: None,
            runtime_config_type: None,
            expose: None,
            config_container: None,
            user: None,
        }
    }

    /// Container prefix if set, otherwise the instance prefix.
    pub fn effective_prefix<'a>(&'a self, instance: &'a InstanceConfig) -> &'a str {
        self.prefix
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&instance.prefix)
    }

    pub fn is_public(&self) -> bool {
        self.expose.is_some_and(|e| e.public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_id() -> RequestId {
        RequestId::new("req-1").unwrap()
    }

    #[test]
    fn container_prefix_overrides_instance_prefix() {
        let mut request =
            DeploymentRequest::new(request_id(), "svc", "v1", ContainerConfig::named("api"));
        request.instance_config.prefix = "prod".to_string();
        assert_eq!(request.container_name().unwrap().as_str(), "prod-api");

        request.container_config.prefix = Some("canary".to_string());
        assert_eq!(request.container_name().unwrap().as_str(), "canary-api");
    }

    #[test]
    fn repository_prefix_is_applied_once() {
        let mut request =
            DeploymentRequest::new(request_id(), " svc ", "v1", ContainerConfig::named("api"));
        assert_eq!(request.image_path(), "svc");

        request.instance_config.repository_prefix = Some("acme/".to_string());
        assert_eq!(request.image_path(), "acme/svc");

        request.image_name = "acme/svc".to_string();
        assert_eq!(request.image_path(), "acme/svc");

        request.instance_config.repository_prefix = Some("  ".to_string());
        assert_eq!(request.image_path(), "acme/svc");
    }

    #[test]
    fn validate_rejects_tagged_image_name() {
        let request =
            DeploymentRequest::new(request_id(), "svc:v1", "v1", ContainerConfig::named("api"));
        assert!(matches!(
            request.validate(),
            Err(RequestError::InvalidImageName(_))
        ));
    }

    #[test]
    fn validate_rejects_blank_image_name() {
        let request =
            DeploymentRequest::new(request_id(), "  ", "v1", ContainerConfig::named("api"));
        assert!(matches!(request.validate(), Err(RequestError::EmptyImageName)));
    }

    #[test]
    fn registry_auth_debug_hides_password() {
        let auth = RegistryAuth {
            name: "private".to_string(),
            url: "registry.example.com".to_string(),
            user: "deploy".to_string(),
            password: EnvValue::Literal("hunter2".to_string()),
        };
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
