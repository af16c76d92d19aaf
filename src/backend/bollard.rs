// ABOUTME: Bollard-based engine implementation.
// ABOUTME: Talks to Docker (or Podman's Docker-compatible API) over a unix socket.

use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerCreateBody, EndpointSettings, HostConfig, Mount, MountTypeEnum,
    PortBinding as EnginePortBinding, RestartPolicy as EngineRestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, InspectNetworkOptions,
    RemoveContainerOptions, RemoveVolumeOptions, StartContainerOptions, StopContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::{AgentConfig, RestartPolicy};
use crate::types::{ContainerId, ImageLocator, NetworkId};

use super::engine::{
    ContainerStatus, EngineError, EngineOps, Health, PullCredentials, WorkloadSpec, sealed::Sealed,
};

const CONNECT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn status_code(e: &bollard::errors::Error) -> Option<u16> {
    match e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

fn map_not_found(e: bollard::errors::Error, what: &str) -> EngineError {
    match status_code(&e) {
        Some(404) => EngineError::NotFound(what.to_string()),
        _ => EngineError::Api(e.to_string()),
    }
}

fn map_create_error(e: bollard::errors::Error, name: &str) -> EngineError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => EngineError::ImageNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 409 =>
        {
            EngineError::Conflict(format!("container {} already exists", name))
        }
        _ => EngineError::Api(e.to_string()),
    }
}

fn map_network_error(e: bollard::errors::Error, network: &str) -> EngineError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            EngineError::NotFound(format!("network {}", network))
        }
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 || *status_code == 403 => EngineError::Conflict(message.clone()),
        _ => EngineError::Api(e.to_string()),
    }
}

// =============================================================================
// BollardEngine
// =============================================================================

/// Engine implementation using bollard.
pub struct BollardEngine {
    client: Docker,
}

impl BollardEngine {
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect using the configured socket, or the engine's local defaults
    /// (`DOCKER_HOST`, then `/var/run/docker.sock`).
    pub fn connect(config: &AgentConfig) -> Result<Self, EngineError> {
        let client = match config.docker_socket.as_deref() {
            Some(socket) => Docker::connect_with_unix(
                socket,
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| EngineError::Unreachable(e.to_string()))?;

        Ok(Self::new(client))
    }
}

fn restart_policy(policy: RestartPolicy) -> EngineRestartPolicy {
    let (name, maximum_retry_count) = match policy {
        RestartPolicy::No => (RestartPolicyNameEnum::NO, None),
        RestartPolicy::Always => (RestartPolicyNameEnum::ALWAYS, None),
        RestartPolicy::UnlessStopped => (RestartPolicyNameEnum::UNLESS_STOPPED, None),
        RestartPolicy::OnFailure { max_retries } => (
            RestartPolicyNameEnum::ON_FAILURE,
            max_retries.map(i64::from),
        ),
    };
    EngineRestartPolicy {
        name: Some(name),
        maximum_retry_count,
    }
}

fn container_body(spec: &WorkloadSpec) -> ContainerCreateBody {
    let mut host_config = HostConfig {
        restart_policy: Some(restart_policy(spec.restart)),
        network_mode: spec.network_mode.clone(),
        ..Default::default()
    };

    // Absolute sources are host paths; anything else is a named volume.
    let mounts: Vec<Mount> = spec
        .mounts
        .iter()
        .map(|m| Mount {
            source: Some(m.source.clone()),
            target: Some(m.target.clone()),
            typ: Some(if m.source.starts_with('/') {
                MountTypeEnum::BIND
            } else {
                MountTypeEnum::VOLUME
            }),
            read_only: Some(m.read_only),
            ..Default::default()
        })
        .collect();
    if !mounts.is_empty() {
        host_config.mounts = Some(mounts);
    }

    let mut port_bindings: HashMap<String, Option<Vec<EnginePortBinding>>> = HashMap::new();
    let mut exposed_ports: Vec<String> = Vec::new();
    for port in &spec.ports {
        let key = format!("{}/tcp", port.container_port);
        exposed_ports.push(key.clone());
        if let Some(host_port) = port.host_port {
            port_bindings.insert(
                key,
                Some(vec![EnginePortBinding {
                    host_ip: None,
                    host_port: Some(host_port.to_string()),
                }]),
            );
        }
    }
    if !port_bindings.is_empty() {
        host_config.port_bindings = Some(port_bindings);
    }

    // User-defined networks get the container name as an alias.
    let networking_config = spec
        .network_mode
        .as_ref()
        .filter(|mode| !super::is_engine_network_mode(mode))
        .map(|network| {
            let mut endpoints: HashMap<String, EndpointSettings> = HashMap::new();
            endpoints.insert(
                network.clone(),
                EndpointSettings {
                    aliases: Some(vec![spec.name.clone()]),
                    ..Default::default()
                },
            );
            bollard::models::NetworkingConfig {
                endpoints_config: Some(endpoints),
            }
        });

    ContainerCreateBody {
        image: Some(spec.image.clone()),
        env: if spec.env.is_empty() {
            None
        } else {
            Some(spec.env.clone())
        },
        labels: if spec.labels.is_empty() {
            None
        } else {
            Some(spec.labels.clone())
        },
        user: spec.user.clone(),
        host_config: Some(host_config),
        exposed_ports: if exposed_ports.is_empty() {
            None
        } else {
            Some(exposed_ports)
        },
        networking_config,
        ..Default::default()
    }
}

impl Sealed for BollardEngine {}

#[async_trait]
impl EngineOps for BollardEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.client
            .ping()
            .await
            .map_err(|e| EngineError::Unreachable(e.to_string()))?;
        Ok(())
    }

    async fn find_container(&self, name: &str) -> Result<Option<ContainerStatus>, EngineError> {
        // Inspect resolves names as well as ids.
        match self.inspect_container(&ContainerId::new(name)).await {
            Ok(status) => Ok(Some(status)),
            Err(EngineError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerStatus, EngineError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_not_found(e, &format!("container {}", id)))?;

        let state = details.state.as_ref();
        let health = state
            .and_then(|s| s.health.as_ref())
            .and_then(|h| h.status)
            .map(|s| match s {
                bollard::models::HealthStatusEnum::STARTING => Health::Starting,
                bollard::models::HealthStatusEnum::HEALTHY => Health::Healthy,
                bollard::models::HealthStatusEnum::UNHEALTHY => Health::Unhealthy,
                _ => Health::None,
            })
            .unwrap_or_default();

        let networks = details
            .network_settings
            .as_ref()
            .and_then(|n| n.networks.as_ref())
            .map(|nets| nets.keys().cloned().collect())
            .unwrap_or_default();

        Ok(ContainerStatus {
            id: ContainerId::new(details.id.clone().unwrap_or_else(|| id.to_string())),
            name: details
                .name
                .as_deref()
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            running: state.and_then(|s| s.running).unwrap_or(false),
            health,
            exit_code: state.and_then(|s| s.exit_code),
            labels: details
                .config
                .and_then(|c| c.labels)
                .unwrap_or_default(),
            networks,
        })
    }

    async fn network_exists(&self, name: &str) -> Result<bool, EngineError> {
        match self
            .client
            .inspect_network(name, None::<InspectNetworkOptions>)
            .await
        {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(EngineError::Api(e.to_string())),
        }
    }

    async fn create_network(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> Result<NetworkId, EngineError> {
        let request = bollard::models::NetworkCreateRequest {
            name: name.to_string(),
            driver: Some("bridge".to_string()),
            labels: if labels.is_empty() {
                None
            } else {
                Some(labels.clone())
            },
            ..Default::default()
        };

        let response = self
            .client
            .create_network(request)
            .await
            .map_err(|e| map_network_error(e, name))?;

        Ok(NetworkId::new(response.id))
    }

    async fn pull_image(
        &self,
        image: &ImageLocator,
        credentials: Option<&PullCredentials>,
    ) -> Result<(), EngineError> {
        let opts = CreateImageOptions {
            from_image: Some(image.repository()),
            tag: Some(image.effective_tag().to_string()),
            ..Default::default()
        };

        let credentials = credentials.map(|c| bollard::auth::DockerCredentials {
            username: Some(c.username.clone()),
            password: Some(c.password.clone()),
            serveraddress: Some(c.server.clone()),
            ..Default::default()
        });

        // Pull returns a stream of progress updates; the first error aborts it.
        let mut stream = self.client.create_image(Some(opts), None, credentials);
        while let Some(result) = stream.next().await {
            result.map_err(|e| EngineError::PullFailed(format!("{}: {}", image, e)))?;
        }

        Ok(())
    }

    async fn create_container(&self, spec: &WorkloadSpec) -> Result<ContainerId, EngineError> {
        let opts = CreateContainerOptions {
            name: Some(spec.name.clone()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), container_body(spec))
            .await
            .map_err(|e| map_create_error(e, &spec.name))?;

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        match self
            .client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            // 304: already started
            Err(e) if status_code(&e) == Some(304) => Ok(()),
            Err(e) => Err(map_not_found(e, &format!("container {}", id))),
        }
    }

    async fn stop_container(&self, id: &ContainerId, timeout: Duration) -> Result<(), EngineError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        match self.client.stop_container(id.as_str(), Some(opts)).await {
            Ok(()) => Ok(()),
            // 304: not running
            Err(e) if status_code(&e) == Some(304) => Ok(()),
            Err(e) => Err(map_not_found(e, &format!("container {}", id))),
        }
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), EngineError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(|e| map_not_found(e, &format!("container {}", id)))
    }

    async fn remove_volume(&self, name: &str) -> Result<(), EngineError> {
        match self
            .client
            .remove_volume(name, None::<RemoveVolumeOptions>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if status_code(&e) == Some(404) => Ok(()),
            Err(e) if status_code(&e) == Some(409) => {
                Err(EngineError::Conflict(format!("volume {} is in use", name)))
            }
            Err(e) => Err(EngineError::Api(e.to_string())),
        }
    }

    async fn connect_to_network(
        &self,
        container: &ContainerId,
        network: &str,
        aliases: &[String],
    ) -> Result<(), EngineError> {
        let request = bollard::models::NetworkConnectRequest {
            container: container.to_string(),
            endpoint_config: Some(EndpointSettings {
                aliases: if aliases.is_empty() {
                    None
                } else {
                    Some(aliases.to_vec())
                },
                ..Default::default()
            }),
        };

        self.client
            .connect_network(network, request)
            .await
            .map_err(|e| map_network_error(e, network))
    }
}
