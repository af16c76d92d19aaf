// ABOUTME: Turns a deployment spec into the engine-level container description.
// ABOUTME: Pure functions: labels, merged environment, mounts, ports and pull credentials.

use std::collections::{HashMap, HashSet};

use crate::config::AgentConfig;
use crate::deploy::DeploymentSpec;
use crate::request::{
    EnvEntry, MountEntry, RequestError, RuntimeConfigType, appconfig_env, parse_env_list,
    parse_mount,
};
use crate::types::ContainerName;

use super::engine::{PortBinding, PullCredentials, WorkloadSpec};

pub const LABEL_MANAGED: &str = "hoist.managed";
pub const LABEL_PREFIX: &str = "hoist.prefix";
pub const LABEL_ISSUER: &str = "hoist.issuer";
pub const LABEL_IMAGE: &str = "hoist.image";
pub const LABEL_REQUEST: &str = "hoist.request-id";
pub const LABEL_ROUTE_HOST: &str = "hoist.route.host";
pub const LABEL_ROUTE_TLS: &str = "hoist.route.tls";
pub const LABEL_ROUTE_PORT: &str = "hoist.route.port";

/// Engine-managed network modes; anything else names a user-defined network.
pub fn is_engine_network_mode(mode: &str) -> bool {
    matches!(mode, "host" | "none" | "bridge" | "default") || mode.starts_with("container:")
}

/// Network mode the container is created with.
pub fn network_mode(spec: &DeploymentSpec, config: &AgentConfig) -> String {
    spec.container
        .network_mode
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(&config.network)
        .to_string()
}

/// User-defined network the backend creates and attaches to, if any.
pub fn managed_network(spec: &DeploymentSpec, config: &AgentConfig) -> Option<String> {
    Some(network_mode(spec, config)).filter(|m| !is_engine_network_mode(m))
}

pub fn prefix(spec: &DeploymentSpec) -> &str {
    spec.container.effective_prefix(&spec.instance)
}

/// Name the workload container gets.
pub fn container_name(spec: &DeploymentSpec) -> Result<ContainerName, RequestError> {
    Ok(ContainerName::prefixed(prefix(spec), &spec.container.name)?)
}

/// Container ports that appear more than once, and host ports published twice.
pub fn duplicate_ports(spec: &DeploymentSpec) -> Vec<String> {
    let mut internal = HashSet::new();
    let mut external = HashSet::new();
    let mut dupes = Vec::new();

    for port in &spec.container.ports {
        if !internal.insert(port.internal) {
            dupes.push(format!("container port {}", port.internal));
        }
        if let Some(host) = port.external
            && !external.insert(host)
        {
            dupes.push(format!("host port {}", host));
        }
    }
    dupes
}

pub fn labels(
    spec: &DeploymentSpec,
    config: &AgentConfig,
    name: &ContainerName,
) -> HashMap<String, String> {
    let mut labels = config.labels.clone();
    labels.insert(LABEL_MANAGED.to_string(), "true".to_string());
    labels.insert(LABEL_PREFIX.to_string(), prefix(spec).to_string());
    labels.insert(LABEL_IMAGE.to_string(), spec.image.to_string());
    labels.insert(LABEL_REQUEST.to_string(), spec.request_id.to_string());
    if !spec.issuer.is_anonymous() {
        labels.insert(LABEL_ISSUER.to_string(), spec.issuer.to_string());
    }

    if spec.container.is_public()
        && let Some(host) = config.ingress_host(name.as_str())
    {
        let tls = spec.container.expose.is_some_and(|e| e.tls);
        labels.insert(LABEL_ROUTE_HOST.to_string(), host);
        labels.insert(LABEL_ROUTE_TLS.to_string(), tls.to_string());
        if let Some(port) = spec.container.ports.first() {
            labels.insert(LABEL_ROUTE_PORT.to_string(), port.internal.to_string());
        }
    }
    labels
}

/// Instance entries, then container entries, then the runtime config.
///
/// A later source overrides an earlier key; a key keeps the position where it
/// first appeared.
pub fn environment(spec: &DeploymentSpec) -> Result<Vec<String>, RequestError> {
    let mut entries = parse_env_list(&spec.instance.environment)?;
    entries.extend(parse_env_list(&spec.container.environments)?);
    if spec.container.runtime_config_type == Some(RuntimeConfigType::DotnetAppconfig) {
        entries.extend(appconfig_env(&spec.runtime_config)?);
    }

    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, EnvEntry> = HashMap::new();
    for entry in entries {
        let key = entry.key.clone();
        if latest.insert(key.clone(), entry).is_none() {
            order.push(key);
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|key| latest.remove(&key))
        .map(|entry| entry.to_engine_format())
        .collect())
}

/// Container mounts plus the config container's volume.
///
/// With an instance mount path, named sources become host directories under it.
pub fn mounts(spec: &DeploymentSpec) -> Result<Vec<MountEntry>, RequestError> {
    let base = spec
        .instance
        .mount_path
        .as_deref()
        .map(|p| p.trim().trim_end_matches('/'))
        .filter(|p| !p.is_empty());

    let mut mounts = spec
        .container
        .mounts
        .iter()
        .map(|m| parse_mount(m))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(base) = base {
        for mount in &mut mounts {
            if !mount.source.starts_with('/') {
                mount.source = format!("{}/{}", base, mount.source);
            }
        }
    }

    if let Some(ref cc) = spec.container.config_container {
        mounts.push(MountEntry {
            source: cc.volume.clone(),
            target: cc.path.clone(),
            read_only: false,
        });
    }
    Ok(mounts)
}

pub fn ports(spec: &DeploymentSpec) -> Vec<PortBinding> {
    spec.container
        .ports
        .iter()
        .map(|p| PortBinding {
            container_port: p.internal,
            host_port: p.external,
        })
        .collect()
}

/// Full engine description of the workload container.
pub fn workload(
    spec: &DeploymentSpec,
    config: &AgentConfig,
    name: &ContainerName,
) -> Result<WorkloadSpec, RequestError> {
    Ok(WorkloadSpec {
        name: name.to_string(),
        image: spec.image.to_string(),
        env: environment(spec)?,
        labels: labels(spec, config, name),
        ports: ports(spec),
        mounts: mounts(spec)?,
        user: spec.container.user.map(|uid| uid.to_string()),
        restart: config.restart,
        network_mode: Some(network_mode(spec, config)),
    })
}

/// Credentials for pulling from `host`, resolving the password now.
pub fn pull_credentials(
    spec: &DeploymentSpec,
    host: &str,
) -> crate::error::Result<Option<PullCredentials>> {
    let Some(ref auth) = spec.registry_auth else {
        return Ok(None);
    };
    if auth.user.is_empty() {
        return Ok(None);
    }

    Ok(Some(PullCredentials {
        username: auth.user.clone(),
        password: auth.password.resolve()?,
        server: host.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ConfigContainer, ContainerConfig, Expose, InstanceConfig, Port};
    use crate::types::{ImageLocator, Principal, RequestId};
    use tokio_util::sync::CancellationToken;

    fn spec(container: ContainerConfig) -> DeploymentSpec {
        DeploymentSpec {
            request_id: RequestId::new("req-1").unwrap(),
            cancel: CancellationToken::new(),
            image: ImageLocator::new("registry.example.com", "svc", "v1"),
            instance: InstanceConfig {
                prefix: "prod".to_string(),
                ..InstanceConfig::default()
            },
            container,
            runtime_config: String::new(),
            issuer: Principal::new("alice"),
            registry_auth: None,
        }
    }

    #[test]
    fn later_environment_source_wins() {
        let mut container = ContainerConfig::named("api");
        container.environments = vec!["MODE|debug".to_string(), "PORT|80".to_string()];
        let mut spec = spec(container);
        spec.instance.environment = vec!["MODE|prod".to_string(), "REGION|eu".to_string()];

        assert_eq!(
            environment(&spec).unwrap(),
            vec!["MODE=debug", "REGION=eu", "PORT=80"]
        );
    }

    #[test]
    fn appconfig_runtime_config_becomes_environment() {
        let mut container = ContainerConfig::named("api");
        container.runtime_config_type = Some(RuntimeConfigType::DotnetAppconfig);
        let mut spec = spec(container);
        spec.runtime_config = r#"{"Db":{"Host":"db"}}"#.to_string();

        assert_eq!(environment(&spec).unwrap(), vec!["Db__Host=db"]);
    }

    #[test]
    fn runtime_config_ignored_without_type() {
        let mut spec = spec(ContainerConfig::named("api"));
        spec.runtime_config = r#"{"Db":{"Host":"db"}}"#.to_string();
        assert!(environment(&spec).unwrap().is_empty());
    }

    #[test]
    fn named_mounts_resolve_under_mount_path() {
        let mut container = ContainerConfig::named("api");
        container.mounts = vec!["data|/var/data".to_string(), "/etc/ssl|/ssl|ro".to_string()];
        container.config_container = Some(ConfigContainer {
            image: "svc-config:v1".to_string(),
            volume: "api-config".to_string(),
            path: "/app/config".to_string(),
            keep_files: false,
        });
        let mut spec = spec(container);
        spec.instance.mount_path = Some("/srv/prod/".to_string());

        let mounts = mounts(&spec).unwrap();
        assert_eq!(mounts[0].source, "/srv/prod/data");
        assert_eq!(mounts[1].source, "/etc/ssl");
        assert!(mounts[1].read_only);
        assert_eq!(mounts[2].source, "api-config");
        assert_eq!(mounts[2].target, "/app/config");
    }

    #[test]
    fn duplicate_ports_are_reported() {
        let mut container = ContainerConfig::named("api");
        container.ports = vec![
            Port {
                internal: 80,
                external: Some(8080),
            },
            Port {
                internal: 80,
                external: Some(8080),
            },
            Port {
                internal: 90,
                external: None,
            },
        ];
        assert_eq!(
            duplicate_ports(&spec(container)),
            vec!["container port 80", "host port 8080"]
        );
    }

    #[test]
    fn public_container_gets_route_labels() {
        let mut container = ContainerConfig::named("api");
        container.ports = vec![Port {
            internal: 8080,
            external: None,
        }];
        container.expose = Some(Expose {
            public: true,
            tls: true,
        });
        let spec = spec(container);
        let config = AgentConfig {
            ingress_root_domain: Some("apps.example.com".to_string()),
            ..AgentConfig::default()
        };
        let name = container_name(&spec).unwrap();

        let labels = labels(&spec, &config, &name);
        assert_eq!(labels[LABEL_MANAGED], "true");
        assert_eq!(labels[LABEL_PREFIX], "prod");
        assert_eq!(labels[LABEL_ISSUER], "alice");
        assert_eq!(labels[LABEL_IMAGE], "registry.example.com/svc:v1");
        assert_eq!(labels[LABEL_ROUTE_HOST], "prod-api.apps.example.com");
        assert_eq!(labels[LABEL_ROUTE_TLS], "true");
        assert_eq!(labels[LABEL_ROUTE_PORT], "8080");
    }

    #[test]
    fn engine_network_modes_are_not_managed() {
        let mut container = ContainerConfig::named("api");
        container.network_mode = Some("host".to_string());
        let config = AgentConfig::default();
        assert_eq!(managed_network(&spec(container), &config), None);
        assert_eq!(
            managed_network(&spec(ContainerConfig::named("api")), &config),
            Some("hoist".to_string())
        );
    }
}
