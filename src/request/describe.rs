// ABOUTME: Human-readable description lines for a request, written before any phase runs.
// ABOUTME: Secrets are never printed; environment entries show keys only.

use crate::config::AgentConfig;
use crate::types::{ContainerName, DEFAULT_TAG};

use super::piped::env_key;
use super::{ContainerConfig, DeploymentRequest, InstanceConfig};

const NONE: &str = "<none>";

impl DeploymentRequest {
    /// Common lines: where the deployment goes and what it deploys.
    pub fn describe(&self, config: &AgentConfig) -> Vec<String> {
        let tag: &str = if self.tag.is_empty() {
            DEFAULT_TAG
        } else {
            &self.tag
        };

        let registry = match (&self.registry_auth, self.registry.as_deref()) {
            (Some(auth), _) if !auth.url.trim().is_empty() => {
                let name = if auth.name.is_empty() { &auth.url } else { &auth.name };
                format!("{} (credentials: {})", auth.url, name)
            }
            (_, Some(registry)) if !registry.trim().is_empty() => registry.to_string(),
            _ => format!("{} (default)", config.default_registry),
        };

        vec![
            format!("Deployment target: {}", config.node_name),
            format!("Image: {}:{}", self.image_path(), tag),
            format!("Registry: {}", registry),
            format!("Container name: {}", self.container_config.name),
            format!("Issued by: {}", self.issuer),
        ]
    }
}

impl InstanceConfig {
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!("Instance prefix: {}", or_none(&self.prefix))];
        if let Some(ref prefix) = self.repository_prefix {
            lines.push(format!("Repository prefix: {}", prefix));
        }
        if let Some(ref path) = self.mount_path {
            lines.push(format!("Mount path: {}", path));
        }
        lines.push(format!("Instance environment: {}", keys(&self.environment)));
        lines
    }
}

impl ContainerConfig {
    /// Lines for this container; `instance` supplies the prefix its public host is built from.
    pub fn describe(&self, config: &AgentConfig, instance: &InstanceConfig) -> Vec<String> {
        let ports = if self.ports.is_empty() {
            NONE.to_string()
        } else {
            self.ports
                .iter()
                .map(|p| match p.external {
                    Some(external) => format!("{}->{}", external, p.internal),
                    None => p.internal.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mounts = if self.mounts.is_empty() {
            NONE.to_string()
        } else {
            self.mounts.join(", ")
        };

        let mut lines = vec![
            format!("Container: {}", self.name),
            format!("Ports: {}", ports),
            format!("Mounts: {}", mounts),
            format!("Container environment: {}", keys(&self.environments)),
        ];

        if let Some(ref mode) = self.network_mode {
            lines.push(format!("Network mode: {}", mode));
        }
        if let Some(kind) = self.runtime_config_type {
            lines.push(format!("Runtime config type: {}", kind));
        }
        if let Some(expose) = self.expose.filter(|e| e.public) {
            let scheme = if expose.tls { "https" } else { "http" };
            let name = ContainerName::prefixed(self.effective_prefix(instance), &self.name)
                .map(|n| n.to_string())
                .unwrap_or_else(|_| self.name.clone());
            match config.ingress_host(&name) {
                Some(host) => lines.push(format!("Expose: {}://{}", scheme, host)),
                None => lines.push(format!("Expose: {} (no ingress domain configured)", scheme)),
            }
        }
        if let Some(ref cc) = self.config_container {
            lines.push(format!(
                "Config container: {} -> {}:{}{}",
                cc.image,
                cc.volume,
                cc.path,
                if cc.keep_files { " (keep files)" } else { "" }
            ));
        }
        if let Some(uid) = self.user {
            lines.push(format!("User: {}", uid));
        }
        lines
    }
}

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() { NONE } else { value }
}

fn keys(entries: &[String]) -> String {
    if entries.is_empty() {
        return NONE.to_string();
    }
    entries.iter().map(|e| env_key(e)).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Expose, Port, RegistryAuth};
    use crate::types::RequestId;

    fn config() -> AgentConfig {
        AgentConfig {
            node_name: "node-7".to_string(),
            ingress_root_domain: Some("apps.example.com".to_string()),
            ..AgentConfig::default()
        }
    }

    fn request() -> DeploymentRequest {
        DeploymentRequest::new(
            RequestId::new("req-1").unwrap(),
            "svc",
            "",
            ContainerConfig::named("api"),
        )
    }

    #[test]
    fn common_lines_use_agent_config() {
        let lines = request().describe(&config());
        assert_eq!(lines[0], "Deployment target: node-7");
        assert_eq!(lines[1], "Image: svc:latest");
        assert_eq!(lines[2], "Registry: docker.io (default)");
        assert!(lines.contains(&"Issued by: <anonymous>".to_string()));
    }

    #[test]
    fn image_line_carries_repository_prefix() {
        let mut request = request();
        request.instance_config.repository_prefix = Some("acme".to_string());
        assert_eq!(request.describe(&config())[1], "Image: acme/svc:latest");
    }

    #[test]
    fn registry_line_names_credentials_not_password() {
        let mut request = request();
        request.registry_auth = Some(RegistryAuth {
            name: "private".to_string(),
            url: "registry.example.com".to_string(),
            user: "deploy".to_string(),
            password: crate::config::EnvValue::Literal("s3cret".to_string()),
        });
        let lines = request.describe(&config());
        assert_eq!(lines[2], "Registry: registry.example.com (credentials: private)");
        assert!(lines.iter().all(|l| !l.contains("s3cret")));
    }

    #[test]
    fn environment_shows_keys_only() {
        let instance = InstanceConfig {
            environment: vec!["DB_PASSWORD|hunter2".to_string(), "MODE=prod".to_string()],
            ..InstanceConfig::default()
        };
        let lines = instance.describe();
        assert!(lines.contains(&"Instance environment: DB_PASSWORD, MODE".to_string()));
        assert!(lines.iter().all(|l| !l.contains("hunter2")));
    }

    #[test]
    fn container_lines_include_ports_and_expose() {
        let mut container = ContainerConfig::named("api");
        container.ports = vec![
            Port {
                internal: 80,
                external: Some(8080),
            },
            Port {
                internal: 9090,
                external: None,
            },
        ];
        container.expose = Some(Expose {
            public: true,
            tls: true,
        });

        let instance = InstanceConfig {
            prefix: "prod".to_string(),
            ..InstanceConfig::default()
        };

        let lines = container.describe(&config(), &instance);
        assert!(lines.contains(&"Ports: 8080->80, 9090".to_string()));
        assert!(lines.contains(&"Expose: https://prod-api.apps.example.com".to_string()));
    }
}
