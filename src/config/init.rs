// ABOUTME: Config scaffolding for new agent installs.
// ABOUTME: Writes a commented hoist.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::{AgentConfig, CONFIG_FILENAME};

pub fn init_config(dir: &Path, node_name: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = AgentConfig::template();
    if let Some(name) = node_name {
        if name.trim().is_empty() {
            return Err(Error::InvalidConfig("node name cannot be empty".to_string()));
        }
        config.node_name = name.to_string();
    }

    std::fs::write(&config_path, generate_template_yaml(&config))?;

    Ok(())
}

fn generate_template_yaml(config: &AgentConfig) -> String {
    format!(
        r#"node_name: {}
default_registry: {}
network: {}
# Public routing domain; exposed containers get <name>.<domain>
# ingress_root_domain: {}
# docker_socket: /var/run/docker.sock
deploy_timeout: 10m
readiness_timeout: 2m
poll_interval: 1s
restart: {}
# abort stops at the first failing phase; continue runs every phase
failure_policy: abort
"#,
        config.node_name,
        config.default_registry,
        config.network,
        config.ingress_root_domain.as_deref().unwrap_or("apps.example.com"),
        config.restart,
    )
}
