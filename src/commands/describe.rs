// ABOUTME: Describe command implementation.
// ABOUTME: Prints the description lines a deployment would start with, offline.

use hoist::config::AgentConfig;
use hoist::error::Result;
use hoist::output::Output;
use hoist::request::DeploymentRequest;
use std::path::Path;

pub fn describe(config: &AgentConfig, request_path: &Path, output: &Output) -> Result<()> {
    let request = DeploymentRequest::load(request_path)?;

    let groups = [
        request.describe(config),
        request.instance_config.describe(),
        request
            .container_config
            .describe(config, &request.instance_config),
    ];
    for line in groups.iter().flatten() {
        output.line(line);
    }
    Ok(())
}
