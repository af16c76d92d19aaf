// ABOUTME: Deploy command implementation.
// ABOUTME: Connects to the engine, streams the deployment log and runs the phase pipeline.

use hoist::backend::{BollardEngine, EngineFacadeFactory};
use hoist::config::AgentConfig;
use hoist::deploy::{FailurePolicy, Orchestrator};
use hoist::error::{Error, Result};
use hoist::observer::{DeploymentLog, DeploymentObserver};
use hoist::output::Output;
use hoist::request::DeploymentRequest;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Deploy the image described by the request file at `request_path`.
pub async fn deploy(
    config: AgentConfig,
    request_path: &Path,
    continue_on_error: bool,
    mut output: Output,
) -> Result<()> {
    let request = DeploymentRequest::load(request_path)?;
    let config = Arc::new(config);

    output.start_timer();
    output.progress(&format!(
        "Deploying {}:{} on {}",
        request.image_path(),
        request.tag.trim(),
        config.node_name
    ));

    let engine = BollardEngine::connect(&config).map_err(|e| Error::Engine(e.to_string()))?;
    let factory = EngineFacadeFactory::new(Arc::new(engine), Arc::clone(&config));

    let mut orchestrator = Orchestrator::new(Arc::clone(&config), factory);
    if continue_on_error {
        orchestrator = orchestrator.with_policy(FailurePolicy::Continue);
    }

    let log = Arc::new(DeploymentLog::new());
    let printer = spawn_printer(&log, output.clone());

    let cancel = CancellationToken::new();
    let watch = spawn_cancel_watch(cancel.clone(), config.deploy_timeout);

    let observer: Arc<dyn DeploymentObserver> = log.clone();
    let result = orchestrator
        .deploy_image(&cancel, observer, &request)
        .await;

    watch.abort();
    log.close();
    if let Err(e) = printer.await {
        tracing::warn!("log printer stopped early: {}", e);
    }

    let report = result?;
    if !report.succeeded() {
        let failures = report.failures().len();
        output.warning(&format!(
            "{} of {} phases failed",
            failures,
            report.outcomes.len()
        ));
        return Err(Error::PhaseFailures(failures));
    }

    output.success(&format!(
        "Deployed {} (request {})",
        report.image, report.request_id
    ));
    Ok(())
}

/// Print every log event until the log is closed.
fn spawn_printer(log: &DeploymentLog, output: Output) -> JoinHandle<()> {
    let mut events = log.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            output.event(&event);
        }
    })
}

/// Cancel the deployment on Ctrl-C or once the deploy timeout elapses.
fn spawn_cancel_watch(cancel: CancellationToken, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted, cancelling deployment");
            }
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!("deploy timeout of {:?} reached, cancelling", timeout);
            }
            _ = cancel.cancelled() => return,
        }
        cancel.cancel();
    })
}
