// ABOUTME: Drives one deployment request through the four lifecycle phases.
// ABOUTME: Binds the observer, writes the description, builds a facade and reports each failure.

use serde::Deserialize;
use snafu::ResultExt;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::observer::{DeploymentObserver, ObserverError};
use crate::registry::resolve_registry_host;
use crate::request::DeploymentRequest;
use crate::types::{ImageLocator, RequestId};

use super::error::{
    CancelledSnafu, DeployError, FacadeConstructionSnafu, InvalidRequestSnafu,
    ObserverUnusableSnafu, PhaseError,
};
use super::facade::FacadeFactory;
use super::spec::DeploymentSpec;
use super::state::{FacadeState, Phase};

/// Line written to the observer before every reported error message.
pub const ERROR_MARKER: &str = "Error:";

/// What to do after a phase fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed phase and return its error.
    #[default]
    Abort,
    /// Report the failure and keep running the remaining phases.
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Continue => f.write_str("continue"),
        }
    }
}

/// Result of one phase within a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub result: Result<(), PhaseError>,
}

/// Summary of an attempt that ran to the end of the pipeline.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub request_id: RequestId,
    pub image: ImageLocator,
    pub outcomes: Vec<PhaseOutcome>,
    pub final_state: FacadeState,
}

impl DeployReport {
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> Vec<&PhaseError> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err())
            .collect()
    }
}

/// Runs deployment requests against whatever backend the factory builds.
///
/// Holds no per-request state, so one orchestrator can serve concurrent
/// requests as long as each has its own observer.
pub struct Orchestrator<F> {
    config: Arc<AgentConfig>,
    factory: F,
    policy: FailurePolicy,
}

impl<F: FacadeFactory> Orchestrator<F> {
    pub fn new(config: Arc<AgentConfig>, factory: F) -> Self {
        let policy = config.failure_policy;
        Orchestrator {
            config,
            factory,
            policy,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Deploy one image.
    ///
    /// Before any phase runs, the observer is bound to the request id and
    /// receives the description lines. Each phase failure is written to the
    /// observer as [`ERROR_MARKER`] followed by the error text. With
    /// [`FailurePolicy::Abort`] the first failure is returned; with
    /// [`FailurePolicy::Continue`] every phase runs and the report lists the
    /// failures.
    pub async fn deploy_image(
        &self,
        cancel: &CancellationToken,
        observer: Arc<dyn DeploymentObserver>,
        request: &DeploymentRequest,
    ) -> Result<DeployReport, DeployError> {
        request.validate().context(InvalidRequestSnafu)?;

        if !observer.is_usable() {
            return Err(ObserverError::Closed).context(ObserverUnusableSnafu);
        }

        let request_id = request.id.clone();
        if cancel.is_cancelled() {
            return CancelledSnafu {
                request_id: request_id.to_string(),
                phase: Phase::CheckPreconditions,
            }
            .fail();
        }

        observer
            .set_request_id(&request_id)
            .context(ObserverUnusableSnafu)?;

        let description = [
            request.describe(&self.config),
            request.instance_config.describe(),
            request
                .container_config
                .describe(&self.config, &request.instance_config),
        ];
        for group in description {
            observer.write(group).context(ObserverUnusableSnafu)?;
        }

        let image = ImageLocator::new(
            resolve_registry_host(request.registry.as_deref(), request.registry_auth.as_ref()),
            request.image_path(),
            request.tag.trim(),
        );

        let spec = DeploymentSpec {
            request_id: request_id.clone(),
            cancel: cancel.child_token(),
            image: image.clone(),
            instance: request.instance_config.clone(),
            container: request.container_config.clone(),
            runtime_config: request.runtime_config.to_text(),
            issuer: request.issuer.clone(),
            registry_auth: request.registry_auth.clone(),
        };

        tracing::info!(
            request_id = %request_id,
            image = %image,
            policy = %self.policy,
            "starting deployment"
        );

        let mut facade = match self.factory.build(spec, Arc::clone(&observer)) {
            Ok(facade) => facade,
            Err(e) => {
                report_error(observer.as_ref(), &e);
                return Err(e).context(FacadeConstructionSnafu);
            }
        };

        let mut outcomes = Vec::with_capacity(Phase::ALL.len());
        for phase in Phase::ALL {
            if cancel.is_cancelled() {
                let err = DeployError::Cancelled {
                    request_id: request_id.to_string(),
                    phase,
                };
                report_error(observer.as_ref(), &err);
                return Err(err);
            }

            tracing::debug!(request_id = %request_id, %phase, "running phase");
            let result = facade.run_phase(phase).await;

            if let Err(ref e) = result {
                tracing::warn!(request_id = %request_id, %phase, "phase failed: {}", e);
                report_error(observer.as_ref(), e);

                if self.policy == FailurePolicy::Abort {
                    return Err(DeployError::PhaseFailed {
                        request_id: request_id.to_string(),
                        source: e.clone(),
                    });
                }
            }

            outcomes.push(PhaseOutcome { phase, result });
        }

        let report = DeployReport {
            request_id,
            image,
            outcomes,
            final_state: facade.state(),
        };

        if report.succeeded() {
            tracing::info!(request_id = %report.request_id, "deployment finished");
        } else {
            tracing::warn!(
                request_id = %report.request_id,
                failures = report.failures().len(),
                "deployment finished with failures"
            );
        }
        Ok(report)
    }
}

/// Write an error to the observer. Reporting never fails the caller.
fn report_error(observer: &dyn DeploymentObserver, err: &dyn fmt::Display) {
    let lines = vec![ERROR_MARKER.to_string(), err.to_string()];
    if let Err(e) = observer.write(lines) {
        tracing::warn!("could not report error to observer: {}", e);
    }
}
