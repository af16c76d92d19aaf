// ABOUTME: Seams between the orchestrator and a concrete backend.
// ABOUTME: A facade runs the four phases once; a factory builds one facade per request.

use async_trait::async_trait;
use std::sync::Arc;

use crate::observer::DeploymentObserver;

use super::error::{FacadeBuildError, PhaseError};
use super::spec::DeploymentSpec;
use super::state::{FacadeState, Phase};

/// One deployment attempt against a backend.
///
/// A facade is driven through the phases in order, exactly once, by a single
/// task. Each phase returns a [`PhaseError`] of its own kind on failure.
#[async_trait]
pub trait DeployFacade: Send {
    fn state(&self) -> FacadeState;

    /// Verify the target can accept this deployment without changing anything.
    async fn check_preconditions(&mut self) -> Result<(), PhaseError>;

    /// Stage what the workload needs: images, networks, volumes.
    async fn pre_deploy(&mut self) -> Result<(), PhaseError>;

    /// Start the workload.
    async fn deploy(&mut self) -> Result<(), PhaseError>;

    /// Integrate the running workload: routing, verification, reporting.
    async fn post_deploy(&mut self) -> Result<(), PhaseError>;

    async fn run_phase(&mut self, phase: Phase) -> Result<(), PhaseError> {
        match phase {
            Phase::CheckPreconditions => self.check_preconditions().await,
            Phase::PreDeploy => self.pre_deploy().await,
            Phase::Deploy => self.deploy().await,
            Phase::PostDeploy => self.post_deploy().await,
        }
    }
}

/// Builds a facade for one request.
///
/// The observer is handed over at construction so the backend can report
/// progress lines of its own.
pub trait FacadeFactory: Send + Sync {
    fn build(
        &self,
        spec: DeploymentSpec,
        observer: Arc<dyn DeploymentObserver>,
    ) -> Result<Box<dyn DeployFacade>, FacadeBuildError>;
}

impl<F> FacadeFactory for F
where
    F: Fn(
            DeploymentSpec,
            Arc<dyn DeploymentObserver>,
        ) -> Result<Box<dyn DeployFacade>, FacadeBuildError>
        + Send
        + Sync,
{
    fn build(
        &self,
        spec: DeploymentSpec,
        observer: Arc<dyn DeploymentObserver>,
    ) -> Result<Box<dyn DeployFacade>, FacadeBuildError> {
        self(spec, observer)
    }
}
