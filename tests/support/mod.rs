// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup and a recording facade double for pipeline tests.

use async_trait::async_trait;
use hoist::deploy::{
    DeployFacade, DeploymentSpec, FacadeBuildError, FacadeFactory, FacadeState, Phase, PhaseError,
};
use hoist::observer::DeploymentObserver;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Once};
use tokio_util::sync::CancellationToken;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("hoist=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Default)]
struct Journal {
    specs: Vec<DeploymentSpec>,
    phases: Vec<Phase>,
}

/// Factory for facades that record their calls and fail on demand.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingFactory {
    journal: Arc<Mutex<Journal>>,
    failures: Arc<HashMap<Phase, String>>,
    build_error: Option<String>,
    cancel_during: Option<(Phase, CancellationToken)>,
}

#[allow(dead_code)]
impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `phase` fail with `message`.
    pub fn failing(mut self, phase: Phase, message: &str) -> Self {
        let mut failures = (*self.failures).clone();
        failures.insert(phase, message.to_string());
        self.failures = Arc::new(failures);
        self
    }

    /// Refuse to build a facade at all.
    pub fn refusing(mut self, message: &str) -> Self {
        self.build_error = Some(message.to_string());
        self
    }

    /// Cancel `token` while `phase` runs.
    pub fn cancelling_during(mut self, phase: Phase, token: CancellationToken) -> Self {
        self.cancel_during = Some((phase, token));
        self
    }

    pub fn specs(&self) -> Vec<DeploymentSpec> {
        self.journal.lock().specs.clone()
    }

    /// Phases in the order they were run, across every built facade.
    pub fn phases(&self) -> Vec<Phase> {
        self.journal.lock().phases.clone()
    }
}

impl FacadeFactory for RecordingFactory {
    fn build(
        &self,
        spec: DeploymentSpec,
        observer: Arc<dyn DeploymentObserver>,
    ) -> Result<Box<dyn DeployFacade>, FacadeBuildError> {
        if let Some(ref message) = self.build_error {
            return Err(FacadeBuildError(message.clone()));
        }
        self.journal.lock().specs.push(spec.clone());
        Ok(Box::new(RecordingFacade {
            spec,
            observer,
            journal: Arc::clone(&self.journal),
            failures: Arc::clone(&self.failures),
            cancel_during: self.cancel_during.clone(),
            state: FacadeState::Constructed,
        }))
    }
}

struct RecordingFacade {
    spec: DeploymentSpec,
    observer: Arc<dyn DeploymentObserver>,
    journal: Arc<Mutex<Journal>>,
    failures: Arc<HashMap<Phase, String>>,
    cancel_during: Option<(Phase, CancellationToken)>,
    state: FacadeState,
}

impl RecordingFacade {
    fn step(&mut self, phase: Phase) -> Result<(), PhaseError> {
        self.journal.lock().phases.push(phase);
        if let Some((at, ref token)) = self.cancel_during
            && at == phase
        {
            token.cancel();
        }
        if let Some(message) = self.failures.get(&phase) {
            return Err(PhaseError::for_phase(phase, message.clone()));
        }
        self.state.record(phase);
        self.observer
            .write_line(&format!("{} done", phase))
            .map_err(|e| PhaseError::for_phase(phase, e.to_string()))
    }
}

#[async_trait]
impl DeployFacade for RecordingFacade {
    fn state(&self) -> FacadeState {
        self.state
    }

    async fn check_preconditions(&mut self) -> Result<(), PhaseError> {
        self.step(Phase::CheckPreconditions)
    }

    async fn pre_deploy(&mut self) -> Result<(), PhaseError> {
        self.step(Phase::PreDeploy)
    }

    async fn deploy(&mut self) -> Result<(), PhaseError> {
        self.step(Phase::Deploy)
    }

    async fn post_deploy(&mut self) -> Result<(), PhaseError> {
        self.step(Phase::PostDeploy)
    }
}
