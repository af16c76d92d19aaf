// ABOUTME: Error types for the deployment pipeline.
// ABOUTME: PhaseError is the per-phase taxonomy; DeployError covers whole attempts.

use snafu::Snafu;
use std::fmt;

use crate::observer::ObserverError;
use crate::request::RequestError;

use super::state::{FacadeState, Phase};

/// Failure of one lifecycle phase. All kinds are recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// The target cannot accept the deployment. Nothing was changed.
    #[error("precondition check failed: {0}")]
    Precondition(String),

    /// Staging failed; partially staged resources may remain.
    #[error("pre-deploy staging failed: {0}")]
    Staging(String),

    /// The workload failed to start; its state is indeterminate.
    #[error("deploy failed: {0}")]
    Apply(String),

    /// The workload is running but not fully integrated.
    #[error("post-deploy finalization failed: {0}")]
    Finalization(String),
}

impl PhaseError {
    /// Build the error kind that belongs to `phase`.
    pub fn for_phase(phase: Phase, message: impl Into<String>) -> Self {
        let message = message.into();
        match phase {
            Phase::CheckPreconditions => PhaseError::Precondition(message),
            Phase::PreDeploy => PhaseError::Staging(message),
            Phase::Deploy => PhaseError::Apply(message),
            Phase::PostDeploy => PhaseError::Finalization(message),
        }
    }

    pub fn cancelled(phase: Phase) -> Self {
        Self::for_phase(phase, "cancelled")
    }

    pub fn out_of_order(phase: Phase, state: FacadeState) -> Self {
        Self::for_phase(
            phase,
            format!("{} cannot run once the deployment is {}", phase, state),
        )
    }

    /// Phase this error came from.
    pub fn phase(&self) -> Phase {
        match self {
            PhaseError::Precondition(_) => Phase::CheckPreconditions,
            PhaseError::Staging(_) => Phase::PreDeploy,
            PhaseError::Apply(_) => Phase::Deploy,
            PhaseError::Finalization(_) => Phase::PostDeploy,
        }
    }

    /// Detail text without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            PhaseError::Precondition(m)
            | PhaseError::Staging(m)
            | PhaseError::Apply(m)
            | PhaseError::Finalization(m) => m,
        }
    }
}

/// Tag any displayable error with the phase it happened in.
pub trait PhaseResultExt<T> {
    fn in_phase(self, phase: Phase) -> Result<T, PhaseError>;

    fn in_phase_with(self, phase: Phase, what: &str) -> Result<T, PhaseError>;
}

impl<T, E: fmt::Display> PhaseResultExt<T> for Result<T, E> {
    fn in_phase(self, phase: Phase) -> Result<T, PhaseError> {
        self.map_err(|e| PhaseError::for_phase(phase, e.to_string()))
    }

    fn in_phase_with(self, phase: Phase, what: &str) -> Result<T, PhaseError> {
        self.map_err(|e| PhaseError::for_phase(phase, format!("{}: {}", what, e)))
    }
}

/// A facade factory could not build a facade for the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FacadeBuildError(pub String);

/// Failure of a whole deployment attempt.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeployError {
    #[snafu(display("invalid deployment request: {source}"))]
    InvalidRequest { source: RequestError },

    #[snafu(display("observer unusable: {source}"))]
    ObserverUnusable { source: ObserverError },

    #[snafu(display("deployment {request_id} cancelled before {phase}"))]
    Cancelled { request_id: String, phase: Phase },

    #[snafu(display("failed to construct deployment facade: {source}"))]
    FacadeConstruction { source: FacadeBuildError },

    #[snafu(display("deployment {request_id} failed: {source}"))]
    PhaseFailed {
        request_id: String,
        source: PhaseError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    InvalidRequest,
    ObserverUnusable,
    Cancelled,
    FacadeConstruction,
    Precondition,
    Staging,
    Apply,
    Finalization,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::InvalidRequest { .. } => DeployErrorKind::InvalidRequest,
            DeployError::ObserverUnusable { .. } => DeployErrorKind::ObserverUnusable,
            DeployError::Cancelled { .. } => DeployErrorKind::Cancelled,
            DeployError::FacadeConstruction { .. } => DeployErrorKind::FacadeConstruction,
            DeployError::PhaseFailed { source, .. } => match source {
                PhaseError::Precondition(_) => DeployErrorKind::Precondition,
                PhaseError::Staging(_) => DeployErrorKind::Staging,
                PhaseError::Apply(_) => DeployErrorKind::Apply,
                PhaseError::Finalization(_) => DeployErrorKind::Finalization,
            },
        }
    }

    /// The failing phase's error, if a phase failed.
    pub fn phase_error(&self) -> Option<&PhaseError> {
        match self {
            DeployError::PhaseFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_phase_maps_to_matching_kind() {
        for phase in Phase::ALL {
            assert_eq!(PhaseError::for_phase(phase, "x").phase(), phase);
        }
    }

    #[test]
    fn detail_strips_kind_prefix() {
        let err = PhaseError::Apply("container exited".to_string());
        assert_eq!(err.to_string(), "deploy failed: container exited");
        assert_eq!(err.detail(), "container exited");
    }

    #[test]
    fn in_phase_with_adds_context() {
        let result: Result<(), &str> = Err("connection refused");
        let err = result.in_phase_with(Phase::PreDeploy, "pull image").unwrap_err();
        assert_eq!(
            err,
            PhaseError::Staging("pull image: connection refused".to_string())
        );
    }

    #[test]
    fn kind_follows_phase_error() {
        let err = DeployError::PhaseFailed {
            request_id: "r".to_string(),
            source: PhaseError::Finalization("route".to_string()),
        };
        assert_eq!(err.kind(), DeployErrorKind::Finalization);
        assert!(err.phase_error().is_some());
    }
}
