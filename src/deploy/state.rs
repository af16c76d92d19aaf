// ABOUTME: Lifecycle phases and the facade state they move through.
// ABOUTME: States only move forward; a phase that would step back is refused.

use serde::Serialize;
use std::fmt;

/// One stage of the deployment lifecycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CheckPreconditions,
    PreDeploy,
    Deploy,
    PostDeploy,
}

impl Phase {
    /// Every phase in the order the orchestrator drives them.
    pub const ALL: [Phase; 4] = [
        Phase::CheckPreconditions,
        Phase::PreDeploy,
        Phase::Deploy,
        Phase::PostDeploy,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::CheckPreconditions => "check-preconditions",
            Phase::PreDeploy => "pre-deploy",
            Phase::Deploy => "deploy",
            Phase::PostDeploy => "post-deploy",
        }
    }

    /// State the facade is in once this phase has succeeded.
    pub const fn completed_state(&self) -> FacadeState {
        match self {
            Phase::CheckPreconditions => FacadeState::PreconditionsChecked,
            Phase::PreDeploy => FacadeState::PreDeployed,
            Phase::Deploy => FacadeState::Deployed,
            Phase::PostDeploy => FacadeState::PostDeployed,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a facade is in its single deployment attempt.
///
/// `Constructed`: nothing has run.
/// `PreconditionsChecked`: the target accepted the deployment.
/// `PreDeployed`: supporting resources are staged.
/// `Deployed`: the workload is running.
/// `PostDeployed`: terminal; the workload is integrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacadeState {
    #[default]
    Constructed,
    PreconditionsChecked,
    PreDeployed,
    Deployed,
    PostDeployed,
}

impl FacadeState {
    /// A phase may run only if its completed state lies ahead of this one.
    ///
    /// Skipping ahead is allowed (a phase checks its own prerequisites);
    /// re-running a phase or running an earlier one is not.
    pub fn admits(self, phase: Phase) -> bool {
        phase.completed_state() > self
    }

    /// Record a successful phase. Never moves the state backwards.
    pub fn record(&mut self, phase: Phase) {
        let next = phase.completed_state();
        if next > *self {
            *self = next;
        }
    }

    pub fn is_terminal(self) -> bool {
        self == FacadeState::PostDeployed
    }
}

impl fmt::Display for FacadeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FacadeState::Constructed => "constructed",
            FacadeState::PreconditionsChecked => "preconditions-checked",
            FacadeState::PreDeployed => "pre-deployed",
            FacadeState::Deployed => "deployed",
            FacadeState::PostDeployed => "post-deployed",
        };
        f.write_str(name)
    }
}
