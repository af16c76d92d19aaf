// ABOUTME: Deployment pipeline: phases, the facade seam and the orchestrator driving it.
// ABOUTME: Backends plug in through FacadeFactory; the orchestrator never names one.

mod error;
mod facade;
mod orchestrator;
mod spec;
mod state;

pub use error::{DeployError, DeployErrorKind, FacadeBuildError, PhaseError, PhaseResultExt};
pub use facade::{DeployFacade, FacadeFactory};
pub use orchestrator::{DeployReport, ERROR_MARKER, FailurePolicy, Orchestrator, PhaseOutcome};
pub use spec::DeploymentSpec;
pub use state::{FacadeState, Phase};
