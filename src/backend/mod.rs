// ABOUTME: Docker-engine backend: the engine capability trait, its bollard implementation,
// ABOUTME: and the facade that maps the deployment phases onto engine calls.

mod bollard;
mod engine;
mod facade;
mod workload;

pub use self::bollard::BollardEngine;
pub use engine::{
    ContainerStatus, EngineError, EngineOps, Health, PortBinding, PullCredentials, WorkloadSpec,
};
pub use facade::{EngineFacade, EngineFacadeFactory};
pub use workload::{
    LABEL_IMAGE, LABEL_ISSUER, LABEL_MANAGED, LABEL_PREFIX, LABEL_REQUEST, LABEL_ROUTE_HOST,
    LABEL_ROUTE_PORT, LABEL_ROUTE_TLS, is_engine_network_mode,
};
