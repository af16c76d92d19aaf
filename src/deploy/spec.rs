// ABOUTME: Immutable bundle a facade is built from.
// ABOUTME: Carries the resolved image locator and the cancellation token for one attempt.

use tokio_util::sync::CancellationToken;

use crate::request::{ContainerConfig, InstanceConfig, RegistryAuth};
use crate::types::{ImageLocator, Principal, RequestId};

/// Everything a backend needs to deploy one request.
#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    pub request_id: RequestId,
    pub cancel: CancellationToken,
    pub image: ImageLocator,
    pub instance: InstanceConfig,
    pub container: ContainerConfig,
    /// Runtime config payload as text; empty when the request had none.
    pub runtime_config: String,
    pub issuer: Principal,
    /// Credentials for pulling `image`, when the registry needs them.
    pub registry_auth: Option<RegistryAuth>,
}

impl DeploymentSpec {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
