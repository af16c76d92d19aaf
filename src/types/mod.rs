// ABOUTME: Validated domain types shared by requests, the pipeline and the engine backend.
// ABOUTME: Phantom-typed ids keep engine identifiers from being mixed up.

mod container_name;
mod id;
mod image_locator;
mod request_id;

pub use container_name::{ContainerName, ContainerNameError};
pub use id::{ContainerId, NetworkId};
pub use image_locator::{DEFAULT_TAG, ImageLocator, ParseImageLocatorError};
pub use request_id::{Principal, RequestId, RequestIdError};
