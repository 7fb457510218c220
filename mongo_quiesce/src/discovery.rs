mod command_discovery;
mod discovery_error;
mod static_discovery;

pub use command_discovery::*;
pub use discovery_error::*;
pub use static_discovery::*;

use async_trait::async_trait;

use crate::TopologyDescription;

/// Produces the current shape of a deployment.
#[async_trait]
pub trait TopologyDiscovery: Send + Sync {
    async fn discover(&self) -> Result<TopologyDescription, DiscoveryError>;
}
