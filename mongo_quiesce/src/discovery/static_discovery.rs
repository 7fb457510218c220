use anyhow::Context;
use async_trait::async_trait;

use crate::{DiscoveryError, TopologyDescription, TopologyDiscovery};

/// Hands back a description that was captured ahead of time.
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    description: TopologyDescription,
}

impl StaticDiscovery {
    pub fn new(description: TopologyDescription) -> Self {
        Self { description }
    }

    /// Reads a description from its JSON form, checking replica set invariants on the way.
    pub fn from_json(json: &str) -> Result<Self, DiscoveryError> {
        let description = serde_json::from_str::<TopologyDescription>(json)
            .context("Unable to deserialize topology description")?;
        Ok(Self::new(description))
    }
}

#[async_trait]
impl TopologyDiscovery for StaticDiscovery {
    async fn discover(&self) -> Result<TopologyDescription, DiscoveryError> {
        Ok(self.description.clone())
    }
}
