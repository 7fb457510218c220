use crate::{error_chain_fmt, CommandError, TopologyError};

#[derive(thiserror::Error)]
pub enum DiscoveryError {
    #[error("Replica set behind `{0}` reports no primary")]
    NoPrimary(String),
    #[error("Unable to parse host string `{0}`")]
    MalformedHostString(String),
    #[error("Config servers missing from the shard map")]
    MissingConfigServers,
    #[error("Discovered topology is invalid")]
    InvalidTopology(#[from] TopologyError),
    #[error("A discovery command failed")]
    CommandError(#[from] CommandError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
