use crate::{error_chain_fmt, CommandError, DiscoveryError, MemberState};

#[derive(thiserror::Error)]
pub enum QuiesceError {
    #[error("Cannot quiesce: discovery failed")]
    DiscoveryFailure(#[from] DiscoveryError),
    #[error("Cannot wait oplog, replset member `{member}` is {state}")]
    UnstableMember { member: String, state: MemberState },
    #[error("Write concern not satisfied: expected {expected} document inserted, got {inserted}")]
    WriteConcernFailure { expected: i64, inserted: i64 },
    #[error("Write concern not satisfied by `{member}`: {message} (code {code})")]
    WriteConcernError {
        member: String,
        code: i64,
        message: String,
    },
    #[error(transparent)]
    CommandError(#[from] CommandError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for QuiesceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum OptionsError {
    #[error("Command timeout must be greater than zero")]
    ZeroCommandTimeout,
    #[error("Scratch collection name must not be empty")]
    EmptyScratchCollection,
}
impl std::fmt::Debug for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
