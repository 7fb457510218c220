use std::time::Duration;

use crate::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum CommandError {
    #[error("Invalid connection target `{target}`: {reason}")]
    InvalidTarget { target: String, reason: String },
    #[error("Unable to reach `{target}`")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Command `{command}` failed on `{target}`: {message}")]
    CommandFailed {
        target: String,
        command: &'static str,
        message: String,
    },
    #[error("Command `{command}` on `{target}` timed out after {after:?}")]
    Timeout {
        target: String,
        command: &'static str,
        after: Duration,
    },
    #[error("Malformed reply to `{command}` from `{target}`")]
    MalformedReply {
        target: String,
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
