mod admin_connector_error;
mod http_admin_connector;

pub use admin_connector_error::*;
pub use http_admin_connector::*;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::AdminCommand;

/// Opens administrative handles to cluster members by connection target.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    async fn connect(&self, target: &str) -> Result<Box<dyn AdminDatabase>, CommandError>;
}

/// A handle to one member's `admin` database.
#[async_trait]
pub trait AdminDatabase: Send + Sync {
    /// The connection target this handle was opened for.
    fn target(&self) -> &str;

    /// Runs `command` and returns the raw reply. Replies with `ok != 1` are errors.
    async fn run_command(&self, command: &AdminCommand) -> Result<Value, CommandError>;
}

/// Opens a handle to `target`, giving up after `timeout`.
pub(crate) async fn connect_admin(
    connector: &dyn AdminConnector,
    target: &str,
    timeout: Duration,
) -> Result<Box<dyn AdminDatabase>, CommandError> {
    tokio::time::timeout(timeout, connector.connect(target))
        .await
        .map_err(|_| CommandError::Timeout {
            target: target.to_string(),
            command: "connect",
            after: timeout,
        })?
}

/// Runs `command` and deserializes the reply, giving up after `timeout`.
pub(crate) async fn run_admin_command<T: DeserializeOwned>(
    admin: &dyn AdminDatabase,
    command: &AdminCommand,
    timeout: Duration,
) -> Result<T, CommandError> {
    let reply = tokio::time::timeout(timeout, admin.run_command(command))
        .await
        .map_err(|_| CommandError::Timeout {
            target: admin.target().to_string(),
            command: command.name(),
            after: timeout,
        })??;

    tracing::trace!(
        target_uri = admin.target(),
        command = command.name(),
        "Reply: {}",
        &reply
    );

    serde_json::from_value(reply).map_err(|source| CommandError::MalformedReply {
        target: admin.target().to_string(),
        command: command.name(),
        source,
    })
}
