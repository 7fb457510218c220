use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::{AdminCommand, AdminConnector, AdminDatabase, CommandError, QuiesceOptions};

/// Sends admin commands as JSON documents to an HTTP command gateway in front of each member.
///
/// mongod itself doesn't serve HTTP. Every target must be a gateway that accepts a command
/// document on `POST /admin/command`, runs it against the `admin` database of the member it
/// fronts, and answers with the server's reply as JSON. Pointing this connector at a plain
/// mongod port fails with [`CommandError::Transport`]. Use another [`AdminConnector`] to speak
/// the wire protocol directly.
///
/// Every member target is resolved to `<scheme>://<host>:<port>/` and commands are POSTed to
/// `admin/command` below it. Bare `host:port` targets, as reported by `replSetGetStatus`, and
/// `mongodb://host:port` URIs use `https` when [`QuiesceOptions::require_https`] is set and
/// `http` otherwise.
#[derive(Debug, Clone)]
pub struct HttpAdminConnector {
    client: reqwest::Client,
    require_https: bool,
}

impl HttpAdminConnector {
    pub fn new(options: &QuiesceOptions) -> Result<Self, CommandError> {
        // Reqwest client maintains an internal connection pool. Every handle shares it.
        let client = reqwest::Client::builder()
            .timeout(options.command_timeout())
            .build()
            .context("Unable to build the HTTP client")?;

        Ok(Self {
            client,
            require_https: options.require_https(),
        })
    }

    /// Converts a connection target into the base [`Url`] of its command gateway.
    fn resolve_target(&self, target: &str) -> Result<Url, CommandError> {
        let desired_scheme = if self.require_https { "https" } else { "http" };
        let invalid = |reason: String| CommandError::InvalidTarget {
            target: target.to_string(),
            reason,
        };

        let url = if target.contains("://") {
            let parsed = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
            match parsed.scheme() {
                "http" | "https" => parsed,
                "mongodb" => {
                    let host = parsed
                        .host_str()
                        .ok_or_else(|| invalid("missing host".to_string()))?;
                    let authority = match parsed.port() {
                        Some(port) => format!("{}:{}", host, port),
                        None => host.to_string(),
                    };
                    Url::parse(&format!("{}://{}/", desired_scheme, authority))
                        .map_err(|e| invalid(e.to_string()))?
                }
                other => return Err(invalid(format!("unsupported scheme `{}`", other))),
            }
        } else {
            Url::parse(&format!("{}://{}/", desired_scheme, target))
                .map_err(|e| invalid(e.to_string()))?
        };

        if url.scheme() != desired_scheme {
            return Err(invalid(format!("expected an {} target", desired_scheme)));
        }

        Ok(url)
    }
}

#[async_trait]
impl AdminConnector for HttpAdminConnector {
    async fn connect(&self, target: &str) -> Result<Box<dyn AdminDatabase>, CommandError> {
        let endpoint = self
            .resolve_target(target)?
            .join("admin/command")
            .map_err(|e| CommandError::InvalidTarget {
                target: target.to_string(),
                reason: e.to_string(),
            })?;
        tracing::trace!("Resolved `{}` to {}", target, &endpoint);

        Ok(Box::new(HttpAdminDatabase {
            client: self.client.clone(),
            target: target.to_string(),
            endpoint,
        }))
    }
}

#[derive(Debug)]
pub struct HttpAdminDatabase {
    client: reqwest::Client,
    target: String,
    endpoint: Url,
}

#[async_trait]
impl AdminDatabase for HttpAdminDatabase {
    fn target(&self) -> &str {
        &self.target
    }

    #[instrument(level = "debug", skip(self), fields(target_uri = %self.target))]
    async fn run_command(&self, command: &AdminCommand) -> Result<Value, CommandError> {
        let transport = |source| CommandError::Transport {
            target: self.target.clone(),
            source,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&command.to_document())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CommandError::CommandFailed {
                target: self.target.clone(),
                command: command.name(),
                message: format!("HTTP status {}", status),
            });
        }

        let reply = response.json::<Value>().await.map_err(transport)?;

        let ok = reply
            .get("ok")
            .and_then(Value::as_f64)
            .map_or(false, |ok| ok >= 1.0);
        if !ok {
            let message = reply
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or("command replied with ok: 0")
                .to_string();
            return Err(CommandError::CommandFailed {
                target: self.target.clone(),
                command: command.name(),
                message,
            });
        }

        Ok(reply)
    }
}
