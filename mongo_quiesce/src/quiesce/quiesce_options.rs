use std::time::Duration;

use tracing::instrument;

use crate::OptionsError;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_SCRATCH_COLLECTION: &str = "wait_oplog";

/// Settings shared by discovery, the quiesce protocols and [`HttpAdminConnector`](crate::HttpAdminConnector).
#[derive(Debug, Clone)]
pub struct QuiesceOptions {
    command_timeout: Duration,
    scratch_collection: String,
    require_https: bool,
}

impl QuiesceOptions {
    pub fn builder() -> QuiesceOptionsBuilder {
        QuiesceOptionsBuilder::default()
    }

    /// Upper bound on every connect and every admin command. An unhealthy member can't hang a
    /// quiesce call for longer than this per command.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Collection in the `admin` database that receives the oplog-wait sentinel write.
    pub fn scratch_collection(&self) -> &str {
        &self.scratch_collection
    }

    pub fn require_https(&self) -> bool {
        self.require_https
    }
}

#[derive(Debug)]
pub struct QuiesceOptionsBuilder {
    command_timeout: Duration,
    scratch_collection: String,
    require_https: bool,
}

impl QuiesceOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn set_scratch_collection(mut self, collection: &str) -> Self {
        self.scratch_collection = collection.to_string();
        self
    }

    pub fn set_require_https(mut self, require_https: bool) -> Self {
        self.require_https = require_https;
        self
    }

    /// Validates the settings and returns a new [`QuiesceOptions`].
    ///
    /// The builder isn't consumed, so it can act as a template for several option sets.
    #[instrument(level = "debug", name = "Build QuiesceOptions", skip(self))]
    pub fn build(&self) -> Result<QuiesceOptions, OptionsError> {
        if self.command_timeout.is_zero() {
            tracing::error!("A zero command timeout would fail every command");
            return Err(OptionsError::ZeroCommandTimeout);
        }

        if self.scratch_collection.trim().is_empty() {
            return Err(OptionsError::EmptyScratchCollection);
        }

        let options = QuiesceOptions {
            command_timeout: self.command_timeout,
            scratch_collection: self.scratch_collection.clone(),
            require_https: self.require_https,
        };
        tracing::trace!("Quiesce options: {:?}", &options);

        Ok(options)
    }
}

impl Default for QuiesceOptionsBuilder {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            scratch_collection: DEFAULT_SCRATCH_COLLECTION.to_string(),
            require_https: false,
        }
    }
}
