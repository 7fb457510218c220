use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::{
    admin_connector::{connect_admin, run_admin_command},
    AdminCommand, AdminConnector, MongodDescription, QuiesceError, QuiesceOptions, Topology,
    TopologyVisitor, TraversalReport, UnitKind, UnitOutcome, Visit,
};

/// Runs `fsync` against every mongod in the topology, each through its own connection target.
///
/// Best effort: a failing node doesn't stop the others, but its error is kept in the report.
#[instrument(level = "debug", skip_all)]
pub async fn do_fsync(
    topology: &Topology,
    connector: &dyn AdminConnector,
    options: &QuiesceOptions,
) -> TraversalReport {
    let visitor = FsyncVisitor { connector, options };
    topology.accept(&visitor).await
}

struct FsyncVisitor<'a> {
    connector: &'a dyn AdminConnector,
    options: &'a QuiesceOptions,
}

impl FsyncVisitor<'_> {
    async fn fsync(&self, desc: &MongodDescription) -> Result<(), QuiesceError> {
        let timeout = self.options.command_timeout();
        let admin = connect_admin(self.connector, desc.mongod_uri(), timeout).await?;
        run_admin_command::<Value>(admin.as_ref(), &AdminCommand::Fsync, timeout).await?;
        Ok(())
    }
}

#[async_trait]
impl<'a> TopologyVisitor for FsyncVisitor<'a> {
    async fn visit_mongod_description_pre(&self, desc: &MongodDescription) -> Visit {
        let result = self.fsync(desc).await;
        match &result {
            Ok(()) => tracing::debug!("Flushed `{}`", desc.mongod_uri()),
            Err(e) => tracing::error!(
                "Unable to fsync `{}`. Caused by: {}",
                desc.mongod_uri(),
                e
            ),
        }
        Visit::Done(UnitOutcome::new(desc.mongod_uri(), UnitKind::Mongod, result))
    }
}
