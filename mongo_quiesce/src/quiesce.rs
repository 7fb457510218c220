mod fsync;
mod quiesce_error;
mod quiesce_options;
mod wait_oplog;

pub use fsync::*;
pub use quiesce_error::*;
pub use quiesce_options::*;
pub use wait_oplog::*;

use tracing::{instrument, Span};
use uuid::Uuid;

use crate::{AdminConnector, Topology, TopologyDescription, TopologyDiscovery, TraversalReport};

/// Everything one [`quiesce`] call did.
#[derive(Debug)]
pub struct QuiesceReport {
    topology: TopologyDescription,
    oplog: TraversalReport,
    fsync: TraversalReport,
}

impl QuiesceReport {
    /// Whether every replica set caught up its oplog.
    ///
    /// Fsync failures are not folded in. Inspect [`QuiesceReport::fsync`] for those.
    pub fn success(&self) -> bool {
        self.oplog.succeeded()
    }

    pub fn topology(&self) -> &TopologyDescription {
        &self.topology
    }

    /// One outcome per replica set.
    pub fn oplog(&self) -> &TraversalReport {
        &self.oplog
    }

    /// One outcome per mongod.
    pub fn fsync(&self) -> &TraversalReport {
        &self.fsync
    }
}

/// Quiesces the deployment behind `discovery`, whatever its shape.
///
/// Discovers the topology exactly once, waits for every replica set's oplog, then fsyncs every
/// mongod. The fsync pass runs even if the oplog wait failed. Only discovery failure is an `Err`.
/// Everything else is reported per unit. Nothing is retried.
#[instrument(
    level = "debug",
    name = "Quiesce",
    skip_all,
    fields(correlation_id)
)]
pub async fn quiesce<D>(
    discovery: &D,
    connector: &dyn AdminConnector,
    options: &QuiesceOptions,
) -> Result<QuiesceReport, QuiesceError>
where
    D: TopologyDiscovery + ?Sized,
{
    Span::current().record("correlation_id", Uuid::new_v4().to_string());

    let description = discovery.discover().await.map_err(|e| {
        tracing::error!("Cannot quiesce, discovery failed. Caused by: {}", e);
        QuiesceError::DiscoveryFailure(e)
    })?;
    let topology = Topology::new(description);

    let oplog = wait_oplog(&topology, connector, options).await;
    let fsync = do_fsync(&topology, connector, options).await;

    if oplog.succeeded() {
        tracing::info!("Quiesce complete");
    } else {
        tracing::error!(
            "Quiesce finished with {} replica set(s) not caught up",
            oplog.failures().count()
        );
    }

    Ok(QuiesceReport {
        topology: topology.description().clone(),
        oplog,
        fsync,
    })
}

/// Shorthand for [`quiesce`] when only the overall outcome matters.
pub async fn quiesce_succeeded<D>(
    discovery: &D,
    connector: &dyn AdminConnector,
    options: &QuiesceOptions,
) -> Result<bool, QuiesceError>
where
    D: TopologyDiscovery + ?Sized,
{
    Ok(quiesce(discovery, connector, options).await?.success())
}
