/*!
mongo_quiesce brings a MongoDB deployment to a flushed, steady state between the phases of a
benchmark, so leftover replication and dirty pages don't bleed into the next measurement.

The deployment may be a standalone mongod, a replica set, or a sharded cluster. Callers never
branch on that: a [`Topology`] is walked with a [`TopologyVisitor`], and the two quiesce
protocols are visitors over it.

* [`wait_oplog`] issues a journaled write acknowledged by every member of every replica set.
* [`do_fsync`] runs `fsync` against every mongod process.
* [`quiesce`] discovers the topology once, runs both, and returns a [`QuiesceReport`].

A single unhealthy member never aborts the walk. Per-unit failures are collected in the report
and the caller decides what to do with them.

# Example
[`HttpAdminConnector`] talks to a JSON command gateway, not to mongod directly, so
`localhost:27017` below must be a gateway fronting the seed member. Each member the seed reports
needs its own gateway at the same `host:port`.
```rust,no_run
# tokio_test::block_on(async {
use std::sync::Arc;

use mongo_quiesce::{quiesce, CommandDiscovery, HttpAdminConnector, QuiesceOptions};

let options = QuiesceOptions::builder().build().unwrap();
let connector = Arc::new(HttpAdminConnector::new(&options).unwrap());
let discovery = CommandDiscovery::new(connector.clone(), "localhost:27017", &options);

let report = quiesce(&discovery, connector.as_ref(), &options).await.unwrap();
assert!(report.success());
# })
```
*/

mod admin_command;
mod admin_connector;
mod discovery;
mod quiesce;
mod topology;
mod topology_description;

#[cfg(test)]
mod test_support;

pub use admin_command::*;
pub use admin_connector::*;
pub use discovery::*;
pub use quiesce::*;
pub use topology::*;
pub use topology_description::*;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
