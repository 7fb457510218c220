use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

use crate::{
    admin_connector::{connect_admin, run_admin_command},
    AdminCommand, AdminConnector, InsertReply, MemberState, QuiesceError, QuiesceOptions,
    ReplSetDescription, ReplSetStatusReply, Topology, TopologyVisitor, TraversalReport, UnitKind,
    UnitOutcome, Visit, WriteConcern,
};

/// Waits for every replica set's oplog to be applied on all of its members.
///
/// Each set gets a single journaled insert acknowledged by as many members as the set has. The
/// walk never stops early: every set is attempted, and the report holds one outcome per set.
/// A standalone deployment has no sets, so the report is empty and succeeds.
#[instrument(level = "debug", skip_all)]
pub async fn wait_oplog(
    topology: &Topology,
    connector: &dyn AdminConnector,
    options: &QuiesceOptions,
) -> TraversalReport {
    let visitor = WaitOplogVisitor { connector, options };
    topology.accept(&visitor).await
}

struct WaitOplogVisitor<'a> {
    connector: &'a dyn AdminConnector,
    options: &'a QuiesceOptions,
}

impl WaitOplogVisitor<'_> {
    #[instrument(level = "debug", skip(self, desc), fields(primary = desc.primary_uri()))]
    async fn wait_repl_set(&self, desc: &ReplSetDescription) -> Result<(), QuiesceError> {
        let timeout = self.options.command_timeout();
        let admin = connect_admin(self.connector, desc.primary_uri(), timeout).await?;

        // Every member has to be able to acknowledge the write, or it would never be satisfied.
        let status: ReplSetStatusReply =
            run_admin_command(admin.as_ref(), &AdminCommand::ReplSetGetStatus, timeout).await?;
        if let Some(member) = status
            .members
            .iter()
            .find(|m| !MemberState::from(m.state_str.as_str()).is_stable())
        {
            return Err(QuiesceError::UnstableMember {
                member: member.name.clone(),
                state: MemberState::from(member.state_str.as_str()),
            });
        }

        let flush = AdminCommand::InsertOne {
            collection: self.options.scratch_collection().to_string(),
            document: json!({ "x": "flush" }),
            write_concern: WriteConcern {
                w: desc.nodes().len(),
                j: true,
            },
        };
        let reply: InsertReply = run_admin_command(admin.as_ref(), &flush, timeout).await?;

        if let Some(e) = reply
            .write_concern_error
            .or_else(|| reply.write_errors.into_iter().next())
        {
            return Err(QuiesceError::WriteConcernError {
                member: desc.primary_uri().to_string(),
                code: e.code,
                message: e.errmsg,
            });
        }
        if reply.n != 1 {
            return Err(QuiesceError::WriteConcernFailure {
                expected: 1,
                inserted: reply.n,
            });
        }

        tracing::debug!("Oplog caught up");
        Ok(())
    }
}

#[async_trait]
impl<'a> TopologyVisitor for WaitOplogVisitor<'a> {
    async fn visit_repl_set_description_pre(&self, desc: &ReplSetDescription) -> Visit {
        let result = self.wait_repl_set(desc).await;
        if let Err(e) = &result {
            tracing::error!(
                "Unable to wait for the oplog of `{}`. Caused by: {}",
                desc.primary_uri(),
                e
            );
        }
        Visit::Done(UnitOutcome::new(
            desc.primary_uri(),
            UnitKind::ReplicaSet,
            result,
        ))
    }
}
