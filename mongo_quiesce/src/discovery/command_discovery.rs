use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::instrument;

use crate::{
    admin_connector::{connect_admin, run_admin_command},
    AdminCommand, AdminConnector, AdminDatabase, ConfigServerDescription, DiscoveryError,
    IsMasterReply, ListShardsReply, MemberState, MongodDescription, MongosDescription,
    QuiesceOptions, ReplSetDescription, ReplSetStatusReply, ShardMapReply, ShardedDescription,
    TopologyDescription, TopologyDiscovery,
};

/// Works out a deployment's shape by asking the seed node, then each shard and config server.
///
/// * A seed answering `isMaster` with `msg: "isdbgrid"` is a mongos: shards come from
///   `listShards`, config servers from `getShardMap`, and the seed is the only known mongos.
/// * A seed reporting a `setName` belongs to a replica set, described by `replSetGetStatus`.
/// * Anything else is a standalone.
///
/// Member connection targets are the `host:port` names the servers report.
pub struct CommandDiscovery {
    connector: Arc<dyn AdminConnector>,
    seed: String,
    timeout: Duration,
}

impl CommandDiscovery {
    pub fn new(
        connector: Arc<dyn AdminConnector>,
        seed: impl Into<String>,
        options: &QuiesceOptions,
    ) -> Self {
        Self {
            connector,
            seed: seed.into(),
            timeout: options.command_timeout(),
        }
    }

    async fn describe_sharded(
        &self,
        seed: &dyn AdminDatabase,
    ) -> Result<TopologyDescription, DiscoveryError> {
        let listed: ListShardsReply =
            run_admin_command(seed, &AdminCommand::ListShards, self.timeout).await?;
        let mut shards = Vec::with_capacity(listed.shards.len());
        for shard in &listed.shards {
            tracing::debug!("Describing shard `{}`", shard.id);
            let host = first_host(&shard.host)?;
            shards.push(self.describe_repl_set(host).await?);
        }

        let shard_map: ShardMapReply =
            run_admin_command(seed, &AdminCommand::GetShardMap, self.timeout).await?;
        let config = shard_map
            .map
            .get("config")
            .ok_or(DiscoveryError::MissingConfigServers)?;
        let config_server = if config.contains('/') {
            ConfigServerDescription::ReplicaSet(self.describe_repl_set(first_host(config)?).await?)
        } else {
            ConfigServerDescription::Single(MongodDescription::standalone(first_host(config)?))
        };

        Ok(TopologyDescription::Sharded(ShardedDescription::new(
            config_server,
            shards,
            vec![MongosDescription::new(self.seed.clone())],
        )))
    }

    #[instrument(level = "debug", skip(self))]
    async fn describe_repl_set(&self, host: &str) -> Result<ReplSetDescription, DiscoveryError> {
        let admin = connect_admin(self.connector.as_ref(), host, self.timeout).await?;
        let status: ReplSetStatusReply =
            run_admin_command(admin.as_ref(), &AdminCommand::ReplSetGetStatus, self.timeout)
                .await?;

        let nodes = status
            .members
            .into_iter()
            .map(|m| {
                let state = MemberState::from(m.state_str);
                MongodDescription::member(m.name.clone(), m.name, state)
            })
            .collect::<Vec<_>>();

        let primary = nodes
            .iter()
            .find(|n| n.state() == Some(&MemberState::Primary))
            .map(|n| n.mongod_uri().to_string())
            .ok_or_else(|| DiscoveryError::NoPrimary(host.to_string()))?;

        Ok(ReplSetDescription::new(primary, nodes)?)
    }
}

#[async_trait]
impl TopologyDiscovery for CommandDiscovery {
    #[instrument(level = "debug", name = "Discover Topology", skip(self), fields(seed = %self.seed))]
    async fn discover(&self) -> Result<TopologyDescription, DiscoveryError> {
        let seed = connect_admin(self.connector.as_ref(), &self.seed, self.timeout).await?;
        let hello: IsMasterReply =
            run_admin_command(seed.as_ref(), &AdminCommand::IsMaster, self.timeout).await?;

        let description = if hello.msg.as_deref() == Some("isdbgrid") {
            self.describe_sharded(seed.as_ref()).await?
        } else if hello.set_name.is_some() {
            TopologyDescription::ReplicaSet(self.describe_repl_set(&self.seed).await?)
        } else {
            TopologyDescription::Standalone(MongodDescription::standalone(self.seed.clone()))
        };

        tracing::info!("Topology discovered");
        Ok(description)
    }
}

/// Returns the first host of a `"<setName>/<host>,<host>"` or `"<host>,<host>"` string.
fn first_host(host_string: &str) -> Result<&str, DiscoveryError> {
    let hosts = match host_string.split_once('/') {
        Some((_set_name, hosts)) => hosts,
        None => host_string,
    };
    hosts
        .split(',')
        .map(str::trim)
        .find(|h| !h.is_empty())
        .ok_or_else(|| DiscoveryError::MalformedHostString(host_string.to_string()))
}
