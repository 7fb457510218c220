use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error_chain_fmt;

/// A snapshot of a deployment's shape, taken once by discovery and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologyDescription {
    Standalone(MongodDescription),
    ReplicaSet(ReplSetDescription),
    Sharded(ShardedDescription),
}

/// State a replica set member reports in `replSetGetStatus.members[].stateStr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemberState {
    Primary,
    Secondary,
    Arbiter,
    Other(String),
}

impl MemberState {
    /// Whether a write concern counting this member can be satisfied.
    pub fn is_stable(&self) -> bool {
        !matches!(self, MemberState::Other(_))
    }
}

impl From<&str> for MemberState {
    fn from(state: &str) -> Self {
        match state {
            "PRIMARY" => MemberState::Primary,
            "SECONDARY" => MemberState::Secondary,
            "ARBITER" => MemberState::Arbiter,
            other => MemberState::Other(other.to_string()),
        }
    }
}

impl From<String> for MemberState {
    fn from(state: String) -> Self {
        MemberState::from(state.as_str())
    }
}

impl From<MemberState> for String {
    fn from(state: MemberState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberState::Primary => f.write_str("PRIMARY"),
            MemberState::Secondary => f.write_str("SECONDARY"),
            MemberState::Arbiter => f.write_str("ARBITER"),
            MemberState::Other(state) => f.write_str(state),
        }
    }
}

/// A single mongod process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MongodDescription {
    name: String,
    mongod_uri: String,
    /// `None` for processes that are not part of a replica set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<MemberState>,
}

impl MongodDescription {
    pub fn standalone(mongod_uri: impl Into<String>) -> Self {
        let mongod_uri = mongod_uri.into();
        Self {
            name: mongod_uri.clone(),
            mongod_uri,
            state: None,
        }
    }

    pub fn member(
        name: impl Into<String>,
        mongod_uri: impl Into<String>,
        state: MemberState,
    ) -> Self {
        Self {
            name: name.into(),
            mongod_uri: mongod_uri.into(),
            state: Some(state),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection target for commands addressed to this process alone.
    pub fn mongod_uri(&self) -> &str {
        &self.mongod_uri
    }

    pub fn state(&self) -> Option<&MemberState> {
        self.state.as_ref()
    }
}

/// A replica set: where to send set-wide commands, plus its members in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReplSetDescription")]
pub struct ReplSetDescription {
    primary_uri: String,
    nodes: Vec<MongodDescription>,
}

#[derive(Deserialize)]
struct RawReplSetDescription {
    primary_uri: String,
    nodes: Vec<MongodDescription>,
}

impl TryFrom<RawReplSetDescription> for ReplSetDescription {
    type Error = TopologyError;

    fn try_from(raw: RawReplSetDescription) -> Result<Self, Self::Error> {
        ReplSetDescription::new(raw.primary_uri, raw.nodes)
    }
}

impl ReplSetDescription {
    /// Builds a replica set description, checking that it has members, at most one of them
    /// reports `PRIMARY`, and `primary_uri` names one of them.
    pub fn new(
        primary_uri: impl Into<String>,
        nodes: Vec<MongodDescription>,
    ) -> Result<Self, TopologyError> {
        let primary_uri = primary_uri.into();

        if nodes.is_empty() {
            return Err(TopologyError::EmptyReplicaSet(primary_uri));
        }

        let primaries = nodes
            .iter()
            .filter(|n| n.state() == Some(&MemberState::Primary))
            .count();
        if primaries > 1 {
            return Err(TopologyError::MultiplePrimaries {
                primary_uri,
                count: primaries,
            });
        }

        if !nodes
            .iter()
            .any(|n| n.mongod_uri() == primary_uri || n.name() == primary_uri)
        {
            return Err(TopologyError::PrimaryNotAMember(primary_uri));
        }

        Ok(Self { primary_uri, nodes })
    }

    /// Connection target for commands addressed to the set as a whole.
    pub fn primary_uri(&self) -> &str {
        &self.primary_uri
    }

    pub fn nodes(&self) -> &[MongodDescription] {
        &self.nodes
    }
}

/// A routing process. Never the target of a quiesce command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongosDescription {
    mongos_uri: String,
}

impl MongosDescription {
    pub fn new(mongos_uri: impl Into<String>) -> Self {
        Self {
            mongos_uri: mongos_uri.into(),
        }
    }

    pub fn mongos_uri(&self) -> &str {
        &self.mongos_uri
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigServerDescription {
    ReplicaSet(ReplSetDescription),
    Single(MongodDescription),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardedDescription {
    config_server: ConfigServerDescription,
    shards: Vec<ReplSetDescription>,
    #[serde(default)]
    mongoses: Vec<MongosDescription>,
}

impl ShardedDescription {
    pub fn new(
        config_server: ConfigServerDescription,
        shards: Vec<ReplSetDescription>,
        mongoses: Vec<MongosDescription>,
    ) -> Self {
        Self {
            config_server,
            shards,
            mongoses,
        }
    }

    pub fn config_server(&self) -> &ConfigServerDescription {
        &self.config_server
    }

    pub fn shards(&self) -> &[ReplSetDescription] {
        &self.shards
    }

    pub fn mongoses(&self) -> &[MongosDescription] {
        &self.mongoses
    }
}

#[derive(thiserror::Error)]
pub enum TopologyError {
    #[error("Replica set `{0}` has no members")]
    EmptyReplicaSet(String),
    #[error("Replica set `{primary_uri}` reports {count} primaries")]
    MultiplePrimaries { primary_uri: String, count: usize },
    #[error("Primary `{0}` is not a member of its own replica set")]
    PrimaryNotAMember(String),
}
impl std::fmt::Debug for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
