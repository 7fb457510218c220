//! Administrative commands sent to cluster members, and the replies the quiesce protocols read.
//!
//! Commands are plain documents in the server's command shape, so any transport that can carry a
//! JSON document to a member's `admin` database can implement [`AdminDatabase`](crate::AdminDatabase).
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Acknowledgement requirement attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteConcern {
    /// Number of members that must acknowledge the write.
    pub w: usize,
    /// Whether the write must reach the on-disk journal before it's acknowledged.
    pub j: bool,
}

/// Represents all commands the quiesce protocols and discovery send to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    IsMaster,
    ReplSetGetStatus,
    ListShards,
    GetShardMap,
    Fsync,
    InsertOne {
        collection: String,
        document: Value,
        write_concern: WriteConcern,
    },
}

impl AdminCommand {
    pub fn name(&self) -> &'static str {
        match self {
            AdminCommand::IsMaster => "isMaster",
            AdminCommand::ReplSetGetStatus => "replSetGetStatus",
            AdminCommand::ListShards => "listShards",
            AdminCommand::GetShardMap => "getShardMap",
            AdminCommand::Fsync => "fsync",
            AdminCommand::InsertOne { .. } => "insert",
        }
    }

    /// Returns the command document as the server expects it.
    pub fn to_document(&self) -> Value {
        match self {
            AdminCommand::InsertOne {
                collection,
                document,
                write_concern,
            } => json!({
                "insert": collection,
                "documents": [document],
                "writeConcern": write_concern,
            }),
            other => {
                let mut document = Map::new();
                document.insert(other.name().to_string(), json!(1));
                Value::Object(document)
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsMasterReply {
    /// `"isdbgrid"` when the seed is a mongos.
    pub msg: Option<String>,
    pub set_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReplSetStatusReply {
    #[serde(default)]
    pub members: Vec<ReplSetMemberStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplSetMemberStatus {
    pub name: String,
    pub state_str: String,
}

/// Reply to an `insert`. A server can accept the document (`n: 1`, `ok: 1`) and still fail the
/// write concern, which it reports in `writeConcernError`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertReply {
    #[serde(default)]
    pub n: i64,
    #[serde(default)]
    pub write_errors: Vec<WriteErrorReply>,
    pub write_concern_error: Option<WriteErrorReply>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteErrorReply {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub errmsg: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListShardsReply {
    #[serde(default)]
    pub shards: Vec<ShardEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShardEntry {
    #[serde(rename = "_id")]
    pub id: String,
    /// `"<setName>/<host>,<host>"` for replica-set shards.
    pub host: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShardMapReply {
    #[serde(default)]
    pub map: HashMap<String, String>,
}
