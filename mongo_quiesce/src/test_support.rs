//! In-memory collaborators for unit tests.
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    AdminCommand, AdminConnector, AdminDatabase, CommandError, ConfigServerDescription,
    MemberState, MongodDescription, MongosDescription, ReplSetDescription, ShardedDescription,
    TopologyDescription,
};

pub(crate) fn standalone(uri: &str) -> TopologyDescription {
    TopologyDescription::Standalone(MongodDescription::standalone(uri))
}

/// A replica set named `<prefix>-<i>:27017`, one member per state. The primary target is the
/// member reporting `PRIMARY`, or the first member if none does.
pub(crate) fn repl_set(prefix: &str, states: &[&str]) -> ReplSetDescription {
    let nodes = states
        .iter()
        .enumerate()
        .map(|(i, state)| {
            let host = format!("{}-{}:27017", prefix, i);
            MongodDescription::member(host.clone(), host, MemberState::from(*state))
        })
        .collect::<Vec<_>>();
    let primary = nodes
        .iter()
        .find(|n| n.state() == Some(&MemberState::Primary))
        .unwrap_or(&nodes[0])
        .mongod_uri()
        .to_string();
    ReplSetDescription::new(primary, nodes).unwrap()
}

pub(crate) fn sharded(config: ReplSetDescription, shards: Vec<ReplSetDescription>) -> TopologyDescription {
    TopologyDescription::Sharded(ShardedDescription::new(
        ConfigServerDescription::ReplicaSet(config),
        shards,
        vec![MongosDescription::new("mongos:27017")],
    ))
}

/// A `replSetGetStatus` reply listing the members of `desc` with the given states.
pub(crate) fn status_reply(desc: &ReplSetDescription, states: &[&str]) -> Value {
    let members = desc
        .nodes()
        .iter()
        .zip(states)
        .map(|(node, state)| json!({ "name": node.name(), "stateStr": state }))
        .collect::<Vec<_>>();
    json!({ "ok": 1, "members": members })
}

/// A `replSetGetStatus` reply echoing the states recorded in `desc`.
pub(crate) fn healthy_status_reply(desc: &ReplSetDescription) -> Value {
    let states = desc
        .nodes()
        .iter()
        .map(|n| n.state().map(ToString::to_string).unwrap_or_default())
        .collect::<Vec<_>>();
    let states = states.iter().map(String::as_str).collect::<Vec<_>>();
    status_reply(desc, &states)
}

#[derive(Default)]
struct MockState {
    replies: HashMap<(String, &'static str), Result<Value, String>>,
    unreachable: HashSet<String>,
    hung: HashSet<String>,
    calls: Vec<(String, AdminCommand)>,
    connects: Vec<String>,
}

/// Answers admin commands from canned replies and records every command it receives.
///
/// Unconfigured commands reply `{ok: 1}`, except inserts which reply `{n: 1, ok: 1}`.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub(crate) fn reply(&self, target: &str, command: &'static str, reply: Value) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .insert((target.to_string(), command), Ok(reply));
        self
    }

    pub(crate) fn fail(&self, target: &str, command: &'static str, message: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .insert((target.to_string(), command), Err(message.to_string()));
        self
    }

    /// Refuses connections to `target`.
    pub(crate) fn unreachable(&self, target: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .unreachable
            .insert(target.to_string());
        self
    }

    /// Accepts connections to `target` but never answers a command.
    pub(crate) fn hung(&self, target: &str) -> &Self {
        self.state.lock().unwrap().hung.insert(target.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, AdminCommand)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn calls_named(&self, command: &str) -> Vec<(String, AdminCommand)> {
        self.calls()
            .into_iter()
            .filter(|(_, c)| c.name() == command)
            .collect()
    }

    pub(crate) fn connects(&self) -> Vec<String> {
        self.state.lock().unwrap().connects.clone()
    }
}

#[async_trait]
impl AdminConnector for MockConnector {
    async fn connect(&self, target: &str) -> Result<Box<dyn AdminDatabase>, CommandError> {
        let mut state = self.state.lock().unwrap();
        state.connects.push(target.to_string());
        if state.unreachable.contains(target) {
            return Err(CommandError::UnexpectedError(anyhow::anyhow!(
                "connection refused"
            )));
        }
        Ok(Box::new(MockDatabase {
            target: target.to_string(),
            state: self.state.clone(),
        }))
    }
}

struct MockDatabase {
    target: String,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl AdminDatabase for MockDatabase {
    fn target(&self) -> &str {
        &self.target
    }

    async fn run_command(&self, command: &AdminCommand) -> Result<Value, CommandError> {
        let (reply, hung) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((self.target.clone(), command.clone()));
            (
                state
                    .replies
                    .get(&(self.target.clone(), command.name()))
                    .cloned(),
                state.hung.contains(&self.target),
            )
        };

        if hung {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        match reply {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(CommandError::CommandFailed {
                target: self.target.clone(),
                command: command.name(),
                message,
            }),
            None => match command {
                AdminCommand::InsertOne { .. } => Ok(json!({ "n": 1, "ok": 1 })),
                _ => Ok(json!({ "ok": 1 })),
            },
        }
    }
}
