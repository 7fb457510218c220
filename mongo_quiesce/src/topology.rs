use async_trait::async_trait;
use tracing::instrument;

use crate::{
    ConfigServerDescription, MongodDescription, QuiesceError, ReplSetDescription,
    ShardedDescription, TopologyDescription,
};

/// Which kind of node a [`UnitOutcome`] was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Mongod,
    ReplicaSet,
    ShardedCluster,
}

/// The result of one visitor hook acting on one node.
#[derive(Debug)]
pub struct UnitOutcome {
    pub target: String,
    pub kind: UnitKind,
    pub result: Result<(), QuiesceError>,
}

impl UnitOutcome {
    pub fn new(target: impl Into<String>, kind: UnitKind, result: Result<(), QuiesceError>) -> Self {
        Self {
            target: target.into(),
            kind,
            result,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// What a visitor hook did with the node it was handed.
#[derive(Debug)]
pub enum Visit {
    /// The hook doesn't act on this node.
    Skipped,
    Done(UnitOutcome),
}

/// Role-specific callbacks invoked by [`Topology::accept`].
///
/// Every hook is a no-op by default, so a visitor only implements the hooks for the node kind it
/// acts on. Failures are returned as a [`Visit::Done`] carrying an error, never by aborting the
/// walk, so every node is always visited.
#[async_trait]
pub trait TopologyVisitor: Send + Sync {
    async fn visit_mongod_description_pre(&self, _desc: &MongodDescription) -> Visit {
        Visit::Skipped
    }

    async fn visit_mongod_description_post(&self, _desc: &MongodDescription) -> Visit {
        Visit::Skipped
    }

    async fn visit_repl_set_description_pre(&self, _desc: &ReplSetDescription) -> Visit {
        Visit::Skipped
    }

    async fn visit_repl_set_description_post(&self, _desc: &ReplSetDescription) -> Visit {
        Visit::Skipped
    }

    async fn visit_sharded_description_pre(&self, _desc: &ShardedDescription) -> Visit {
        Visit::Skipped
    }

    async fn visit_sharded_description_post(&self, _desc: &ShardedDescription) -> Visit {
        Visit::Skipped
    }
}

/// Every outcome produced during one walk, in traversal order.
#[derive(Debug, Default)]
pub struct TraversalReport {
    outcomes: Vec<UnitOutcome>,
}

impl TraversalReport {
    fn record(&mut self, visit: Visit) {
        if let Visit::Done(outcome) = visit {
            self.outcomes.push(outcome);
        }
    }

    /// True when no unit failed. Vacuously true when no unit was acted on.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(UnitOutcome::is_success)
    }

    pub fn outcomes(&self) -> &[UnitOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn into_outcomes(self) -> Vec<UnitOutcome> {
        self.outcomes
    }
}

/// Owns a discovered [`TopologyDescription`] and walks it for visitors.
#[derive(Debug, Clone)]
pub struct Topology {
    description: TopologyDescription,
}

impl Topology {
    pub fn new(description: TopologyDescription) -> Self {
        Self { description }
    }

    pub fn description(&self) -> &TopologyDescription {
        &self.description
    }

    /// Walks the whole topology, calling `visitor`'s hooks in a fixed order.
    ///
    /// * Standalone: the mongod hooks.
    /// * Replica set: set pre, then each member's mongod hooks, then set post.
    /// * Sharded: cluster pre, the config servers, each shard as a replica set, cluster post.
    ///   Mongos processes are not visited.
    #[instrument(level = "debug", skip_all)]
    pub async fn accept<V>(&self, visitor: &V) -> TraversalReport
    where
        V: TopologyVisitor + ?Sized,
    {
        let mut report = TraversalReport::default();

        match &self.description {
            TopologyDescription::Standalone(mongod) => {
                walk_mongod(visitor, mongod, &mut report).await;
            }
            TopologyDescription::ReplicaSet(repl_set) => {
                walk_repl_set(visitor, repl_set, &mut report).await;
            }
            TopologyDescription::Sharded(sharded) => {
                report.record(visitor.visit_sharded_description_pre(sharded).await);

                match sharded.config_server() {
                    ConfigServerDescription::ReplicaSet(repl_set) => {
                        walk_repl_set(visitor, repl_set, &mut report).await;
                    }
                    ConfigServerDescription::Single(mongod) => {
                        walk_mongod(visitor, mongod, &mut report).await;
                    }
                }
                for shard in sharded.shards() {
                    walk_repl_set(visitor, shard, &mut report).await;
                }

                report.record(visitor.visit_sharded_description_post(sharded).await);
            }
        }

        report
    }

    /// Every replica set in the topology, config servers first.
    pub fn repl_sets(&self) -> Vec<&ReplSetDescription> {
        match &self.description {
            TopologyDescription::Standalone(_) => Vec::new(),
            TopologyDescription::ReplicaSet(repl_set) => vec![repl_set],
            TopologyDescription::Sharded(sharded) => {
                let config = match sharded.config_server() {
                    ConfigServerDescription::ReplicaSet(repl_set) => Some(repl_set),
                    ConfigServerDescription::Single(_) => None,
                };
                config.into_iter().chain(sharded.shards()).collect()
            }
        }
    }

    /// Number of mongod processes, excluding mongos.
    pub fn mongod_count(&self) -> usize {
        let standalone = match &self.description {
            TopologyDescription::Standalone(_) => 1,
            TopologyDescription::Sharded(sharded) => match sharded.config_server() {
                ConfigServerDescription::Single(_) => 1,
                ConfigServerDescription::ReplicaSet(_) => 0,
            },
            TopologyDescription::ReplicaSet(_) => 0,
        };
        standalone + self.repl_sets().iter().map(|rs| rs.nodes().len()).sum::<usize>()
    }
}

async fn walk_mongod<V>(visitor: &V, mongod: &MongodDescription, report: &mut TraversalReport)
where
    V: TopologyVisitor + ?Sized,
{
    report.record(visitor.visit_mongod_description_pre(mongod).await);
    report.record(visitor.visit_mongod_description_post(mongod).await);
}

async fn walk_repl_set<V>(visitor: &V, repl_set: &ReplSetDescription, report: &mut TraversalReport)
where
    V: TopologyVisitor + ?Sized,
{
    report.record(visitor.visit_repl_set_description_pre(repl_set).await);
    for mongod in repl_set.nodes() {
        walk_mongod(visitor, mongod, report).await;
    }
    report.record(visitor.visit_repl_set_description_post(repl_set).await);
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use std::sync::Mutex;

    use super::*;
    use crate::{
        test_support::{repl_set, sharded, standalone},
        MemberState, MongosDescription,
    };

    /// Records every hook call as `"<hook>:<target>"`.
    #[derive(Default)]
    struct RecordingVisitor {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingVisitor {
        fn push(&self, hook: &str, target: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", hook, target));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TopologyVisitor for RecordingVisitor {
        async fn visit_mongod_description_pre(&self, desc: &MongodDescription) -> Visit {
            self.push("mongod_pre", desc.mongod_uri());
            Visit::Skipped
        }

        async fn visit_mongod_description_post(&self, desc: &MongodDescription) -> Visit {
            self.push("mongod_post", desc.mongod_uri());
            Visit::Skipped
        }

        async fn visit_repl_set_description_pre(&self, desc: &ReplSetDescription) -> Visit {
            self.push("rs_pre", desc.primary_uri());
            Visit::Skipped
        }

        async fn visit_repl_set_description_post(&self, desc: &ReplSetDescription) -> Visit {
            self.push("rs_post", desc.primary_uri());
            Visit::Skipped
        }

        async fn visit_sharded_description_pre(&self, _desc: &ShardedDescription) -> Visit {
            self.push("sharded_pre", "cluster");
            Visit::Skipped
        }

        async fn visit_sharded_description_post(&self, _desc: &ShardedDescription) -> Visit {
            self.push("sharded_post", "cluster");
            Visit::Skipped
        }
    }

    /// Fails every mongod whose target contains `bad`.
    struct FailingVisitor;

    #[async_trait]
    impl TopologyVisitor for FailingVisitor {
        async fn visit_mongod_description_pre(&self, desc: &MongodDescription) -> Visit {
            let result = if desc.mongod_uri().contains("bad") {
                Err(QuiesceError::UnexpectedError(anyhow::anyhow!("boom")))
            } else {
                Ok(())
            };
            Visit::Done(UnitOutcome::new(desc.mongod_uri(), UnitKind::Mongod, result))
        }
    }

    /// Reports one outcome per replica set and one for the whole cluster once it's walked.
    struct SetAndClusterVisitor;

    #[async_trait]
    impl TopologyVisitor for SetAndClusterVisitor {
        async fn visit_repl_set_description_pre(&self, desc: &ReplSetDescription) -> Visit {
            Visit::Done(UnitOutcome::new(desc.primary_uri(), UnitKind::ReplicaSet, Ok(())))
        }

        async fn visit_sharded_description_post(&self, desc: &ShardedDescription) -> Visit {
            let router = desc.mongoses()[0].mongos_uri();
            Visit::Done(UnitOutcome::new(router, UnitKind::ShardedCluster, Ok(())))
        }
    }

    #[tokio::test]
    async fn accept_visits_standalone_mongod_pre_then_post() {
        // Arrange
        let topology = Topology::new(standalone("solo:27017"));
        let visitor = RecordingVisitor::default();

        // Act
        let report = topology.accept(&visitor).await;

        // Assert
        assert_eq!(
            visitor.calls(),
            vec!["mongod_pre:solo:27017", "mongod_post:solo:27017"]
        );
        assert!(report.outcomes().is_empty());
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn accept_wraps_members_between_replica_set_hooks() {
        // Arrange
        let topology = Topology::new(TopologyDescription::ReplicaSet(repl_set(
            "rs0",
            &["PRIMARY", "SECONDARY"],
        )));
        let visitor = RecordingVisitor::default();

        // Act
        topology.accept(&visitor).await;

        // Assert
        assert_eq!(
            visitor.calls(),
            vec![
                "rs_pre:rs0-0:27017",
                "mongod_pre:rs0-0:27017",
                "mongod_post:rs0-0:27017",
                "mongod_pre:rs0-1:27017",
                "mongod_post:rs0-1:27017",
                "rs_post:rs0-0:27017",
            ]
        );
    }

    #[tokio::test]
    async fn accept_visits_config_servers_before_shards_and_skips_mongos() {
        // Arrange
        let topology = Topology::new(sharded(
            repl_set("cfg", &["PRIMARY"]),
            vec![repl_set("shard0", &["PRIMARY"]), repl_set("shard1", &["PRIMARY"])],
        ));
        let visitor = RecordingVisitor::default();

        // Act
        topology.accept(&visitor).await;

        // Assert
        let calls = visitor.calls();
        assert_eq!(calls.first().unwrap(), "sharded_pre:cluster");
        assert_eq!(calls.last().unwrap(), "sharded_post:cluster");
        let repl_set_order = calls
            .iter()
            .filter(|c| c.starts_with("rs_pre"))
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(
            repl_set_order,
            vec![
                "rs_pre:cfg-0:27017",
                "rs_pre:shard0-0:27017",
                "rs_pre:shard1-0:27017",
            ]
        );
        assert!(!calls.iter().any(|c| c.contains("mongos")));
    }

    #[tokio::test]
    async fn accept_keeps_walking_after_a_failed_unit() {
        // Arrange
        let shard = ReplSetDescription::new(
            "bad-0:27017",
            vec![
                MongodDescription::member("bad-0:27017", "bad-0:27017", MemberState::Primary),
                MongodDescription::member("ok-1:27017", "ok-1:27017", MemberState::Secondary),
            ],
        )
        .unwrap();
        let topology = Topology::new(TopologyDescription::ReplicaSet(shard));

        // Act
        let report = topology.accept(&FailingVisitor).await;

        // Assert
        assert_eq!(report.outcomes().len(), 2);
        assert!(!report.succeeded());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.failures().next().unwrap().target, "bad-0:27017");
    }

    #[tokio::test]
    async fn accept_folds_outcomes_in_traversal_order() {
        // Arrange
        let topology = Topology::new(sharded(
            repl_set("cfg", &["PRIMARY"]),
            vec![repl_set("shard0", &["PRIMARY"])],
        ));

        // Act
        let outcomes = topology.accept(&SetAndClusterVisitor).await.into_outcomes();

        // Assert
        let folded = outcomes
            .iter()
            .map(|o| (o.target.as_str(), o.kind))
            .collect::<Vec<_>>();
        assert_eq!(
            folded,
            vec![
                ("cfg-0:27017", UnitKind::ReplicaSet),
                ("shard0-0:27017", UnitKind::ReplicaSet),
                ("mongos:27017", UnitKind::ShardedCluster),
            ]
        );
        assert!(outcomes.iter().all(UnitOutcome::is_success));
    }

    #[test]
    fn mongod_count_excludes_mongos_and_counts_single_config_server() {
        let with_rs_config = Topology::new(sharded(
            repl_set("cfg", &["PRIMARY", "SECONDARY", "SECONDARY"]),
            vec![
                repl_set("shard0", &["PRIMARY", "SECONDARY", "SECONDARY"]),
                repl_set("shard1", &["PRIMARY", "SECONDARY", "SECONDARY"]),
            ],
        ));
        let single_config = Topology::new(TopologyDescription::Sharded(ShardedDescription::new(
            ConfigServerDescription::Single(MongodDescription::standalone("cfg:27019")),
            vec![repl_set("shard0", &["PRIMARY", "SECONDARY"])],
            vec![MongosDescription::new("mongos:27017")],
        )));

        assert_eq!(with_rs_config.mongod_count(), 9);
        assert_eq!(with_rs_config.repl_sets().len(), 3);
        assert_eq!(single_config.mongod_count(), 3);
        assert_eq!(single_config.repl_sets().len(), 1);
        assert_eq!(Topology::new(standalone("solo:27017")).mongod_count(), 1);
    }
}
