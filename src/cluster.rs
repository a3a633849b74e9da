//! Collaborator boundary with the resource manager.
//!
//! The aggregator never reaches into live manager structures. Every accessor
//! on [`ClusterManager`] hands back a point-in-time copy, so the snapshot is
//! assembled without holding any manager lock. Rack placement and live
//! container resolution are scheduler concerns and live behind their own
//! narrow traits ([`RackResolver`], [`LiveContainerLookup`]) so any scheduler
//! implementation can satisfy them.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use tracing::error;

/// Lifecycle states an application moves through inside the manager.
///
/// Only `Running` and `Finished` are projected into a snapshot; every other
/// state is omitted from the document entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    New,
    Submitted,
    Accepted,
    Running,
    Finished,
    Failed,
    Killed,
}

impl AppState {
    /// Wire representation used by the front end (`"RUNNING"`, `"FINISHED"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::New => "NEW",
            AppState::Submitted => "SUBMITTED",
            AppState::Accepted => "ACCEPTED",
            AppState::Running => "RUNNING",
            AppState::Finished => "FINISHED",
            AppState::Failed => "FAILED",
            AppState::Killed => "KILLED",
        }
    }
}

/// A worker node as registered with the manager, identified by `host:port`.
///
/// Rack placement is not part of the record; it is resolved through the
/// scheduler via [`RackResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub node_id: String,
}

/// A submitted application as tracked by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub application_id: String,
    pub name: String,
    /// Epoch milliseconds.
    pub start_time: i64,
    /// Epoch milliseconds; `0` while the application has not finished.
    pub finish_time: i64,
    pub state: AppState,
    /// Attempt currently executing; present only while the app is running.
    pub current_attempt: Option<String>,
    /// Nodes the application has historically run on, populated once an
    /// attempt completes.
    pub ran_nodes: Vec<String>,
}

/// A resource allocation granted to an application attempt on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub node_id: String,
    /// Epoch milliseconds.
    pub creation_time: i64,
    /// Epoch milliseconds; `0` while the container is live.
    pub finish_time: i64,
}

/// Scheduler-side rack lookup for a registered node.
pub trait RackResolver {
    /// Rack/partition label for `node_id`, or `None` when the scheduler has
    /// no placement information for it.
    fn rack(&self, node_id: &str) -> Option<String>;
}

/// Narrow capability for resolving an attempt's live containers.
///
/// Kept to a single method so the aggregator never depends on a concrete
/// scheduler type.
pub trait LiveContainerLookup {
    /// Live containers of `attempt_id`, or `None` when the attempt is
    /// unknown (e.g. it just transitioned out of the scheduler).
    fn live_containers(&self, attempt_id: &str) -> Option<Vec<ContainerRecord>>;
}

/// Read-only handle over the resource manager's registries.
///
/// Implementations must hand back point-in-time copies: the aggregator
/// iterates the returned vectors without further synchronization.
pub trait ClusterManager: RackResolver + LiveContainerLookup + Send + Sync {
    /// Currently registered nodes, in the manager's iteration order.
    fn nodes(&self) -> Vec<NodeRecord>;
    /// Applications currently tracked by the manager, in any lifecycle state.
    fn applications(&self) -> Vec<AppRecord>;
}

/// The manager-side registries backing [`InMemoryCluster`].
#[derive(Debug, Default)]
pub struct ClusterData {
    pub nodes: Vec<NodeRecord>,
    /// node id -> rack label (scheduler placement info).
    pub racks: HashMap<String, String>,
    pub apps: Vec<AppRecord>,
    /// attempt id -> live containers of that attempt.
    pub live_containers: HashMap<String, Vec<ContainerRecord>>,
}

/// In-memory stand-in for a live resource manager.
///
/// Used by the demo binary and the integration tests. All read accessors
/// clone out of a single `RwLock`; a poisoned lock degrades to empty
/// registries instead of propagating the panic into request handlers, which
/// makes the data endpoint serve the canonical empty document.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    inner: RwLock<ClusterData>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a mutation to the registries.
    ///
    /// Panics if the registry lock is poisoned; readers stay degraded-safe.
    pub fn mutate(&self, f: impl FnOnce(&mut ClusterData)) {
        let mut data = self
            .inner
            .write()
            .expect("cluster registry lock poisoned during mutation");
        f(&mut data);
    }

    /// Register a worker node. Rack placement is recorded separately via
    /// [`InMemoryCluster::set_rack`], mirroring the scheduler split.
    pub fn register_node(&self, node_id: &str) {
        self.mutate(|data| {
            data.nodes.push(NodeRecord {
                node_id: node_id.to_string(),
            });
        });
    }

    /// Record the scheduler's rack placement for a node.
    pub fn set_rack(&self, node_id: &str, rack: &str) {
        self.mutate(|data| {
            data.racks.insert(node_id.to_string(), rack.to_string());
        });
    }

    /// Track a new application.
    pub fn submit_app(&self, app: AppRecord) {
        self.mutate(|data| data.apps.push(app));
    }

    /// Grant a live container to an application attempt.
    pub fn add_live_container(&self, attempt_id: &str, container: ContainerRecord) {
        self.mutate(|data| {
            data.live_containers
                .entry(attempt_id.to_string())
                .or_default()
                .push(container);
        });
    }

    /// Move an application to `FINISHED`: its live containers are released
    /// and only the nodes they ran on survive in `ran_nodes`.
    pub fn finish_app(&self, application_id: &str, finish_time: i64) {
        self.mutate(|data| {
            let Some(app) = data
                .apps
                .iter_mut()
                .find(|a| a.application_id == application_id)
            else {
                return;
            };
            if let Some(attempt) = app.current_attempt.take() {
                if let Some(containers) = data.live_containers.remove(&attempt) {
                    app.ran_nodes
                        .extend(containers.into_iter().map(|c| c.node_id));
                }
            }
            app.state = AppState::Finished;
            app.finish_time = finish_time;
        });
    }

    /// A representative cluster for running the dashboard without a real
    /// manager: two racks, four nodes, and apps in a mix of states.
    pub fn demo() -> Self {
        let cluster = Self::new();
        for (node_id, rack) in [
            ("nm01.example.com:45454", "/r0"),
            ("nm02.example.com:45454", "/r0"),
            ("nm03.example.com:45454", "/r1"),
            ("nm04.example.com:45454", "/r1"),
        ] {
            cluster.register_node(node_id);
            cluster.set_rack(node_id, rack);
        }

        cluster.submit_app(AppRecord {
            application_id: "application_1693000000000_0001".to_string(),
            name: "sort-validation".to_string(),
            start_time: 1_693_000_100_000,
            finish_time: 0,
            state: AppState::Running,
            current_attempt: Some("appattempt_1693000000000_0001_000001".to_string()),
            ran_nodes: Vec::new(),
        });
        cluster.add_live_container(
            "appattempt_1693000000000_0001_000001",
            ContainerRecord {
                node_id: "nm01.example.com:45454".to_string(),
                creation_time: 1_693_000_130_000,
                finish_time: 0,
            },
        );
        cluster.add_live_container(
            "appattempt_1693000000000_0001_000001",
            ContainerRecord {
                node_id: "nm03.example.com:45454".to_string(),
                creation_time: 1_693_000_131_000,
                finish_time: 0,
            },
        );

        cluster.submit_app(AppRecord {
            application_id: "application_1693000000000_0002".to_string(),
            name: "wordcount".to_string(),
            start_time: 1_692_999_000_000,
            finish_time: 0,
            state: AppState::Running,
            current_attempt: Some("appattempt_1693000000000_0002_000001".to_string()),
            ran_nodes: Vec::new(),
        });
        for (node_id, creation_time) in [
            ("nm02.example.com:45454", 1_692_999_030_000),
            ("nm04.example.com:45454", 1_692_999_031_000),
        ] {
            cluster.add_live_container(
                "appattempt_1693000000000_0002_000001",
                ContainerRecord {
                    node_id: node_id.to_string(),
                    creation_time,
                    finish_time: 0,
                },
            );
        }
        cluster.finish_app("application_1693000000000_0002", 1_692_999_900_000);

        cluster.submit_app(AppRecord {
            application_id: "application_1693000000000_0003".to_string(),
            name: "adhoc-query".to_string(),
            start_time: 1_693_000_200_000,
            finish_time: 0,
            state: AppState::Accepted,
            current_attempt: None,
            ran_nodes: Vec::new(),
        });

        cluster
    }
}

impl RackResolver for InMemoryCluster {
    fn rack(&self, node_id: &str) -> Option<String> {
        self.inner.read().ok()?.racks.get(node_id).cloned()
    }
}

impl LiveContainerLookup for InMemoryCluster {
    fn live_containers(&self, attempt_id: &str) -> Option<Vec<ContainerRecord>> {
        self.inner.read().ok()?.live_containers.get(attempt_id).cloned()
    }
}

impl ClusterManager for InMemoryCluster {
    fn nodes(&self) -> Vec<NodeRecord> {
        match self.inner.read() {
            Ok(data) => data.nodes.clone(),
            Err(_) => {
                error!("cluster registry lock poisoned; serving empty node registry");
                Vec::new()
            }
        }
    }

    fn applications(&self) -> Vec<AppRecord> {
        match self.inner.read() {
            Ok(data) => data.apps.clone(),
            Err(_) => {
                error!("cluster registry lock poisoned; serving empty app registry");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_app(id: &str, attempt: &str) -> AppRecord {
        AppRecord {
            application_id: id.to_string(),
            name: format!("job-{id}"),
            start_time: 100,
            finish_time: 0,
            state: AppState::Running,
            current_attempt: Some(attempt.to_string()),
            ran_nodes: Vec::new(),
        }
    }

    #[test]
    fn finish_app_retains_only_ran_nodes() {
        let cluster = InMemoryCluster::new();
        cluster.submit_app(running_app("app-1", "attempt-1"));
        cluster.add_live_container(
            "attempt-1",
            ContainerRecord {
                node_id: "nodeA:45454".to_string(),
                creation_time: 200,
                finish_time: 0,
            },
        );

        cluster.finish_app("app-1", 900);

        let apps = cluster.applications();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].state, AppState::Finished);
        assert_eq!(apps[0].finish_time, 900);
        assert_eq!(apps[0].current_attempt, None);
        assert_eq!(apps[0].ran_nodes, vec!["nodeA:45454".to_string()]);
        // Container-level detail is gone once the attempt is not live.
        assert_eq!(cluster.live_containers("attempt-1"), None);
    }

    #[test]
    fn rack_lookup_is_separate_from_registration() {
        let cluster = InMemoryCluster::new();
        cluster.register_node("nodeA:45454");
        assert_eq!(cluster.rack("nodeA:45454"), None);

        cluster.set_rack("nodeA:45454", "/r0");
        assert_eq!(cluster.rack("nodeA:45454"), Some("/r0".to_string()));
        assert_eq!(cluster.nodes().len(), 1);
    }

    #[test]
    fn finish_app_with_unknown_id_is_a_no_op() {
        let cluster = InMemoryCluster::new();
        cluster.submit_app(running_app("app-1", "attempt-1"));
        cluster.finish_app("app-2", 900);
        assert_eq!(cluster.applications()[0].state, AppState::Running);
    }
}
