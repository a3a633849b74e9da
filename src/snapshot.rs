//! Point-in-time cluster snapshot for the visualization front end.
//!
//! `build_snapshot` flattens the manager's registries into a single
//! serializable document: one entry per registered node and one entry per
//! `RUNNING` or `FINISHED` application. The build is read-only and
//! infallible; gaps in manager state (unresolved rack, vanished attempt)
//! degrade to empty values instead of failing the whole document.

use serde::Serialize;

use crate::cluster::{AppState, ClusterManager};

/// One registered node, with its scheduler-resolved rack label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub rack: String,
    pub node_id: String,
}

/// One live container of a running application's current attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerView {
    pub node: String,
    pub creation_time: i64,
    /// `0` while the container is live.
    pub finish_time: i64,
}

/// Projection of a single application.
///
/// `ran_nodes` is a list, not a set: for a running application it is derived
/// positionally from `containers`, so two containers on the same node yield
/// two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppView {
    pub app_name: String,
    pub application_id: String,
    pub start_time: i64,
    /// `0` while the application has not finished.
    pub finish_time: i64,
    pub state: AppState,
    pub ran_nodes: Vec<String>,
    pub containers: Vec<ContainerView>,
}

/// The aggregated point-in-time view of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub nodes: Vec<NodeView>,
    pub apps: Vec<AppView>,
}

impl Snapshot {
    /// Canonical "no data available" document: `{"nodes":[],"apps":[]}`.
    ///
    /// Served when the manager handle cannot be read at all. Consumers treat
    /// it as an empty chart, never as an error.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Build a snapshot of every registered node and every projectable
/// application currently tracked by `manager`.
///
/// The result is a point-in-time view: no attempt is made to reconcile state
/// that changes between the node loop and the app loop, so bounded staleness
/// across the two is accepted.
pub fn build_snapshot(manager: &dyn ClusterManager) -> Snapshot {
    let nodes = manager
        .nodes()
        .into_iter()
        .map(|node| NodeView {
            // A node the scheduler has no placement for keeps an empty rack
            // label rather than dropping out of the document.
            rack: manager.rack(&node.node_id).unwrap_or_default(),
            node_id: node.node_id,
        })
        .collect();

    let mut apps = Vec::new();
    for app in manager.applications() {
        let (ran_nodes, containers) = match app.state {
            AppState::Running => {
                // An attempt that vanished mid-transition counts as having
                // zero live containers, not as a failure.
                let live = app
                    .current_attempt
                    .as_deref()
                    .and_then(|attempt| manager.live_containers(attempt))
                    .unwrap_or_default();
                let ran_nodes = live.iter().map(|c| c.node_id.clone()).collect();
                let containers = live
                    .into_iter()
                    .map(|c| ContainerView {
                        node: c.node_id,
                        creation_time: c.creation_time,
                        finish_time: c.finish_time,
                    })
                    .collect();
                (ran_nodes, containers)
            }
            AppState::Finished => (app.ran_nodes.clone(), Vec::new()),
            // All other lifecycle states are omitted from the document.
            _ => continue,
        };

        apps.push(AppView {
            app_name: app.name,
            application_id: app.application_id,
            start_time: app.start_time,
            finish_time: app.finish_time,
            state: app.state,
            ran_nodes,
            containers,
        });
    }

    Snapshot { nodes, apps }
}
