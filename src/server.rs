//! HTTP surface for the dashboard.
//!
//! One JSON data endpoint consumed by the client-side charts, plus static
//! serving of the page shell from a configurable directory. The router is
//! factored out of `main` so the integration tests can drive it over a real
//! socket.

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::{extract::State, routing::get, Json, Router};
use tower_http::services::ServeDir;
use tracing::warn;

use crate::cluster::InMemoryCluster;
use crate::snapshot::{build_snapshot, Snapshot};
use crate::trace::{dump_snapshot, FileTraceSink};

/// Shared state behind every request handler.
pub struct ServerState {
    pub cluster: Arc<InMemoryCluster>,
    /// Optional diagnostic dump sink; failures are logged and ignored.
    pub trace: Option<Mutex<FileTraceSink>>,
}

/// Build the dashboard router: the data endpoint plus page-shell assets.
pub fn router(state: Arc<ServerState>, assets_dir: &Path) -> Router {
    Router::new()
        .route("/atlas/data", get(snapshot_handler))
        .fallback_service(ServeDir::new(assets_dir))
        .with_state(state)
}

/// Serve the current cluster snapshot.
///
/// Always answers 200 with a snapshot-shaped document. The trace dump runs
/// after the snapshot is built and cannot downgrade the response.
async fn snapshot_handler(State(state): State<Arc<ServerState>>) -> Json<Snapshot> {
    let snapshot = build_snapshot(state.cluster.as_ref());

    if let Some(trace) = &state.trace {
        match trace.lock() {
            Ok(mut sink) => {
                if let Err(e) = dump_snapshot(&snapshot, &mut *sink) {
                    warn!("snapshot trace dump failed: {e}");
                }
            }
            Err(_) => warn!("snapshot trace sink lock poisoned; skipping dump"),
        }
    }

    Json(snapshot)
}
