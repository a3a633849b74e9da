//! Cluster snapshot aggregation for the atlas dashboard.
//!
//! The snapshot builder and the manager-facing traits are factored into
//! library modules so the binary and the integration tests share the same
//! code paths.

pub mod cluster;
pub mod server;
pub mod snapshot;
pub mod trace;

pub use snapshot::{build_snapshot, Snapshot};
