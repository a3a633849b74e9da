//! Best-effort diagnostic side channel.
//!
//! A line-oriented dump of each snapshot can be appended to a local sink for
//! offline debugging. The dump is decoupled from snapshot delivery: callers
//! log and ignore any failure here, so an unwritable path or full disk never
//! costs a response its data.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;

use crate::snapshot::Snapshot;

/// Failures of the diagnostic side channel.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to open trace sink {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to trace sink: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize snapshot for tracing: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only destination for snapshot dumps.
pub trait TraceSink {
    fn append(&mut self, line: &str) -> Result<(), TraceError>;
}

/// Appends dump lines to a local file, created and opened on first use.
#[derive(Debug)]
pub struct FileTraceSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileTraceSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn open(&mut self) -> Result<&mut File, TraceError> {
        if let Some(ref mut file) = self.file {
            return Ok(file);
        }
        let file = File::options()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| TraceError::Open {
                path: self.path.clone(),
                source,
            })?;
        Ok(self.file.insert(file))
    }
}

impl TraceSink for FileTraceSink {
    fn append(&mut self, line: &str) -> Result<(), TraceError> {
        let file = self.open()?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Write a line-oriented dump of `snapshot` to `sink`, one record per line,
/// ending with the full JSON document as it goes over the wire.
pub fn dump_snapshot(snapshot: &Snapshot, sink: &mut dyn TraceSink) -> Result<(), TraceError> {
    let stamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    sink.append(&format!("--- snapshot at {stamp} ---"))?;

    for node in &snapshot.nodes {
        sink.append(&format!("node {} rack {}", node.node_id, node.rack))?;
    }
    for app in &snapshot.apps {
        sink.append(&format!(
            "app {} ({}) state {} start {} finish {}",
            app.application_id,
            app.app_name,
            app.state.as_str(),
            app.start_time,
            app.finish_time
        ))?;
        sink.append(&format!("  {} live containers", app.containers.len()))?;
        for container in &app.containers {
            sink.append(&format!(
                "  container on {} created {} finished {}",
                container.node, container.creation_time, container.finish_time
            ))?;
        }
        for node_id in &app.ran_nodes {
            sink.append(&format!("  ran on {node_id}"))?;
        }
    }

    sink.append(&serde_json::to_string(snapshot)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::InMemoryCluster;
    use crate::snapshot::build_snapshot;

    #[derive(Default)]
    struct MemorySink {
        lines: Vec<String>,
    }

    impl TraceSink for MemorySink {
        fn append(&mut self, line: &str) -> Result<(), TraceError> {
            self.lines.push(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn dump_covers_nodes_apps_and_final_json() {
        let snapshot = build_snapshot(&InMemoryCluster::demo());
        let mut sink = MemorySink::default();
        dump_snapshot(&snapshot, &mut sink).expect("dump");

        assert!(sink.lines[0].starts_with("--- snapshot at "));
        let node_lines = sink.lines.iter().filter(|l| l.starts_with("node ")).count();
        assert_eq!(node_lines, snapshot.nodes.len());
        let app_lines = sink.lines.iter().filter(|l| l.starts_with("app ")).count();
        assert_eq!(app_lines, snapshot.apps.len());

        // Last line is the wire document itself.
        let last = sink.lines.last().expect("non-empty dump");
        let value: serde_json::Value = serde_json::from_str(last).expect("valid json");
        assert!(value.get("nodes").is_some() && value.get("apps").is_some());
    }

    #[test]
    fn file_sink_appends_across_dumps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("atlas-trace.txt");
        let snapshot = build_snapshot(&InMemoryCluster::demo());

        let mut sink = FileTraceSink::new(&path);
        dump_snapshot(&snapshot, &mut sink).expect("first dump");
        dump_snapshot(&snapshot, &mut sink).expect("second dump");

        let contents = std::fs::read_to_string(&path).expect("read trace");
        assert_eq!(
            contents
                .lines()
                .filter(|l| l.starts_with("--- snapshot at "))
                .count(),
            2
        );
    }

    #[test]
    fn file_sink_reports_unwritable_path() {
        let mut sink = FileTraceSink::new("/nonexistent-dir/atlas-trace.txt");
        let snapshot = Snapshot::empty();
        let err = dump_snapshot(&snapshot, &mut sink).expect_err("open should fail");
        assert!(matches!(err, TraceError::Open { .. }));
    }
}
