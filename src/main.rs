//! Atlas dashboard server: serves the page shell and the cluster snapshot
//! JSON consumed by the client-side charts.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use atlas_server::cluster::InMemoryCluster;
use atlas_server::server::{router, ServerState};
use atlas_server::trace::FileTraceSink;

#[derive(Parser)]
#[command(name = "atlas-server")]
#[command(version)]
#[command(about = "Cluster snapshot server for the atlas dashboard")]
struct Cli {
    /// Address to bind the HTTP server on. If the port is taken, the next
    /// few ports are tried before giving up.
    #[arg(long, default_value = "127.0.0.1:3001")]
    bind_addr: SocketAddr,

    /// Directory holding the dashboard page shell and chart scripts.
    #[arg(long, default_value = "web")]
    assets_dir: PathBuf,

    /// Optional append-only file receiving a diagnostic dump of every
    /// snapshot served. Failures here are logged and ignored.
    #[arg(long, env = "ATLAS_TRACE_FILE")]
    trace_file: Option<PathBuf>,
}

async fn bind_with_port_fallback(addr: SocketAddr) -> std::io::Result<(TcpListener, SocketAddr)> {
    let base_port = addr.port();
    for port in base_port..base_port.saturating_add(10) {
        let candidate = SocketAddr::new(addr.ip(), port);
        match TcpListener::bind(candidate).await {
            Ok(listener) => return Ok((listener, candidate)),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AddrInUse,
        "all fallback ports in use",
    ))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let state = Arc::new(ServerState {
        cluster: Arc::new(InMemoryCluster::demo()),
        trace: cli.trace_file.map(|path| Mutex::new(FileTraceSink::new(path))),
    });
    let app = router(state, &cli.assets_dir);

    let (listener, bound_addr) = bind_with_port_fallback(cli.bind_addr)
        .await
        .expect("failed to bind any port");
    info!("atlas server listening on http://{bound_addr}");
    axum::serve(listener, app).await.expect("server error");
}
