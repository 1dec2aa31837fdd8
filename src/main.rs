//! EmberKV server entry point.
//!
//! Wires the pieces together: CLI flags into the config store, snapshot
//! hydration into the keyspace, then the TCP accept loop spawning one
//! task per connection. All process-wide state is constructed here and
//! passed down by reference; nothing is a global.

use clap::Parser;
use emberkv::connection::handle_connection;
use emberkv::snapshot::{self, SnapshotError};
use emberkv::storage::{start_expiry_sweeper, ConfigStore, Keyspace};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// An in-memory key-value server speaking the RESP protocol.
#[derive(Parser, Debug)]
#[command(name = "emberkv", version, about)]
struct Cli {
    /// Directory containing the snapshot file
    #[arg(long, default_value = emberkv::DEFAULT_DIR)]
    dir: String,

    /// Snapshot filename within the data directory
    #[arg(long, default_value = emberkv::DEFAULT_DBFILENAME)]
    dbfilename: String,

    /// TCP port to listen on
    #[arg(long, default_value_t = emberkv::DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let config = Arc::new(ConfigStore::new());
    config.set("dir", cli.dir.as_str());
    config.set("dbfilename", cli.dbfilename.as_str());
    config.set("port", cli.port.to_string());

    let snapshot_path = Path::new(&cli.dir).join(&cli.dbfilename);
    let store = Arc::new(load_keyspace(&snapshot_path));

    let _sweeper = start_expiry_sweeper(Arc::clone(&store));

    let bind_addr: SocketAddr = ([0, 0, 0, 0], cli.port).into();
    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %bind_addr, error = %e, "failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(addr = %bind_addr, "listening");

    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
        info!("shutdown signal received");
    };

    tokio::select! {
        _ = accept_loop(listener, store, config) => {}
        _ = shutdown => {}
    }

    info!("server stopped");
    Ok(())
}

/// Hydrates the keyspace from the snapshot file.
///
/// A missing file starts an empty keyspace. A file that exists but cannot
/// be read ends the process with exit code 2. A file that reads but fails
/// to decode is logged and the server proceeds empty - a corrupt snapshot
/// should not keep the server down.
fn load_keyspace(path: &Path) -> Keyspace {
    if !path.exists() {
        info!(path = %path.display(), "no snapshot file, starting with an empty keyspace");
        return Keyspace::new();
    }

    match snapshot::load_file(path) {
        Ok(mut databases) => {
            if databases.is_empty() {
                info!(path = %path.display(), "snapshot holds no databases");
                return Keyspace::new();
            }
            // Serve the first database in the snapshot.
            let db = databases.remove(0);
            info!(
                path = %path.display(),
                index = db.index,
                keys = db.keyspace.len(),
                expiries = db.expiries.len(),
                "keyspace hydrated from snapshot"
            );
            Keyspace::from_snapshot(db)
        }
        Err(SnapshotError::Io(e)) => {
            error!(path = %path.display(), error = %e, "cannot read snapshot file");
            std::process::exit(2);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot decode failed, starting with an empty keyspace");
            Keyspace::new()
        }
    }
}

async fn accept_loop(listener: TcpListener, store: Arc<Keyspace>, config: Arc<ConfigStore>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(
                    stream,
                    addr,
                    Arc::clone(&store),
                    Arc::clone(&config),
                ));
            }
            Err(e) => {
                error!(error = %e, "failed to accept connection");
            }
        }
    }
}
