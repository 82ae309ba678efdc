//! ebb-graph ingest and query server.
//!
//! Configuration comes from `$XDG_CONFIG_HOME/ebb-graph/server.toml` and the
//! `EBB_SERVER_BIND`, `EBB_SERVER_PORT`, `EBB_DATA_DIR` and `EBB_BACKEND`
//! environment variables. See [`ebb_graph::server`] for the routes.
//!
//! Build and run: `cargo run --features server --bin ebb-server`

use std::sync::Arc;

use miette::{IntoDiagnostic, Result};

use ebb_graph::config::ServiceConfig;
use ebb_graph::graph::open_store;
use ebb_graph::paths::EbbPaths;
use ebb_graph::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let paths = EbbPaths::resolve()?;
    paths.ensure_dirs()?;
    let config = ServiceConfig::resolve(&paths)?;

    let store = open_store(config.backend, &config.graph_dir(&paths))?;
    let state = Arc::new(AppState::new(store));

    tracing::info!(
        backend = ?config.backend,
        max_upload_bytes = config.max_upload_bytes,
        "ebb server initialized"
    );

    server::serve(&config, state).await.into_diagnostic()
}
