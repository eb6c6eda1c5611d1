//! hometree server binary.

use clap::Parser;
use hometree_core::{db::reset_database, init_logging, Database, IntegrityEngine};
use hometree_server::{create_router, AppState, Args, ServerConfig};
use log::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::from(&args);

    init_logging(&config.log_level, config.log_dir.as_deref()).map_err(anyhow::Error::msg)?;

    info!(
        "event=server_start module=server status=start listen={} database={}",
        config.listen_addr, config.database
    );

    let database = Database::open(&config.database)?;
    if config.reset_database {
        warn!("event=db_reset module=server status=start");
        database.with_connection_mut(reset_database)?;
    }

    let app = create_router(AppState::new(IntegrityEngine::new(database)));
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;

    info!(
        "event=server_listen module=server status=ok addr={}",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            "event=server_signal module=server status=error error={}",
            err
        );
    }
}
