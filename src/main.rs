use std::sync::Arc;

use rawbench::config::Config;
use rawbench::http::date::DateCache;
use rawbench::server::listener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::load()?;

    let dates = Arc::new(DateCache::new());
    let refresher = dates.spawn_refresher(cfg.date_refresh());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = listener::run(&cfg, Arc::clone(&dates), shutdown_rx);
    tokio::pin!(server);

    let interrupted = tokio::select! {
        res = &mut server => {
            res?;
            false
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            true
        }
    };

    if interrupted {
        let _ = shutdown_tx.send(true);
        server.await?;
    }

    refresher.stop().await;
    tracing::info!("Server stopped");

    Ok(())
}
