use std::sync::Arc;

use anyhow::Context;
use crawl_session::config::SessionConfig;
use crawl_session::cookies::CookieManager;
use crawl_session::service::{server, SessionService};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = SessionConfig::from_env()?;
    log::debug!("session config: {config:?}");

    let store = config
        .backend
        .build()
        .with_context(|| format!("cannot open backend {:?}", config.backend))?;
    let manager = CookieManager::with_ttl(store, config.bucket_ttl);
    let service = SessionService::new(Arc::new(manager));

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.listen_addr))?;
    log::info!("session service listening on {}", config.listen_addr);

    // Stop accepting on ctrl-c and let in-flight calls finish
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("received shutdown signal"),
            Err(e) => log::error!("cannot listen for ctrl-c: {e}"),
        }
        token.cancel();
    });

    server::serve(listener, service, shutdown).await?;
    log::info!("session service stopped");
    Ok(())
}
