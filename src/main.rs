use anyhow::{Context, Result};
use file_store::{config, routes, services};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting file-store with config: {:?}", cfg);

    // --- Initialize stores ---
    let stores = services::registry::FileStoreRegistry::from_config(&cfg.stores)
        .await
        .context("initializing file stores")?;

    if let Some(ttl) = cfg.upload_ttl {
        services::janitor::spawn(stores.clone(), ttl);
    } else {
        tracing::debug!("upload janitor disabled");
    }

    // --- Build router ---
    let app = routes::routes::app(stores, cfg.max_body_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
