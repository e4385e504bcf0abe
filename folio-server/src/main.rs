use folio_server::{config::Config, mail::LogMailer, router, AppState};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("folio_server=debug,folio_core=debug,tower_http=debug")
            }),
        )
        .init();

    if config.secret_auth.trim().is_empty() {
        tracing::error!("SECRET_AUTH must not be empty");
        std::process::exit(1);
    }

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(%e, bind = %config.bind, port = config.port, "Invalid bind address");
            std::process::exit(1);
        }
    };

    tracing::info!(
        db_path = %config.db_path.display(),
        build_dir = %config.build_dir.display(),
        "Starting folio server"
    );

    let state = match AppState::from_config(config, Arc::new(LogMailer)).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(%e, "Failed to open store");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!("API server running on {}", addr);
    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!(%e, %addr, "Server error");
    }
}
