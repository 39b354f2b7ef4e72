use std::net::SocketAddr;
use std::sync::Arc;

use nexo_api::config::Config;
use nexo_api::state::State;
use nexo_api::{construct_router, default_env_filter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(default_env_filter())
        .init();

    let config = Config::from_env();
    let addr = format!("{}:{}", config.host, config.port);

    let state = Arc::new(State::new(config).await?);
    let router = construct_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("starting server on {addr}");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
