pub mod api;
pub mod commands;
pub mod config;
pub mod connectivity;
pub mod dialog;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod preferences;
#[cfg(feature = "app")]
pub mod routes;
pub mod state;
pub mod storage;
pub mod sync;
pub mod view;

#[cfg(feature = "app")]
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("logger error: {0}")]
    Logger(#[from] flexi_logger::FlexiLoggerError),

    #[error("failed to load items: {0}")]
    Load(#[from] commands::CommandError),

    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs the API server until Ctrl+C or SIGTERM.
#[cfg(feature = "app")]
pub async fn run() -> Result<(), StartupError> {
    use crate::commands::{load_state_impl, ServerCtx};
    use crate::config::Config;
    use crate::routes::{router, ServerState};

    // Logger first, so the config fallbacks below are recorded.
    logging::init_logging(&config::data_dir_from_env())?;
    let config = Config::load();

    let ctx = ServerCtx::new(config.data_dir.clone(), config.list_name.clone());
    let state = load_state_impl(&ctx)?;
    let app = router(ServerState::new(state, ctx, config.api_token.clone()));

    let address = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!(
        "grocery list server listening on {address} data_dir={}",
        config.data_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("server shut down");
    Ok(())
}

#[cfg(feature = "app")]
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("received Ctrl+C, shutting down"),
            Err(error) => {
                log::error!("failed to listen for Ctrl+C: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("received terminate signal, shutting down");
            }
            Err(error) => {
                log::error!("failed to install SIGTERM handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
