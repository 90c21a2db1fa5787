pub mod api;
pub mod assignment;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod fanout;
pub mod models;
pub mod notify;
pub mod service;
pub mod status;
pub mod timeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Wire the service and run the HTTP/WebSocket server until ctrl-c.
///
/// The bundled binary uses the in-memory directory; embedders build
/// their own `EmergencyService` with a real identity/resource directory
/// and mount `api::api_router` wherever they serve from.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Medispatch starting v{}", config::APP_VERSION);

    let store = Arc::new(db::SqliteEmergencyStore::open(&config::database_path())?);
    let directory = Arc::new(directory::InMemoryDirectory::new());

    let sender: Arc<dyn notify::NotificationSender> = match config::notify_webhook() {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "external notification webhook enabled");
            Arc::new(notify::WebhookSender::new(endpoint))
        }
        None => {
            tracing::warn!("MEDISPATCH_NOTIFY_WEBHOOK not set, external delivery disabled");
            Arc::new(notify::DisabledSender)
        }
    };

    let service = Arc::new(service::EmergencyService::new(
        store,
        directory.clone(),
        directory.clone(),
        fanout::EventBroker::new(),
        sender,
    ));
    let ctx = api::ApiContext::new(service, directory);

    let addr = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, api::api_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Medispatch stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
