use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use appflow_db::repositories::Repositories;
use appflow_search::hosted::HostedSearchClient;
use appflow_search::memory::MemorySearchClient;
use appflow_search::{SearchClient, SearchConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appflow_api::background::search_reconciler;
use appflow_api::config::ServerConfig;
use appflow_api::router::build_app_router;
use appflow_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = appflow_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    appflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    appflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Search ---
    let search_client = build_search_client();

    // --- App state ---
    let repos = Repositories::postgres(pool);
    let state = AppState::new(config.clone(), repos, search_client.as_ref());

    // --- Search reconciler ---
    let reconciler_cancel = tokio_util::sync::CancellationToken::new();
    let reconciler_handle = tokio::spawn(search_reconciler::run(
        Arc::clone(&state.search_sync),
        Duration::from_secs(config.search_sync_interval_secs),
        reconciler_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    reconciler_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, reconciler_handle).await.is_err() {
        tracing::warn!("Search reconciler did not stop within the shutdown timeout");
    }
    tracing::info!("Graceful shutdown complete");
}

/// Hosted index when credentials are configured, in-process index otherwise.
///
/// Panics if the hosted configuration is present but unusable.
fn build_search_client() -> Box<dyn SearchClient> {
    match SearchConfig::from_env() {
        Some(search_config) => {
            tracing::info!(
                host = %search_config.host,
                prefix = %search_config.index_prefix,
                "Using hosted search index"
            );
            Box::new(
                HostedSearchClient::new(search_config).expect("Invalid search configuration"),
            )
        }
        None => {
            tracing::warn!(
                "SEARCH_APP_ID/SEARCH_API_KEY not set, using the in-process search index \
                 (contents are lost on restart; run the admin reindex after configuring)"
            );
            Box::new(MemorySearchClient::new())
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
