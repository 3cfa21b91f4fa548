mod auth;
mod config;
mod db;
mod error;
mod money;
mod quotes;
mod routes;
mod state;

use axum::handler::HandlerWithoutStateExt;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::AppError;
use state::AppState;

#[tokio::main]
async fn main() {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let pool = match db::pool::open_pool(&cfg.db_path, 8) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("failed to open database {}: {e}", cfg.db_path.display());
            std::process::exit(1);
        }
    };
    if let Err(e) = pool.get().map_err(AppError::from).and_then(|conn| db::schema::init(&conn)) {
        tracing::error!("failed to initialise schema: {e}");
        std::process::exit(1);
    }
    tracing::info!("database ready at {}", cfg.db_path.display());

    let bind = cfg.bind.clone();
    let port = cfg.port;
    let static_dir = cfg.static_dir.clone();

    let state = AppState::new(cfg, pool);

    // Static file serving: the frontend dist directory backs every path the
    // API doesn't claim; anything else is a 404.
    let static_files = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(not_found.into_service());

    let app = Router::new()
        .merge(routes::api_router(Arc::clone(&state)))
        .route("/api/health", axum::routing::get(health))
        .fallback_service(static_files)
        .with_state(state);

    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .expect("invalid bind address");

    tracing::info!("papertrade listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, gracefully stopping…");
}
