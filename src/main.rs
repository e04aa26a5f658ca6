use axum::{routing::get, Router};
use clap::Parser;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use fieldops_sync::config;
use fieldops_sync::database::DatabaseManager;
use fieldops_sync::handlers::sync;
use fieldops_sync::middleware::jwt_auth_middleware;

#[derive(Parser, Debug)]
#[command(name = "fieldops-sync", about = "Mobile data-synchronization gateway for FieldOps")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on; falls back to SYNC_API_PORT or PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting FieldOps sync gateway in {:?} mode", config.environment);

    let args = Args::parse();
    let app = app();

    // Allow tests or deployments to override port via env
    let port = args
        .port
        .or_else(|| std::env::var("SYNC_API_PORT").ok().and_then(|s| s.parse::<u16>().ok()))
        .or_else(|| std::env::var("PORT").ok().and_then(|s| s.parse::<u16>().ok()))
        .unwrap_or(3000);

    let bind_addr = format!("{}:{}", args.bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 FieldOps sync gateway listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Sync endpoint (authenticated)
        .merge(sync_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn sync_routes() -> Router {
    use axum::middleware::from_fn;
    use axum::routing::put;

    Router::new()
        .route(
            "/api/sync",
            put(sync::sync_put)
                .post(sync::sync_post)
                .patch(sync::sync_patch)
                .delete(sync::sync_delete),
        )
        .layer(from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "FieldOps Sync Gateway",
            "version": version,
            "description": "Mobile data-synchronization gateway for the FieldOps CRM",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "sync": "/api/sync (protected - PUT, POST, PATCH, DELETE)",
            },
            "tables": fieldops_sync::sync::registry::supported_tables(),
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
