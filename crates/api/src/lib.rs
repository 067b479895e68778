pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Callable functions
    let function_routes = Router::new().route(
        "/delete_conversation",
        post(routes::function::delete_conversation),
    );

    // Write-trigger delivery
    let trigger_routes = Router::new().route(
        "/conversations/{conversation_id}",
        post(routes::trigger::conversation_written),
    );

    let api = Router::new()
        .nest("/fn", function_routes)
        .nest("/trigger", trigger_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
