mod middleware;

pub mod api;

pub use api::{ApiState, build_api_router};

use axum::{Router, middleware as axum_middleware, routing::get};

/// The complete application router: authenticated post routes plus the open health probe.
pub fn build_router(state: ApiState) -> Router {
    let health = Router::new()
        .route("/health", get(api::handlers::health))
        .with_state(state.clone());

    build_api_router(state)
        .merge(health)
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
