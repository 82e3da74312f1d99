pub mod client;
pub mod config;
pub mod dao;
pub mod error;
pub mod memory;
pub mod model;
pub mod routes;
pub mod store;
pub mod utils;

use axum::routing::get;
use axum::Router;
use config::CorsPolicy;
use model::{Link, Social};
use store::Repository;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub repository: Repository,
}

pub fn create_router(state: AppState, cors: &CorsPolicy) -> Router {
    Router::new()
        .route(
            "/api/health",
            get(routes::health).fallback(routes::method_not_allowed),
        )
        .merge(routes::collection::<Link>())
        .merge(routes::collection::<Social>())
        .fallback(routes::fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors.layer())
        .with_state(state)
}
