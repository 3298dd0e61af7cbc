//! Route modules for the Luminaria server

pub mod export;
pub mod health;
pub mod images;
pub mod process;
pub mod settings;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/images", images::router())
        .nest("/api/v1/process", process::router())
        .nest("/api/v1/export", export::router())
        .nest("/api/v1/settings", settings::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::initialize_schema;
    use crate::extraction::MockExtractor;

    #[tokio::test]
    async fn health_endpoint_responds() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        initialize_schema(&pool).await.unwrap();
        let state = AppState::new(Config::default(), pool, Arc::new(MockExtractor::returning("")));

        let response = app(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
