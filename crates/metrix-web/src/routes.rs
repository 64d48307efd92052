//! API 라우트 정의.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::AppState;

/// API 라우트 생성
pub fn metric_routes() -> Router<AppState> {
    Router::new()
        // 목록 / 상태
        .route("/", get(handlers::health::list_metrics))
        .route("/ping", get(handlers::health::ping))
        // 조회
        .route(
            "/value/{type}/{name}",
            get(handlers::metrics::value_from_path),
        )
        .route("/value/", post(handlers::metrics::value_json))
        // 갱신
        .route(
            "/update/{type}/{name}/{value}",
            post(handlers::metrics::update_from_path),
        )
        .route(
            "/update/{type}/{name}",
            post(handlers::metrics::update_missing_value),
        )
        .route("/update/", post(handlers::metrics::update_json))
        .route("/updates/", post(handlers::metrics::update_batch))
}
