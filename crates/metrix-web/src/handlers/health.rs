//! 상태 확인 / 목록 / 미발견 핸들러.

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use metrix_core::models::metric::Metric;
use serde::Serialize;

use crate::error::ApiError;
use crate::AppState;

/// 상태 확인 응답
#[derive(Debug, Serialize)]
pub struct PingResponse {
    /// 상태 ("ok")
    pub status: &'static str,
}

/// 저장소 상태 확인
///
/// GET /ping
pub async fn ping(State(state): State<AppState>) -> Result<Json<PingResponse>, ApiError> {
    state
        .storage
        .ping()
        .await
        .map_err(|e| ApiError::Internal(format!("저장소 응답 없음: {e}")))?;
    Ok(Json(PingResponse { status: "ok" }))
}

/// 전체 메트릭 목록 (`id: value (kind)`, id 순)
///
/// GET /
pub async fn list_metrics(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let metrics = state.storage.get_all_metrics().await?;

    let mut rows: Vec<&Metric> = metrics.values().collect();
    rows.sort_by(|a, b| a.id.cmp(&b.id));

    let body = rows
        .iter()
        .map(|m| format!("{}: {} ({})", m.id, m.render(), m.kind()))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Html(body))
}

/// 등록되지 않은 경로
pub async fn not_found() -> ApiError {
    ApiError::NotFound("경로 없음".to_string())
}
