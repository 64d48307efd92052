//! 메트릭 갱신/조회 핸들러.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use metrix_core::models::metric::{Metric, MetricKind, MetricQuery};
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

use super::decode_json;

/// 경로 인코딩 단일 갱신
///
/// POST /update/{type}/{name}/{value}
pub async fn update_from_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Result<&'static str, ApiError> {
    let kind: MetricKind = kind.parse()?;
    let metric = Metric::parse(kind, &name, &value)?;
    state.storage.update_metric(metric).await?;
    Ok("Metric Updated")
}

/// 값이 빠진 경로 갱신
///
/// POST /update/{type}/{name}
pub async fn update_missing_value(
    Path((_kind, name)): Path<(String, String)>,
) -> ApiError {
    ApiError::BadRequest(format!("메트릭 '{name}' 값 누락"))
}

/// JSON 단일 갱신, 병합된 값을 반환
///
/// POST /update/
pub async fn update_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Metric>, ApiError> {
    let metric: Metric = decode_json(&body)?;
    let merged = state.storage.update_metric(metric).await?;
    Ok(Json(merged))
}

/// JSON 배치 갱신, 배치에 등장한 id의 병합된 값을 반환 (첫 등장 순)
///
/// POST /updates/
pub async fn update_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Metric>>, ApiError> {
    let batch: Vec<Metric> = decode_json(&body)?;
    let received = batch.len();
    let merged = state.storage.update_metric_batch(batch).await?;
    debug!("배치 수신: {received}건 → {}개 id", merged.len());
    Ok(Json(merged))
}

/// 단일 값 조회 (plain text)
///
/// GET /value/{type}/{name}
pub async fn value_from_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<String, ApiError> {
    let kind: MetricKind = kind.parse()?;
    let metric = find_metric(&state, &name, kind).await?;
    Ok(metric.render())
}

/// JSON 단일 조회
///
/// POST /value/
pub async fn value_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Metric>, ApiError> {
    let query: MetricQuery = decode_json(&body)?;
    if query.id.is_empty() {
        return Err(ApiError::BadRequest("메트릭 이름이 비어 있음".to_string()));
    }
    let metric = find_metric(&state, &query.id, query.kind).await?;
    Ok(Json(metric))
}

/// id + 종류로 조회 (종류가 다르면 미발견)
async fn find_metric(state: &AppState, id: &str, kind: MetricKind) -> Result<Metric, ApiError> {
    let metric = state.storage.get_metric(id).await?;
    if metric.kind() != kind {
        return Err(ApiError::NotFound(format!(
            "{kind} 메트릭 '{id}' 없음 (저장된 종류: {})",
            metric.kind()
        )));
    }
    Ok(metric)
}
