//! API 핸들러 모듈.

pub mod health;
pub mod metrics;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON 본문 디코딩 (형식 오류는 모두 400)
pub(crate) fn decode_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("잘못된 JSON: {e}")))
}
