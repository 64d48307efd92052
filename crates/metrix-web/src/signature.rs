//! HMAC-SHA256 요청 서명 검증 미들웨어.
//!
//! 키가 설정된 경우 본문이 있는 모든 요청은 `HashSHA256` 헤더가 있어야 하며,
//! 값은 압축 해제된 본문의 서명과 일치해야 한다. 불일치/누락 시 400.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use metrix_core::signing::{verify, SIGNATURE_HEADER};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// 요청 본문 최대 크기
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// 서명 검증
pub async fn verify_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(key) = state.key.clone() else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("본문 읽기 실패: {e}")))?;

    if !bytes.is_empty() {
        let signature = parts
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                warn!("서명 헤더 누락: {}", parts.uri);
                ApiError::BadRequest(format!("{SIGNATURE_HEADER} 헤더 누락"))
            })?;

        if !verify(&bytes, &key, signature) {
            warn!("서명 불일치: {}", parts.uri);
            return Err(ApiError::BadRequest("서명 불일치".to_string()));
        }
        debug!("서명 확인: {}", parts.uri);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
