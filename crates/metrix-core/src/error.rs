//! Metrix 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 라이브러리 에러를 `CoreError`로 매핑해서 반환한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 유효성 검증, 저장소, 전송 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패 (id, 값, 타입)
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Metric")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 재시도 가능한 저장소 장애 (연결 끊김, 잠금 경합)
    #[error("일시적 저장소 에러: {0}")]
    TransientStorage(String),

    /// 재시도 불가능한 저장소 장애 (제약 조건 위반, 쿼리 오류 등)
    #[error("fatal DB error: {0}")]
    FatalStorage(String),

    /// 에이전트 → 서버 전송 실패 (연결 실패, 타임아웃, 5xx)
    #[error("전송 에러: {0}")]
    Transport(String),

    /// 서버가 요청을 거부함 (4xx) — 재시도해도 결과가 같다
    #[error("서버 거부 ({status}): {body}")]
    ServerRejected {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문
        body: String,
    },

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 필드 유효성 검증 에러 생성
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 메트릭 미발견 에러 생성
    pub fn metric_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: "Metric".to_string(),
            id: id.into(),
        }
    }

    /// 전송 재시도 대상인지 판별
    pub fn is_retryable_transport(&self) -> bool {
        matches!(self, CoreError::Transport(_))
    }
}
