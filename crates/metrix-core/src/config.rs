//! 애플리케이션 설정 구조체.
//!
//! 에이전트(수집 주기, 전송 주기, 동시 전송 한도)와 서버(주소, 저장소) 설정.
//! 바이너리가 CLI 플래그/환경변수에서 채운다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 기본 서버 주소
pub const DEFAULT_ADDRESS: &str = "localhost:8080";

// ============================================================
// 에이전트 설정
// ============================================================

/// 에이전트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 서버 주소 (host:port)
    #[serde(default = "default_address")]
    pub address: String,
    /// 수집 간격 (초)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// 전송 간격 (초)
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    /// 서명 키 (없으면 서명하지 않음)
    #[serde(default)]
    pub key: Option<String>,
    /// 동시 전송 워커 수
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            poll_interval_secs: default_poll_interval_secs(),
            report_interval_secs: default_report_interval_secs(),
            key: None,
            rate_limit: default_rate_limit(),
        }
    }
}

impl AgentConfig {
    /// 수집 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// 전송 간격
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    /// 워커 수 (최소 1)
    pub fn workers(&self) -> usize {
        self.rate_limit.max(1)
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.address.trim().is_empty() {
            return Err(CoreError::Config("서버 주소가 비어 있음".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(CoreError::Config("poll interval은 0보다 커야 함".to_string()));
        }
        if self.report_interval_secs == 0 {
            return Err(CoreError::Config(
                "report interval은 0보다 커야 함".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================
// 서버 설정
// ============================================================

/// 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 바인드 주소 (host:port)
    #[serde(default = "default_address")]
    pub address: String,
    /// 서명 키 (설정 시 본문이 있는 요청은 서명 필수)
    #[serde(default)]
    pub key: Option<String>,
    /// 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            key: None,
            storage: StorageConfig::default(),
        }
    }
}

/// 저장소 설정
///
/// 선택 우선순위: `database_dsn` → `file_path` → 인메모리
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 관계형 저장소 DSN (SQLite 경로 또는 URI)
    #[serde(default)]
    pub database_dsn: Option<String>,
    /// 스냅샷 파일 경로
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// 시작 시 파일에서 복원
    #[serde(default = "default_true")]
    pub restore: bool,
    /// 스냅샷 저장 간격 (초, 0이면 매 갱신마다 동기 저장)
    #[serde(default = "default_store_interval_secs")]
    pub store_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_dsn: None,
            file_path: None,
            restore: true,
            store_interval_secs: default_store_interval_secs(),
        }
    }
}

impl StorageConfig {
    /// 스냅샷 저장 간격 (동기 저장 모드면 None)
    pub fn store_interval(&self) -> Option<Duration> {
        (self.store_interval_secs > 0).then(|| Duration::from_secs(self.store_interval_secs))
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_report_interval_secs() -> u64 {
    10
}

fn default_rate_limit() -> usize {
    10
}

fn default_store_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}
