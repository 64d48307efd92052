//! CLI 인자 정의.
//!
//! 우선순위: 플래그 > 환경변수 > 기본값.

use clap::{ArgAction, Parser};
use metrix_core::config::{AgentConfig, ServerConfig, StorageConfig, DEFAULT_ADDRESS};
use std::path::PathBuf;

/// Metrix 메트릭 수집 에이전트
///
/// 프로세스/호스트 메트릭을 주기적으로 수집해 서버로 전송
#[derive(Parser, Debug)]
#[command(name = "metrix-agent")]
#[command(author, version, about, long_about = None)]
pub struct AgentArgs {
    /// 서버 주소 (host:port)
    #[arg(short = 'a', long, env = "ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// 수집 간격 (초)
    #[arg(short = 'p', long, env = "POLL_INTERVAL", default_value_t = 2)]
    pub poll_interval: u64,

    /// 전송 간격 (초)
    #[arg(short = 'r', long, env = "REPORT_INTERVAL", default_value_t = 10)]
    pub report_interval: u64,

    /// 서명 키 (HMAC-SHA256)
    #[arg(short = 'k', long, env = "KEY")]
    pub key: Option<String>,

    /// 동시 전송 워커 수
    #[arg(short = 'l', long, env = "RATE_LIMIT", default_value_t = 10)]
    pub rate_limit: usize,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl AgentArgs {
    /// 에이전트 설정으로 변환
    pub fn config(&self) -> AgentConfig {
        AgentConfig {
            address: self.address.clone(),
            poll_interval_secs: self.poll_interval,
            report_interval_secs: self.report_interval,
            key: self.key.clone().filter(|k| !k.is_empty()),
            rate_limit: self.rate_limit,
        }
    }
}

/// Metrix 메트릭 수신 서버
///
/// 에이전트가 보낸 메트릭을 집계해 저장
#[derive(Parser, Debug)]
#[command(name = "metrix-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// 바인드 주소 (host:port)
    #[arg(short = 'a', long, env = "ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// 파일 스냅샷 간격 (초, 0이면 매 갱신마다 저장)
    #[arg(short = 'i', long, env = "STORE_INTERVAL", default_value_t = 300)]
    pub store_interval: u64,

    /// 파일 스냅샷 경로 (빈 값이면 인메모리)
    #[arg(short = 'f', long = "file-storage-path", env = "FILE_STORAGE_PATH")]
    pub file_storage_path: Option<String>,

    /// 시작 시 파일 스냅샷 복원
    #[arg(
        short = 'r',
        long,
        env = "RESTORE",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub restore: bool,

    /// SQLite DSN (설정 시 파일 스냅샷 대신 사용)
    #[arg(short = 'd', long = "database-dsn", env = "DATABASE_DSN")]
    pub database_dsn: Option<String>,

    /// 서명 키 (HMAC-SHA256)
    #[arg(short = 'k', long, env = "KEY")]
    pub key: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerArgs {
    /// 서버 설정으로 변환
    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            address: self.address.clone(),
            key: self.key.clone().filter(|k| !k.is_empty()),
            storage: StorageConfig {
                database_dsn: self
                    .database_dsn
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
                file_path: self
                    .file_storage_path
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from),
                restore: self.restore,
                store_interval_secs: self.store_interval,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_flags() {
        let args = AgentArgs::try_parse_from([
            "metrix-agent",
            "-a",
            "127.0.0.1:9090",
            "-p",
            "1",
            "-r",
            "5",
            "-k",
            "secret",
            "-l",
            "3",
        ])
        .unwrap();
        let config = args.config();

        assert_eq!(config.address, "127.0.0.1:9090");
        assert_eq!(config.poll_interval_secs, 1);
        assert_eq!(config.report_interval_secs, 5);
        assert_eq!(config.key.as_deref(), Some("secret"));
        assert_eq!(config.rate_limit, 3);
    }

    #[test]
    fn agent_empty_key_means_unsigned() {
        let args = AgentArgs::try_parse_from(["metrix-agent", "-k", ""]).unwrap();
        assert!(args.config().key.is_none());
    }

    #[test]
    fn agent_rejects_non_numeric_interval() {
        assert!(AgentArgs::try_parse_from(["metrix-agent", "-p", "fast"]).is_err());
    }

    #[test]
    fn server_flags() {
        let args = ServerArgs::try_parse_from([
            "metrix-server",
            "-a",
            "0.0.0.0:8081",
            "-i",
            "0",
            "-f",
            "/tmp/metrics.json",
            "-r",
            "false",
            "-d",
            "metrics.db",
        ])
        .unwrap();
        let config = args.config();

        assert_eq!(config.address, "0.0.0.0:8081");
        assert_eq!(config.storage.store_interval_secs, 0);
        assert_eq!(
            config.storage.file_path,
            Some(PathBuf::from("/tmp/metrics.json"))
        );
        assert!(!config.storage.restore);
        assert_eq!(config.storage.database_dsn.as_deref(), Some("metrics.db"));
    }

    #[test]
    fn server_blank_paths_are_unset() {
        let args = ServerArgs::try_parse_from(["metrix-server", "-f", "", "-d", ""]).unwrap();
        let config = args.config();
        assert!(config.storage.file_path.is_none());
        assert!(config.storage.database_dsn.is_none());

        let args = ServerArgs::try_parse_from([
            "metrix-server",
            "--file-storage-path=",
            "--database-dsn",
            "  ",
        ])
        .unwrap();
        let config = args.config();
        assert!(config.storage.file_path.is_none());
        assert!(config.storage.database_dsn.is_none());
    }
}
