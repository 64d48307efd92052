//! # metrix-network
//!
//! 에이전트 측 네트워크 어댑터.
//! 수집된 스냅샷을 주기적으로 병합해 서버 `/updates/`로 전송하며,
//! gzip 압축, HMAC-SHA256 서명, 재시도, 동시 전송 제한을 담당한다.

pub mod compression;
pub mod http_client;
pub mod sender;
