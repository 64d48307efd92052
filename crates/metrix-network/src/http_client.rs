//! HTTP 메트릭 전송 클라이언트.
//!
//! `MetricsApi` 포트 구현. JSON 직렬화 → (선택) HMAC 서명 → gzip 압축 → `POST /updates/`.
//! 재시도는 호출자(`Sender`)가 담당한다.

use async_trait::async_trait;
use metrix_core::error::CoreError;
use metrix_core::models::metric::Metric;
use metrix_core::ports::api_client::MetricsApi;
use metrix_core::signing::{sign, SIGNATURE_HEADER};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

use crate::compression;

/// 기본 요청 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP 메트릭 클라이언트 — `MetricsApi` 포트 구현
pub struct HttpMetricsClient {
    client: reqwest::Client,
    updates_url: String,
    key: Option<String>,
}

impl HttpMetricsClient {
    /// 새 클라이언트 생성
    ///
    /// `address`는 `host:port` 또는 스킴을 포함한 URL.
    pub fn new(address: &str, key: Option<String>, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Transport(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            updates_url: format!("{}/updates/", base_url(address)),
            key: key.filter(|k| !k.is_empty()),
        })
    }

    /// 배치 전송 URL
    pub fn updates_url(&self) -> &str {
        &self.updates_url
    }
}

fn base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

#[async_trait]
impl MetricsApi for HttpMetricsClient {
    async fn send_batch(&self, metrics: &[Metric]) -> Result<(), CoreError> {
        let body = serde_json::to_vec(metrics)?;

        let mut request = self
            .client
            .post(&self.updates_url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_ENCODING, "gzip");
        if let Some(key) = &self.key {
            request = request.header(SIGNATURE_HEADER, sign(&body, key)?);
        }
        let compressed = compression::gzip(&body)?;

        let resp = request
            .body(compressed)
            .send()
            .await
            .map_err(|e| CoreError::Transport(format!("요청 실패: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            debug!("배치 전송 완료: {}건, {} bytes", metrics.len(), body.len());
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_else(|e| {
            tracing::warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        if status.is_server_error() {
            Err(CoreError::Transport(format!("서버 에러 ({status}): {text}")))
        } else {
            Err(CoreError::ServerRejected {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mockito::Matcher;

    fn batch() -> Vec<Metric> {
        vec![Metric::counter("PollCount", 5), Metric::gauge("Alloc", 1.5)]
    }

    #[test]
    fn address_without_scheme_gets_http() {
        assert_eq!(base_url("localhost:8080"), "http://localhost:8080");
        assert_eq!(base_url("https://metrics.example/"), "https://metrics.example");
    }

    #[tokio::test]
    async fn sends_gzipped_json_to_updates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/updates/")
            .match_header("content-type", "application/json")
            .match_header("content-encoding", "gzip")
            .match_header(SIGNATURE_HEADER, Matcher::Missing)
            .with_status(200)
            .create_async()
            .await;

        let client = HttpMetricsClient::new(&server.url(), None, DEFAULT_TIMEOUT).unwrap();
        client.send_batch(&batch()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn signs_uncompressed_body_when_key_set() {
        let body = serde_json::to_vec(&batch()).unwrap();
        let expected = sign(&body, "secret").unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/updates/")
            .match_header(SIGNATURE_HEADER, expected.as_str())
            .with_status(200)
            .create_async()
            .await;

        let client = HttpMetricsClient::new(
            &server.url(),
            Some("secret".to_string()),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        client.send_batch(&batch()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_transport() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/updates/")
            .with_status(503)
            .with_body("storage unavailable")
            .create_async()
            .await;

        let client = HttpMetricsClient::new(&server.url(), None, DEFAULT_TIMEOUT).unwrap();
        let err = client.send_batch(&batch()).await.unwrap_err();
        assert!(err.is_retryable_transport());
    }

    #[tokio::test]
    async fn client_error_is_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/updates/")
            .with_status(400)
            .with_body("signature mismatch")
            .create_async()
            .await;

        let client = HttpMetricsClient::new(&server.url(), None, DEFAULT_TIMEOUT).unwrap();
        assert_matches!(
            client.send_batch(&batch()).await,
            Err(CoreError::ServerRejected { status: 400, ref body }) if body == "signature mismatch"
        );
    }

    #[tokio::test]
    async fn connection_refused_is_transport() {
        // 바인드 후 즉시 해제한 포트
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let client =
            HttpMetricsClient::new(&format!("127.0.0.1:{port}"), None, DEFAULT_TIMEOUT).unwrap();
        assert_matches!(
            client.send_batch(&batch()).await,
            Err(CoreError::Transport(_))
        );
    }
}
