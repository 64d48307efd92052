//! HMAC-SHA256 요청 서명.
//!
//! 에이전트는 압축 전 원본 본문에 서명하고, 서버는 해제된 본문으로 재계산해 비교한다.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CoreError;

/// 서명 헤더 이름
pub const SIGNATURE_HEADER: &str = "HashSHA256";

type HmacSha256 = Hmac<Sha256>;

/// 본문 서명 (소문자 hex)
pub fn sign(body: &[u8], key: &str) -> Result<String, CoreError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| CoreError::Internal(format!("HMAC 키 초기화 실패: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// 서명 검증 (상수 시간 비교)
pub fn verify(body: &[u8], key: &str, signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
