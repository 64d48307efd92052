//! gzip 압축.

use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use metrix_core::error::CoreError;
use std::io::Read;

/// gzip 압축
pub fn gzip(data: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut encoder = GzEncoder::new(data, Compression::default());
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| CoreError::Internal(format!("gzip 압축 실패: {e}")))?;
    Ok(compressed)
}

/// gzip 해제
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| CoreError::Internal(format!("gzip 해제 실패: {e}")))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_output_has_magic_header() {
        let compressed = gzip(br#"[{"id":"Alloc","type":"gauge","value":1.5}]"#).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn repetitive_payload_shrinks() {
        let data = br#"{"id":"CPUutilization1","type":"gauge","value":12.5},"#.repeat(100);
        let compressed = gzip(&data).unwrap();
        assert!(compressed.len() < data.len() / 4);
        assert_eq!(gunzip(&compressed).unwrap(), data);
    }

    #[test]
    fn corrupted_data_rejected() {
        assert!(gunzip(b"definitely not gzip").is_err());
    }
}
