//! 메트릭 모델.
//!
//! 게이지(덮어쓰기)와 카운터(누적) 두 종류의 메트릭과 병합 규칙을 정의한다.
//! 와이어/파일 포맷은 `{"id", "type", "value"?, "delta"?}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 메트릭 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// 갱신 시 이전 값을 대체
    Gauge,
    /// 갱신 시 이전 값에 더함
    Counter,
}

impl MetricKind {
    /// 와이어 포맷 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(CoreError::validation(
                "type",
                format!("알 수 없는 메트릭 타입: {other}"),
            )),
        }
    }
}

/// 메트릭 값 — 종류와 값이 항상 일치한다
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// 게이지 값
    Gauge(f64),
    /// 카운터 증분
    Counter(i64),
}

/// 단일 메트릭 (id + 현재 값)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetricRecord", into = "MetricRecord")]
pub struct Metric {
    /// 메트릭 식별자 (저장소 내 유일)
    pub id: String,
    /// 값
    pub value: MetricValue,
}

impl Metric {
    /// 게이지 메트릭 생성
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Gauge(value),
        }
    }

    /// 카운터 메트릭 생성
    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Counter(delta),
        }
    }

    /// 경로 인코딩된 값 파싱 (`/update/{type}/{name}/{value}`)
    pub fn parse(kind: MetricKind, id: &str, raw: &str) -> Result<Self, CoreError> {
        let metric = match kind {
            MetricKind::Gauge => {
                let value = raw.parse::<f64>().map_err(|e| {
                    CoreError::validation("value", format!("게이지 값 변환 실패 '{raw}': {e}"))
                })?;
                Self::gauge(id, value)
            }
            MetricKind::Counter => {
                let delta = raw.parse::<i64>().map_err(|e| {
                    CoreError::validation("delta", format!("카운터 값 변환 실패 '{raw}': {e}"))
                })?;
                Self::counter(id, delta)
            }
        };
        metric.validate()?;
        Ok(metric)
    }

    /// 메트릭 종류
    pub fn kind(&self) -> MetricKind {
        match self.value {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }

    /// 게이지 값 (카운터면 None)
    pub fn gauge_value(&self) -> Option<f64> {
        match self.value {
            MetricValue::Gauge(v) => Some(v),
            MetricValue::Counter(_) => None,
        }
    }

    /// 카운터 증분 (게이지면 None)
    pub fn counter_delta(&self) -> Option<i64> {
        match self.value {
            MetricValue::Counter(d) => Some(d),
            MetricValue::Gauge(_) => None,
        }
    }

    /// 식별자/값 검증 (게이지는 유한값만)
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.is_empty() {
            return Err(CoreError::validation("id", "메트릭 이름이 비어 있음"));
        }
        if let MetricValue::Gauge(v) = self.value {
            if !v.is_finite() {
                return Err(CoreError::validation(
                    "value",
                    format!("메트릭 '{}' 게이지 값은 유한해야 함: {v}", self.id),
                ));
            }
        }
        Ok(())
    }

    /// 기존 값(`self`)에 새 값을 병합
    ///
    /// 카운터는 합산, 게이지는 새 값으로 대체. 종류가 다르면 거부한다
    /// (id의 종류는 최초 기록 시 고정).
    pub fn merge(&self, incoming: &Metric) -> Result<Metric, CoreError> {
        match (self.value, incoming.value) {
            (MetricValue::Counter(existing), MetricValue::Counter(delta)) => {
                let total = existing.checked_add(delta).ok_or_else(|| {
                    CoreError::validation(
                        "delta",
                        format!("카운터 오버플로: {} ({existing} + {delta})", self.id),
                    )
                })?;
                Ok(Metric::counter(incoming.id.clone(), total))
            }
            (MetricValue::Gauge(_), MetricValue::Gauge(_)) => Ok(incoming.clone()),
            _ => Err(CoreError::validation(
                "type",
                format!(
                    "메트릭 '{}' 종류 불일치: 저장={}, 요청={}",
                    self.id,
                    self.kind(),
                    incoming.kind()
                ),
            )),
        }
    }

    /// 사람이 읽는 값 문자열
    pub fn render(&self) -> String {
        match self.value {
            MetricValue::Gauge(v) => v.to_string(),
            MetricValue::Counter(d) => d.to_string(),
        }
    }
}

/// 와이어/파일/DB 행 표현
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// 메트릭 식별자
    pub id: String,
    /// 메트릭 종류
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// 게이지 값
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// 카운터 증분
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
}

impl TryFrom<MetricRecord> for Metric {
    type Error = CoreError;

    fn try_from(record: MetricRecord) -> Result<Self, Self::Error> {
        let metric = match (record.kind, record.value, record.delta) {
            (MetricKind::Gauge, Some(value), None) => Metric::gauge(record.id, value),
            (MetricKind::Counter, None, Some(delta)) => Metric::counter(record.id, delta),
            (MetricKind::Gauge, None, None) | (MetricKind::Counter, None, None) => {
                return Err(CoreError::validation(
                    "value",
                    format!("메트릭 '{}' 값이 비어 있음", record.id),
                ))
            }
            (kind, _, _) => {
                return Err(CoreError::validation(
                    "value",
                    format!("메트릭 '{}' 값이 타입({kind})과 맞지 않음", record.id),
                ))
            }
        };
        metric.validate()?;
        Ok(metric)
    }
}

impl From<Metric> for MetricRecord {
    fn from(metric: Metric) -> Self {
        let kind = metric.kind();
        let (value, delta) = match metric.value {
            MetricValue::Gauge(v) => (Some(v), None),
            MetricValue::Counter(d) => (None, Some(d)),
        };
        Self {
            id: metric.id,
            kind,
            value,
            delta,
        }
    }
}

/// 단일 메트릭 조회 요청 (`POST /value/`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricQuery {
    /// 메트릭 식별자
    pub id: String,
    /// 메트릭 종류
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn counter_merge_adds_deltas() {
        let existing = Metric::counter("PollCount", 3);
        let merged = existing.merge(&Metric::counter("PollCount", 4)).unwrap();
        assert_eq!(merged.counter_delta(), Some(7));
    }

    #[test]
    fn gauge_merge_replaces_value() {
        let existing = Metric::gauge("Alloc", 100.5);
        let merged = existing.merge(&Metric::gauge("Alloc", 200.25)).unwrap();
        assert_eq!(merged.gauge_value(), Some(200.25));
    }

    #[test]
    fn mixed_kind_merge_rejected() {
        let existing = Metric::gauge("Alloc", 1.0);
        let result = existing.merge(&Metric::counter("Alloc", 1));
        assert_matches!(result, Err(CoreError::Validation { ref field, .. }) if field == "type");
    }

    #[test]
    fn counter_overflow_rejected() {
        let existing = Metric::counter("c", i64::MAX);
        assert!(existing.merge(&Metric::counter("c", 1)).is_err());
    }

    #[test]
    fn render_keeps_full_precision() {
        assert_eq!(Metric::gauge("a", 200.25).render(), "200.25");
        assert_eq!(Metric::gauge("a", 100.0).render(), "100");
        assert_eq!(Metric::gauge("a", 0.123456789012).render(), "0.123456789012");
        assert_eq!(Metric::counter("c", -42).render(), "-42");
    }

    #[test]
    fn wire_format_omits_absent_payload() {
        let json = serde_json::to_string(&Metric::counter("PollCount", 5)).unwrap();
        assert_eq!(json, r#"{"id":"PollCount","type":"counter","delta":5}"#);

        let json = serde_json::to_string(&Metric::gauge("Alloc", 1.5)).unwrap();
        assert_eq!(json, r#"{"id":"Alloc","type":"gauge","value":1.5}"#);
    }

    #[test]
    fn decode_rejects_missing_payload() {
        let result = serde_json::from_str::<Metric>(r#"{"id":"Alloc","type":"gauge"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn decode_rejects_empty_id() {
        let result = serde_json::from_str::<Metric>(r#"{"id":"","type":"gauge","value":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn decode_rejects_payload_of_other_kind() {
        let result = serde_json::from_str::<Metric>(r#"{"id":"x","type":"gauge","delta":1}"#);
        assert!(result.is_err());
        let result = serde_json::from_str::<Metric>(
            r#"{"id":"x","type":"counter","value":1.0,"delta":1}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let result = serde_json::from_str::<Metric>(r#"{"id":"x","type":"histogram","value":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn non_finite_gauges_rejected() {
        for raw in ["NaN", "inf", "infinity", "-inf"] {
            assert_matches!(
                Metric::parse(MetricKind::Gauge, "g", raw),
                Err(CoreError::Validation { ref field, .. }) if field == "value"
            );
        }
        assert!(Metric::gauge("g", f64::NAN).validate().is_err());
        assert!(Metric::gauge("g", f64::MAX).validate().is_ok());
    }

    #[test]
    fn parse_path_values() {
        let gauge = Metric::parse(MetricKind::Gauge, "Alloc", "100.5").unwrap();
        assert_eq!(gauge.gauge_value(), Some(100.5));

        let counter = Metric::parse(MetricKind::Counter, "PollCount", "2").unwrap();
        assert_eq!(counter.counter_delta(), Some(2));

        assert_matches!(
            Metric::parse(MetricKind::Counter, "PollCount", "2.5"),
            Err(CoreError::Validation { .. })
        );
        assert_matches!(
            Metric::parse(MetricKind::Gauge, "Alloc", "none"),
            Err(CoreError::Validation { .. })
        );
    }

    #[test]
    fn kind_from_str() {
        assert_eq!("gauge".parse::<MetricKind>().unwrap(), MetricKind::Gauge);
        assert_eq!("counter".parse::<MetricKind>().unwrap(), MetricKind::Counter);
        assert!("Gauge".parse::<MetricKind>().is_err());
    }
}
