//! 배치 병합 (coalescing).
//!
//! 같은 id가 여러 번 등장하는 배치를 저장소에 닿기 전에 id당 하나로 접는다.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::models::metric::Metric;

/// 배치를 id별로 병합
///
/// - 카운터: 증분 합산
/// - 게이지: 입력 순서상 마지막 값
/// - 결과 순서: id가 처음 등장한 순서
///
/// 한 배치 안에서 같은 id가 서로 다른 종류로 등장하면 배치 전체를 거부한다.
pub fn coalesce<I>(metrics: I) -> Result<Vec<Metric>, CoreError>
where
    I: IntoIterator<Item = Metric>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Metric> = Vec::new();

    for metric in metrics {
        metric.validate()?;
        match positions.get(&metric.id) {
            Some(&pos) => {
                merged[pos] = merged[pos].merge(&metric)?;
            }
            None => {
                positions.insert(metric.id.clone(), merged.len());
                merged.push(metric);
            }
        }
    }

    Ok(merged)
}
