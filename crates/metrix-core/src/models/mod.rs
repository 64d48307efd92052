//! 도메인 모델.

pub mod batch;
pub mod metric;
