//! # metrix-core
//!
//! Metrix 메트릭 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 에이전트와 서버의 모든 crate가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`] — 메트릭 데이터 구조체와 배치 병합 규칙
//! - [`ports`] — Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`] — 핵심 에러 타입 (thiserror)
//! - [`config`] — 에이전트/서버 설정 구조체
//! - [`retry`] — 재시도 + 백오프 유틸리티
//! - [`signing`] — HMAC-SHA256 본문 서명

pub mod config;
pub mod error;
pub mod models;
pub mod ports;
pub mod retry;
pub mod signing;
