//! # metrix-monitor
//!
//! 에이전트 측 메트릭 수집 어댑터.
//! sysinfo로 자기 프로세스와 호스트의 CPU/메모리 값을 샘플링하고,
//! 수집 루프가 poll 간격마다 스냅샷을 전송 큐에 넣는다.

pub mod collector;
pub mod system;
