//! 런타임/호스트 리소스 샘플링.
//!
//! `MetricCollector` 포트 구현. sysinfo 기반 프로세스 통계와 호스트 CPU/메모리 수집.

use async_trait::async_trait;
use metrix_core::error::CoreError;
use metrix_core::models::metric::Metric;
use metrix_core::ports::monitor::MetricCollector;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

/// sysinfo 기반 샘플러 — `MetricCollector` 포트 구현
pub struct SysInfoSampler {
    sys: Mutex<System>,
    /// 현재 프로세스 (조회 실패 시 프로세스 게이지 생략)
    pid: Option<Pid>,
}

impl SysInfoSampler {
    /// 새 샘플러 생성
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("현재 프로세스 PID 조회 실패, 프로세스 메트릭 생략: {e}");
                None
            }
        };

        Self {
            sys: Mutex::new(System::new_all()),
            pid,
        }
    }
}

impl Default for SysInfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricCollector for SysInfoSampler {
    async fn sample(&self) -> Result<Vec<Metric>, CoreError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| CoreError::Internal(format!("시스템 잠금 실패: {e}")))?;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let mut metrics = Vec::with_capacity(16 + sys.cpus().len());

        // 프로세스
        if let Some(pid) = self.pid {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            if let Some(process) = sys.process(pid) {
                let disk = process.disk_usage();
                metrics.extend([
                    Metric::gauge("ProcessResidentMemory", process.memory() as f64),
                    Metric::gauge("ProcessVirtualMemory", process.virtual_memory() as f64),
                    Metric::gauge("ProcessCpuUsage", f64::from(process.cpu_usage())),
                    Metric::gauge("ProcessDiskRead", disk.total_read_bytes as f64),
                    Metric::gauge("ProcessDiskWritten", disk.total_written_bytes as f64),
                    Metric::gauge("ProcessRunTime", process.run_time() as f64),
                ]);
            }
        }

        // 메모리
        metrics.extend([
            Metric::gauge("TotalMemory", sys.total_memory() as f64),
            Metric::gauge("FreeMemory", sys.free_memory() as f64),
            Metric::gauge("UsedMemory", sys.used_memory() as f64),
            Metric::gauge("AvailableMemory", sys.available_memory() as f64),
            Metric::gauge("TotalSwap", sys.total_swap() as f64),
            Metric::gauge("UsedSwap", sys.used_swap() as f64),
        ]);

        // CPU (논리 코어별, 1부터)
        for (index, cpu) in sys.cpus().iter().enumerate() {
            metrics.push(Metric::gauge(
                format!("CPUutilization{}", index + 1),
                f64::from(cpu.cpu_usage()),
            ));
        }
        metrics.push(Metric::gauge(
            "GlobalCpuUsage",
            f64::from(sys.global_cpu_usage()),
        ));

        debug!(
            "샘플링: {}건, CPU {:.1}%, 메모리 {}/{}MB",
            metrics.len(),
            sys.global_cpu_usage(),
            sys.used_memory() / 1_048_576,
            sys.total_memory() / 1_048_576
        );

        Ok(metrics)
    }
}
