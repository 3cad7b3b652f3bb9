#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct PhaseSample {
    pub phase: String,
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub memory_usage_percent: f32,
    pub elapsed_time: Duration,
}

#[cfg(feature = "cli")]
#[derive(Default)]
struct MonitorState {
    samples: Vec<PhaseSample>,
    peak_memory_mb: u64,
}

/// 記錄每個處理階段 (讀檔、解析、佈局、匯出) 的 CPU 與記憶體用量
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    state: Mutex<MonitorState>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if enabled && pid.is_none() {
            tracing::warn!("Cannot determine current PID, system monitoring disabled");
        }

        let system = if enabled && pid.is_some() {
            let mut system = System::new_with_specifics(RefreshKind::everything());
            system.refresh_all();
            system
        } else {
            System::new()
        };

        Self {
            system: Mutex::new(system),
            pid,
            start_time: Instant::now(),
            state: Mutex::new(MonitorState::default()),
            enabled: enabled && pid.is_some(),
        }
    }

    pub fn sample(&self, phase: &str) -> Option<PhaseSample> {
        if !self.enabled {
            return None;
        }

        let mut system = self.system.lock().ok()?;
        system.refresh_all();

        let process = system.process(self.pid?)?;
        let memory_mb = process.memory() / 1024 / 1024;
        let total_memory = system.total_memory() / 1024 / 1024;
        let memory_percent = if total_memory > 0 {
            (memory_mb as f32 / total_memory as f32) * 100.0
        } else {
            0.0
        };

        let sample = PhaseSample {
            phase: phase.to_string(),
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            memory_usage_percent: memory_percent,
            elapsed_time: self.start_time.elapsed(),
        };

        let mut state = self.state.lock().ok()?;
        state.peak_memory_mb = state.peak_memory_mb.max(memory_mb);
        state.samples.push(sample.clone());

        Some(sample)
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(sample) = self.sample(phase) {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB ({:.1}%), Time: {:?}",
                sample.phase,
                sample.cpu_usage,
                sample.memory_usage_mb,
                sample.memory_usage_percent,
                sample.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        if let Ok(state) = self.state.lock() {
            tracing::info!(
                "📊 Final Stats - {} phases, Total Time: {:?}, Peak Memory: {}MB",
                state.samples.len(),
                self.start_time.elapsed(),
                state.peak_memory_mb
            );
        }
    }

    pub fn samples(&self) -> Vec<PhaseSample> {
        self.state
            .lock()
            .map(|state| state.samples.clone())
            .unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 建置時提供空實作
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_records_nothing() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.sample("parse").is_none());
        assert!(monitor.samples().is_empty());
    }
}
