//! Metric snapshot model and sampling capability for HostPulse
//!
//! Provides:
//! - `MetricSnapshot`: one optional reading per monitored dimension
//! - `MetricSampler`: pluggable sampling backend, one method per dimension
//! - `collect_snapshot`: samples the enabled dimensions (load averages always)
//! - `render_summary`: human-readable table printed on every monitor run

pub mod battery;
pub mod system;

use crate::config::Checks;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

pub use system::SystemSampler;

/// Alertable dimension, also the key used for cooldown bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Cpu,
    Memory,
    Disk,
    Temperature,
    Battery,
}

impl MetricId {
    /// Fixed evaluation order
    pub const ALL: [MetricId; 5] = [
        MetricId::Cpu,
        MetricId::Memory,
        MetricId::Disk,
        MetricId::Temperature,
        MetricId::Battery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::Cpu => "cpu",
            MetricId::Memory => "memory",
            MetricId::Disk => "disk",
            MetricId::Temperature => "temperature",
            MetricId::Battery => "battery",
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Battery charging state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryState {
    Charging,
    Discharging,
    Other,
}

impl BatteryState {
    /// Map a backend state label ("charging", "Discharging", "AC attached"...)
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "charging" => BatteryState::Charging,
            "discharging" => BatteryState::Discharging,
            _ => BatteryState::Other,
        }
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatteryState::Charging => "charging",
            BatteryState::Discharging => "discharging",
            BatteryState::Other => "other",
        };
        f.write_str(label)
    }
}

/// Battery charge reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub percent: u8,
    pub state: BatteryState,
}

/// Load averages, informational only
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub load_1m: f64,
    pub load_5m: f64,
    pub load_15m: f64,
}

/// Readings collected in one invocation; `None` means unavailable this cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk_percent: Option<f64>,
    pub temperature_c: Option<f64>,
    pub battery: Option<BatteryReading>,
    pub load: LoadAverage,
}

/// Sampling backend. Each method is independently fallible: a failure is
/// reported as `None` and never aborts the run.
#[async_trait]
pub trait MetricSampler: Send + Sync {
    async fn sample_cpu(&self) -> Option<f64>;
    async fn sample_memory(&self) -> Option<f64>;
    async fn sample_disk(&self, path: &Path) -> Option<f64>;
    async fn sample_temperature(&self) -> Option<f64>;
    async fn sample_battery(&self) -> Option<BatteryReading>;
    async fn sample_load(&self) -> LoadAverage;
}

/// Collect a snapshot, sampling only the dimensions enabled in `checks`
pub async fn collect_snapshot(
    sampler: &dyn MetricSampler,
    checks: &Checks,
    disk_path: &Path,
) -> MetricSnapshot {
    debug!("Collecting metric snapshot...");
    let mut snapshot = MetricSnapshot::default();

    if checks.cpu {
        snapshot.cpu_percent = sampler.sample_cpu().await;
        log_if_unavailable(MetricId::Cpu, snapshot.cpu_percent.is_none());
    }
    if checks.memory {
        snapshot.memory_percent = sampler.sample_memory().await;
        log_if_unavailable(MetricId::Memory, snapshot.memory_percent.is_none());
    }
    if checks.disk {
        snapshot.disk_percent = sampler.sample_disk(disk_path).await;
        log_if_unavailable(MetricId::Disk, snapshot.disk_percent.is_none());
    }
    if checks.temperature {
        snapshot.temperature_c = sampler.sample_temperature().await;
        log_if_unavailable(MetricId::Temperature, snapshot.temperature_c.is_none());
    }
    if checks.battery {
        snapshot.battery = sampler.sample_battery().await;
        log_if_unavailable(MetricId::Battery, snapshot.battery.is_none());
    }
    snapshot.load = sampler.sample_load().await;

    snapshot
}

fn log_if_unavailable(metric: MetricId, unavailable: bool) {
    if unavailable {
        info!("{} reading unavailable this cycle", metric);
    }
}

/// Render the snapshot as the table printed to stdout. Disabled checks are omitted.
pub fn render_summary(snapshot: &MetricSnapshot, checks: &Checks) -> String {
    let rule = "=".repeat(40);
    let mut lines = vec!["HostPulse - System Metrics".to_string(), rule.clone()];

    let percent = |value: Option<f64>| match value {
        Some(v) => format!("{:.1}%", v),
        None => "unavailable".to_string(),
    };

    if checks.cpu {
        lines.push(format!("  CPU Usage:     {}", percent(snapshot.cpu_percent)));
    }
    if checks.memory {
        lines.push(format!("  Memory Usage:  {}", percent(snapshot.memory_percent)));
    }
    if checks.disk {
        lines.push(format!("  Disk Usage:    {}", percent(snapshot.disk_percent)));
    }
    if checks.temperature {
        let temp = match snapshot.temperature_c {
            Some(t) => format!("{:.1}°C", t),
            None => "unavailable".to_string(),
        };
        lines.push(format!("  CPU Temp:      {}", temp));
    }
    if checks.battery {
        let battery = match &snapshot.battery {
            Some(b) => format!("{}% ({})", b.percent, b.state),
            None => "unavailable".to_string(),
        };
        lines.push(format!("  Battery:       {}", battery));
    }
    let load = &snapshot.load;
    lines.push(format!(
        "  Load Avg:      {:.2} / {:.2} / {:.2}",
        load.load_1m, load.load_5m, load.load_15m
    ));
    lines.push(rule);

    lines.join("\n")
}
