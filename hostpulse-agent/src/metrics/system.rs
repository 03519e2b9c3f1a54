//! Default sampling backend
//!
//! CPU, memory and load come from `sysinfo`. Disk usage uses `statvfs` on
//! Unix (used = total - free, so root-reserved blocks are not counted as
//! used) and `sysinfo` disks elsewhere. Temperature tries the
//! sysinfo sensors first, then the macOS utilities `osx-cpu-temp` and
//! `powermetrics`. Battery is delegated to [`super::battery`].

use super::{battery, BatteryReading, LoadAverage, MetricSampler};
use crate::execution::CommandExecutor;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use sysinfo::{Components, Disks, System};
use tracing::{debug, warn};

const OSX_CPU_TEMP_BINARIES: &[&str] = &["osx-cpu-temp", "/usr/local/bin/osx-cpu-temp"];
const OSX_CPU_TEMP_TIMEOUT: Duration = Duration::from_secs(5);
const POWERMETRICS_TIMEOUT: Duration = Duration::from_secs(10);

/// Sensor labels that describe the CPU die or package
const CPU_SENSOR_HINTS: &[&str] = &["cpu", "package", "core", "tdie", "tctl"];

/// Samples the local host
#[derive(Debug, Default)]
pub struct SystemSampler;

impl SystemSampler {
    pub fn new() -> Self {
        Self
    }

    fn sensor_temperature() -> Option<f64> {
        let components = Components::new_with_refreshed_list();
        components
            .list()
            .iter()
            .filter(|c| {
                let label = c.label().to_ascii_lowercase();
                CPU_SENSOR_HINTS.iter().any(|hint| label.contains(hint))
            })
            .map(|c| c.temperature() as f64)
            .filter(|t| t.is_finite() && *t > 0.0)
            .fold(None, |max: Option<f64>, t| Some(max.map_or(t, |m| m.max(t))))
    }

    async fn osx_cpu_temp() -> Option<f64> {
        for binary in OSX_CPU_TEMP_BINARIES {
            match CommandExecutor::run_checked(binary, &[], OSX_CPU_TEMP_TIMEOUT).await {
                Ok(output) => {
                    if let Some(celsius) = parse_celsius(&output.stdout) {
                        return Some(celsius);
                    }
                }
                Err(e) => debug!("{}", e),
            }
        }
        None
    }

    #[cfg(unix)]
    fn statvfs_usage(path: &Path) -> Option<f64> {
        match nix::sys::statvfs::statvfs(path) {
            Ok(stat) => {
                let fragment = stat.fragment_size() as u64;
                let total = (stat.blocks() as u64).saturating_mul(fragment);
                let free = (stat.blocks_free() as u64).saturating_mul(fragment);
                usage_percent(total, free)
            }
            Err(e) => {
                debug!("statvfs({:?}) failed: {}", path, e);
                None
            }
        }
    }

    #[cfg(not(unix))]
    fn statvfs_usage(_path: &Path) -> Option<f64> {
        None
    }

    async fn powermetrics() -> Option<f64> {
        let args = ["-n", "powermetrics", "--samplers", "smc", "-i", "1", "-n", "1"];
        match CommandExecutor::run_checked("sudo", &args, POWERMETRICS_TIMEOUT).await {
            Ok(output) => parse_powermetrics(&output.stdout),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

#[async_trait]
impl MetricSampler for SystemSampler {
    async fn sample_cpu(&self) -> Option<f64> {
        let mut sys = System::new();
        sys.refresh_cpu_usage();

        // Usage is a delta between two refreshes
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        sys.refresh_cpu_usage();

        if sys.cpus().is_empty() {
            warn!("CPU usage unavailable: no CPUs reported");
            return None;
        }
        Some(round1(sys.global_cpu_info().cpu_usage() as f64))
    }

    async fn sample_memory(&self) -> Option<f64> {
        let mut sys = System::new();
        sys.refresh_memory();

        let total_bytes = sys.total_memory();
        if total_bytes == 0 {
            warn!("Memory usage unavailable: total memory reported as 0");
            return None;
        }
        let used_bytes = total_bytes.saturating_sub(sys.available_memory());
        Some(round1(used_bytes as f64 / total_bytes as f64 * 100.0))
    }

    async fn sample_disk(&self, path: &Path) -> Option<f64> {
        if let Some(percent) = Self::statvfs_usage(path) {
            return Some(percent);
        }

        let disks = Disks::new_with_refreshed_list();

        // Longest mount point containing the path
        let disk = disks
            .list()
            .iter()
            .filter(|d| path.starts_with(d.mount_point()) && d.total_space() > 0)
            .max_by_key(|d| d.mount_point().as_os_str().len());

        match disk {
            Some(d) => usage_percent(d.total_space(), d.available_space()),
            None => {
                warn!("Disk usage unavailable: no filesystem found for {:?}", path);
                None
            }
        }
    }

    async fn sample_temperature(&self) -> Option<f64> {
        if let Some(celsius) = Self::sensor_temperature() {
            return Some(round1(celsius));
        }
        if cfg!(target_os = "macos") {
            if let Some(celsius) = Self::osx_cpu_temp().await {
                return Some(celsius);
            }
            if let Some(celsius) = Self::powermetrics().await {
                return Some(celsius);
            }
        }
        warn!("CPU temperature unavailable: no sensor or utility answered");
        None
    }

    async fn sample_battery(&self) -> Option<BatteryReading> {
        battery::read_battery().await
    }

    async fn sample_load(&self) -> LoadAverage {
        let load = System::load_average();
        LoadAverage {
            load_1m: round2(load.one),
            load_5m: round2(load.five),
            load_15m: round2(load.fifteen),
        }
    }
}

/// First `<number> [°]C` occurrence, e.g. `61.8°C`
pub fn parse_celsius(text: &str) -> Option<f64> {
    let mut rest = text;
    while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
        let candidate = &rest[start..];
        let len = candidate
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(candidate.len());
        let (number, tail) = candidate.split_at(len);
        let unit = tail.trim_start().trim_start_matches('°');
        if unit.starts_with('C') {
            if let Ok(value) = number.parse::<f64>() {
                return Some(value);
            }
        }
        rest = tail;
    }
    None
}

/// `CPU die temperature: 48.52 C` line of `powermetrics --samplers smc`
pub fn parse_powermetrics(text: &str) -> Option<f64> {
    text.lines()
        .find_map(|line| line.split_once("CPU die temperature:"))
        .and_then(|(_, value)| parse_celsius(value))
}

/// Percent of `total_bytes` not free, `None` for an empty filesystem
fn usage_percent(total_bytes: u64, free_bytes: u64) -> Option<f64> {
    if total_bytes == 0 {
        return None;
    }
    let used = total_bytes.saturating_sub(free_bytes);
    Some(round1(used as f64 / total_bytes as f64 * 100.0))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_osx_cpu_temp_output() {
        assert_eq!(parse_celsius("61.8°C\n"), Some(61.8));
        assert_eq!(parse_celsius("CPU: 70 C"), Some(70.0));
        assert_eq!(parse_celsius("fan 1200 rpm, die 55.0 °C"), Some(55.0));
        assert_eq!(parse_celsius("no reading"), None);
    }

    #[test]
    fn test_parse_powermetrics_output() {
        let output = "**** SMC sensors ****\n\nCPU die temperature: 48.52 C\nFan: 0 rpm\n";
        assert_eq!(parse_powermetrics(output), Some(48.52));
        assert_eq!(parse_powermetrics("Fan: 0 rpm\n"), None);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round1(83.349), 83.3);
        assert_eq!(round2(1.23456), 1.23);
    }

    #[test]
    fn test_usage_percent_counts_reserved_blocks_as_free() {
        // 100 blocks, 20 free of which 5 are reserved for root
        assert_eq!(usage_percent(100 * 4096, 20 * 4096), Some(80.0));
        assert_eq!(usage_percent(1000, 1000), Some(0.0));
        assert_eq!(usage_percent(0, 0), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_root_disk_usage_from_statvfs() {
        let percent = SystemSampler::statvfs_usage(Path::new("/")).unwrap();
        assert!((0.0..=100.0).contains(&percent));

        let sampled = SystemSampler::new().sample_disk(Path::new("/")).await;
        assert!(sampled.is_some());
    }

    #[tokio::test]
    async fn test_system_sampler_memory_and_load() {
        let sampler = SystemSampler::new();
        let memory = sampler.sample_memory().await.unwrap();
        assert!((0.0..=100.0).contains(&memory));

        let load = sampler.sample_load().await;
        assert!(load.load_1m >= 0.0);
    }
}
