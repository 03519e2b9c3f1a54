//! Battery readers
//!
//! macOS reports through `pmset -g batt`, Linux through
//! `/sys/class/power_supply/BAT*`. Hosts without a battery simply yield `None`.

use super::{BatteryReading, BatteryState};
use crate::execution::CommandExecutor;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const PMSET_TIMEOUT: Duration = Duration::from_secs(5);
const SYSFS_POWER_SUPPLY: &str = "/sys/class/power_supply";

/// Read the battery using the backend of the current platform
pub async fn read_battery() -> Option<BatteryReading> {
    if cfg!(target_os = "macos") {
        read_pmset().await
    } else if cfg!(target_os = "linux") {
        read_sysfs(Path::new(SYSFS_POWER_SUPPLY)).await
    } else {
        debug!("No battery backend for {}", std::env::consts::OS);
        None
    }
}

async fn read_pmset() -> Option<BatteryReading> {
    match CommandExecutor::run_checked("pmset", &["-g", "batt"], PMSET_TIMEOUT).await {
        Ok(output) => {
            let reading = parse_pmset(&output.stdout);
            if reading.is_none() {
                debug!("pmset reported no battery");
            }
            reading
        }
        Err(e) => {
            warn!("Battery unavailable: {}", e);
            None
        }
    }
}

/// Parse `pmset -g batt` output, e.g.
/// ` -InternalBattery-0 (id=4653155)	85%; discharging; 4:20 remaining present: true`
pub fn parse_pmset(output: &str) -> Option<BatteryReading> {
    for line in output.lines() {
        let Some(idx) = line.find("%;") else {
            continue;
        };

        let head = &line[..idx];
        let digit_count = head.chars().rev().take_while(|c| c.is_ascii_digit()).count();
        let Ok(percent) = head[head.len() - digit_count..].parse::<u8>() else {
            continue;
        };

        let state = line[idx + 2..].split(';').next().unwrap_or("").trim();
        if state.is_empty() {
            continue;
        }

        return Some(BatteryReading {
            percent,
            state: BatteryState::from_label(state),
        });
    }
    None
}

/// Read the first `BAT*` supply under a sysfs power_supply directory
pub async fn read_sysfs(root: &Path) -> Option<BatteryReading> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {:?}: {}", root, e);
            return None;
        }
    };

    let mut batteries = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with("BAT") {
            batteries.push(entry.path());
        }
    }
    batteries.sort();

    for battery in batteries {
        let capacity = tokio::fs::read_to_string(battery.join("capacity")).await;
        let status = tokio::fs::read_to_string(battery.join("status")).await;

        match (capacity, status) {
            (Ok(capacity), Ok(status)) => match capacity.trim().parse::<u8>() {
                Ok(percent) => {
                    return Some(BatteryReading {
                        percent,
                        state: BatteryState::from_label(&status),
                    })
                }
                Err(e) => warn!("Unparsable capacity in {:?}: {}", battery, e),
            },
            _ => debug!("Incomplete battery entry {:?}", battery),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pmset_discharging() {
        let output = "Now drawing from 'Battery Power'\n -InternalBattery-0 (id=4653155)\t85%; discharging; 4:20 remaining present: true\n";
        let reading = parse_pmset(output).unwrap();
        assert_eq!(reading.percent, 85);
        assert_eq!(reading.state, BatteryState::Discharging);
    }

    #[test]
    fn test_parse_pmset_ac_attached() {
        let output = "Now drawing from 'AC Power'\n -InternalBattery-0 (id=1)\t100%; AC attached; not charging present: true\n";
        let reading = parse_pmset(output).unwrap();
        assert_eq!(reading.percent, 100);
        assert_eq!(reading.state, BatteryState::Other);
    }

    #[test]
    fn test_parse_pmset_without_battery() {
        assert_eq!(parse_pmset("Now drawing from 'AC Power'\n"), None);
    }

    #[tokio::test]
    async fn test_read_sysfs_battery() {
        let dir = tempfile::tempdir().unwrap();
        let ac = dir.path().join("AC");
        let bat = dir.path().join("BAT0");
        std::fs::create_dir_all(&ac).unwrap();
        std::fs::create_dir_all(&bat).unwrap();
        std::fs::write(bat.join("capacity"), "17\n").unwrap();
        std::fs::write(bat.join("status"), "Charging\n").unwrap();

        let reading = read_sysfs(dir.path()).await.unwrap();
        assert_eq!(reading.percent, 17);
        assert_eq!(reading.state, BatteryState::Charging);
    }

    #[tokio::test]
    async fn test_read_sysfs_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_sysfs(&dir.path().join("nope")).await, None);
    }
}
