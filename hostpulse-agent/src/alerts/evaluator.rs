//! Threshold evaluation
//!
//! Pure function from a snapshot to the list of threshold violations.
//! Each dimension is gated by its check being enabled and its value being
//! present; absent readings are skipped silently.

use crate::config::{Checks, Thresholds};
use crate::metrics::{BatteryState, MetricId, MetricSnapshot};
use serde::Serialize;

/// A single dimension over (or, for battery, under) its threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub metric: MetricId,
    pub message: String,
}

impl Violation {
    fn new(metric: MetricId, message: String) -> Self {
        Self { metric, message }
    }
}

/// Evaluate a snapshot. Output order is cpu, memory, disk, temperature, battery.
///
/// Boundaries are inclusive: usage fires at `value >= threshold`, battery
/// fires at `percent <= battery_below` unless the battery is charging.
pub fn evaluate(snapshot: &MetricSnapshot, thresholds: &Thresholds, checks: &Checks) -> Vec<Violation> {
    let mut violations = Vec::new();

    for metric in MetricId::ALL {
        if !checks.is_enabled(metric) {
            continue;
        }

        let violation = match metric {
            MetricId::Cpu => usage(metric, "CPU usage", snapshot.cpu_percent, thresholds.cpu_percent),
            MetricId::Memory => usage(
                metric,
                "Memory usage",
                snapshot.memory_percent,
                thresholds.memory_percent,
            ),
            MetricId::Disk => usage(metric, "Disk usage", snapshot.disk_percent, thresholds.disk_percent),
            MetricId::Temperature => snapshot
                .temperature_c
                .filter(|t| *t >= thresholds.temperature_c)
                .map(|t| {
                    Violation::new(
                        metric,
                        format!(
                            "CPU temperature at {:.1}°C (threshold: {}°C)",
                            t, thresholds.temperature_c
                        ),
                    )
                }),
            MetricId::Battery => snapshot
                .battery
                .filter(|b| b.state != BatteryState::Charging && b.percent <= thresholds.battery_below)
                .map(|b| {
                    Violation::new(
                        metric,
                        format!(
                            "Battery at {}% (threshold: {}%)",
                            b.percent, thresholds.battery_below
                        ),
                    )
                }),
        };

        violations.extend(violation);
    }

    violations
}

fn usage(metric: MetricId, label: &str, value: Option<f64>, threshold: f64) -> Option<Violation> {
    value.filter(|v| *v >= threshold).map(|v| {
        Violation::new(
            metric,
            format!("{} at {:.1}% (threshold: {}%)", label, v, threshold),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BatteryReading;

    fn ids(violations: &[Violation]) -> Vec<MetricId> {
        violations.iter().map(|v| v.metric).collect()
    }

    fn full_snapshot() -> MetricSnapshot {
        MetricSnapshot {
            cpu_percent: Some(99.0),
            memory_percent: Some(99.0),
            disk_percent: Some(99.0),
            temperature_c: Some(99.0),
            battery: Some(BatteryReading { percent: 1, state: BatteryState::Discharging }),
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_values_never_fire() {
        let thresholds = Thresholds {
            cpu_percent: 0.0,
            memory_percent: 0.0,
            disk_percent: 0.0,
            temperature_c: 0.0,
            battery_below: 100,
        };
        let violations = evaluate(&MetricSnapshot::default(), &thresholds, &Checks::default());
        assert!(violations.is_empty());
    }

    #[test]
    fn test_inclusive_boundaries() {
        let thresholds = Thresholds::default();
        let checks = Checks::default();

        for (metric, threshold) in [
            (MetricId::Cpu, thresholds.cpu_percent),
            (MetricId::Memory, thresholds.memory_percent),
            (MetricId::Disk, thresholds.disk_percent),
            (MetricId::Temperature, thresholds.temperature_c),
        ] {
            for (value, fires) in [(threshold - 0.1, false), (threshold, true), (threshold + 0.1, true)] {
                let mut snapshot = MetricSnapshot::default();
                match metric {
                    MetricId::Cpu => snapshot.cpu_percent = Some(value),
                    MetricId::Memory => snapshot.memory_percent = Some(value),
                    MetricId::Disk => snapshot.disk_percent = Some(value),
                    MetricId::Temperature => snapshot.temperature_c = Some(value),
                    MetricId::Battery => unreachable!(),
                }

                let violations = evaluate(&snapshot, &thresholds, &checks);
                let expected = if fires { vec![metric] } else { vec![] };
                assert_eq!(ids(&violations), expected, "{} at {}", metric, value);
            }
        }
    }

    #[test]
    fn test_charging_battery_never_fires() {
        let thresholds = Thresholds { battery_below: 0, ..Thresholds::default() };
        let snapshot = MetricSnapshot {
            battery: Some(BatteryReading { percent: 0, state: BatteryState::Charging }),
            ..Default::default()
        };
        assert!(evaluate(&snapshot, &thresholds, &Checks::default()).is_empty());
    }

    #[test]
    fn test_battery_fires_at_exact_threshold() {
        let thresholds = Thresholds::default();
        for state in [BatteryState::Discharging, BatteryState::Other] {
            let snapshot = MetricSnapshot {
                battery: Some(BatteryReading { percent: thresholds.battery_below, state }),
                ..Default::default()
            };
            let violations = evaluate(&snapshot, &thresholds, &Checks::default());
            assert_eq!(ids(&violations), vec![MetricId::Battery]);
            assert_eq!(violations[0].message, "Battery at 20% (threshold: 20%)");
        }

        let snapshot = MetricSnapshot {
            battery: Some(BatteryReading { percent: 21, state: BatteryState::Discharging }),
            ..Default::default()
        };
        assert!(evaluate(&snapshot, &thresholds, &Checks::default()).is_empty());
    }

    #[test]
    fn test_fixed_order_and_disabled_checks() {
        let thresholds = Thresholds::default();
        let violations = evaluate(&full_snapshot(), &thresholds, &Checks::default());
        assert_eq!(ids(&violations), MetricId::ALL.to_vec());

        let checks = Checks { memory: false, temperature: false, ..Checks::default() };
        let violations = evaluate(&full_snapshot(), &thresholds, &checks);
        assert_eq!(ids(&violations), vec![MetricId::Cpu, MetricId::Disk, MetricId::Battery]);
    }

    #[test]
    fn test_messages_embed_value_and_threshold() {
        let snapshot = MetricSnapshot {
            cpu_percent: Some(95.0),
            temperature_c: Some(92.26),
            ..Default::default()
        };
        let violations = evaluate(&snapshot, &Thresholds::default(), &Checks::default());
        assert_eq!(violations[0].message, "CPU usage at 95.0% (threshold: 90%)");
        assert_eq!(violations[1].message, "CPU temperature at 92.3°C (threshold: 90°C)");
    }

    #[test]
    fn test_out_of_range_values_are_not_clamped() {
        let snapshot = MetricSnapshot { disk_percent: Some(100.4), ..Default::default() };
        let violations = evaluate(&snapshot, &Thresholds::default(), &Checks::default());
        assert_eq!(violations[0].message, "Disk usage at 100.4% (threshold: 80%)");
    }
}
