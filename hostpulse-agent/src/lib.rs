//! HostPulse Agent - periodic health checks for a single host
//!
//! One invocation runs one cycle and exits; an external scheduler
//! (cron, launchd) provides the periodicity:
//! - Samples CPU, memory, disk, temperature, battery and load averages
//! - Compares each reading against configured thresholds
//! - Suppresses repeats with a persistent per-metric cooldown
//! - Delivers one combined alert (iMessage) and records the delivery time

pub mod alerts;
pub mod config;
pub mod delivery;
pub mod execution;
pub mod logging;
pub mod metrics;
pub mod monitor;

pub use alerts::{CooldownState, CooldownStore, DispatchOutcome, Violation};
pub use config::{Checks, ConfigError, ConfigLoad, Settings, Thresholds};
pub use delivery::{AlertDelivery, DeliveryResult};
pub use metrics::{BatteryReading, BatteryState, LoadAverage, MetricId, MetricSampler, MetricSnapshot};
pub use monitor::{Clock, CycleOutcome, CycleReport, Monitor, RunStatus, SystemClock, TestAlertOutcome};
