//! One monitor cycle and the auxiliary CLI modes
//!
//! `Monitor::run_cycle` wires the pieces together:
//! sample -> evaluate -> (all clear: stop) -> load cooldown -> filter
//! -> (nothing eligible: stop) -> dispatch -> on success advance + save.
//!
//! Sampling failures, state-store failures and delivery failures are all
//! absorbed here: a monitor run always completes.

use crate::alerts::{self, CooldownStore, DispatchOutcome, Violation, MESSAGE_TAG};
use crate::config::Settings;
use crate::delivery::{AlertDelivery, IMessageDelivery};
use crate::metrics::{self, MetricSampler, MetricSnapshot, SystemSampler};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What a monitor cycle ended with
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Every metric within thresholds
    AllClear,
    Dispatched(DispatchOutcome),
}

/// Everything a cycle observed and decided
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: MetricSnapshot,
    pub violations: Vec<Violation>,
    pub outcome: CycleOutcome,
}

/// Result of `--test`
#[derive(Debug, Clone, PartialEq)]
pub enum TestAlertOutcome {
    Sent,
    NoRecipient,
    Failed { diagnostic: Option<String> },
}

/// How the process ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failure,
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::Failure => ExitCode::FAILURE,
        }
    }
}

impl CycleReport {
    /// A completed monitor cycle always succeeds, whatever it dispatched
    pub fn status(&self) -> RunStatus {
        RunStatus::Success
    }
}

impl TestAlertOutcome {
    pub fn status(&self) -> RunStatus {
        match self {
            TestAlertOutcome::Sent => RunStatus::Success,
            TestAlertOutcome::NoRecipient | TestAlertOutcome::Failed { .. } => RunStatus::Failure,
        }
    }
}

/// Status after writing a fresh default config: `--test` cannot succeed
/// without a recipient, a monitor run just stops early
pub fn bootstrap_status(test_mode: bool) -> RunStatus {
    if test_mode {
        RunStatus::Failure
    } else {
        RunStatus::Success
    }
}

/// Health-check agent for the local host
pub struct Monitor {
    settings: Settings,
    store: CooldownStore,
    sampler: Box<dyn MetricSampler>,
    delivery: Box<dyn AlertDelivery>,
    clock: Box<dyn Clock>,
    host: String,
}

impl Monitor {
    /// Monitor using the system sampler, iMessage delivery and wall clock
    pub fn new(settings: Settings, store: CooldownStore) -> Self {
        Self {
            settings,
            store,
            sampler: Box::new(SystemSampler::new()),
            delivery: Box::new(IMessageDelivery::new()),
            clock: Box::new(SystemClock),
            host: short_hostname(),
        }
    }

    pub fn with_sampler(mut self, sampler: impl MetricSampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn with_delivery(mut self, delivery: impl AlertDelivery + 'static) -> Self {
        self.delivery = Box::new(delivery);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Run one sample/evaluate/alert cycle
    pub async fn run_cycle(&self) -> CycleReport {
        let settings = &self.settings;

        let snapshot = metrics::collect_snapshot(
            self.sampler.as_ref(),
            &settings.checks,
            &settings.sampling.disk_path,
        )
        .await;

        println!("{}", metrics::render_summary(&snapshot, &settings.checks));
        match serde_json::to_string(&snapshot) {
            Ok(json) => info!("Metrics: {}", json),
            Err(e) => warn!("Failed to serialize metrics: {}", e),
        }

        let violations = alerts::evaluate(&snapshot, &settings.thresholds, &settings.checks);
        if violations.is_empty() {
            info!("All metrics within thresholds.");
            return CycleReport {
                snapshot,
                violations,
                outcome: CycleOutcome::AllClear,
            };
        }

        let state = self.store.load().await;
        let eligible = alerts::filter(
            &violations,
            &state,
            settings.cooldown_minutes,
            self.clock.now(),
        );

        if eligible.is_empty() {
            let suppressed: Vec<&str> = violations.iter().map(|v| v.metric.as_str()).collect();
            info!("Alerts suppressed by cooldown: {:?}", suppressed);
            return CycleReport {
                snapshot,
                violations,
                outcome: CycleOutcome::Dispatched(DispatchOutcome::Suppressed),
            };
        }

        let outcome = alerts::dispatch(
            &eligible,
            settings.recipient(),
            &self.host,
            self.delivery.as_ref(),
        )
        .await;

        match &outcome {
            DispatchOutcome::Sent => {
                // Stamp at delivery time, not sampling time
                let next = alerts::advance(&state, eligible.iter().map(|v| v.metric), self.clock.now());
                if let Err(e) = self.store.save(&next).await {
                    error!(
                        "Failed to persist cooldown state {:?}: {}",
                        self.store.path(),
                        e
                    );
                }
            }
            DispatchOutcome::NoRecipient { body } => {
                println!("\nALERTS (no recipient configured):\n{}", body);
            }
            DispatchOutcome::DeliveryFailed { .. } => {
                println!("Failed to send alert. Check logs for details.");
            }
            DispatchOutcome::Suppressed => {}
        }

        CycleReport {
            snapshot,
            violations,
            outcome: CycleOutcome::Dispatched(outcome),
        }
    }

    /// Send a fixed test message to the configured recipient
    pub async fn send_test_alert(&self) -> TestAlertOutcome {
        let Some(recipient) = self.settings.recipient() else {
            return TestAlertOutcome::NoRecipient;
        };

        let message = test_message(&self.host);
        let result = self.delivery.deliver(recipient, &message).await;
        if result.success {
            info!("Test alert sent to {}", recipient);
            TestAlertOutcome::Sent
        } else {
            TestAlertOutcome::Failed {
                diagnostic: result.diagnostic,
            }
        }
    }
}

pub fn test_message(host: &str) -> String {
    format!(
        "{} Test alert from {}: if you see this, alerts are working!",
        MESSAGE_TAG, host
    )
}

/// Scheduling instructions printed by `--install`
pub fn install_instructions(executable: &Path, config: Option<&Path>) -> String {
    let mut command = shell_quote(&executable.to_string_lossy());
    if let Some(config) = config {
        command.push_str(" --config ");
        command.push_str(&shell_quote(&config.to_string_lossy()));
    }

    format!(
        "Add this to your crontab (crontab -e):\n\n  */5 * * * * {} >> /dev/null 2>&1\n\nOr create a launchd plist for more reliable scheduling.",
        command
    )
}

/// Config path the scheduled job must pass explicitly: any resolved path
/// other than the platform default (e.g. one taken from `HOSTPULSE_CONFIG`,
/// which cron does not inherit)
pub fn scheduled_config_arg<'a>(resolved: &'a Path, platform_default: Option<&Path>) -> Option<&'a Path> {
    if platform_default == Some(resolved) {
        None
    } else {
        Some(resolved)
    }
}

fn shell_quote(value: &str) -> String {
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+:=@".contains(c));
    if safe && !value.is_empty() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Short host name of this machine
pub fn short_hostname() -> String {
    short_host(&gethostname::gethostname().to_string_lossy())
}

fn short_host(raw: &str) -> String {
    match raw.trim().split('.').next() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => "unknown-host".to_string(),
    }
}
