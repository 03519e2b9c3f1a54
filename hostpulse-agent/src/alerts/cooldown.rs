//! Per-metric alert cooldown
//!
//! - `CooldownState`: last alert time per metric, the only state kept across runs
//! - `filter`: drops violations whose metric alerted within the cooldown window
//! - `advance`: functional update after a successful delivery
//! - `CooldownStore`: JSON file persistence with write-temp-then-rename
//!
//! A missing or unreadable state file means "no history". It never fails a run.
//! Entries that cannot be read (unknown metric, non-numeric stamp) are dropped
//! one by one; the remaining history is kept.

use super::evaluator::Violation;
use crate::metrics::MetricId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Last alert time per metric, as unix seconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CooldownState {
    last_alerted: BTreeMap<MetricId, i64>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_alerted(&self, metric: MetricId) -> Option<DateTime<Utc>> {
        self.last_alerted
            .get(&metric)
            .and_then(|secs| DateTime::from_timestamp(*secs, 0))
    }

    pub fn is_empty(&self) -> bool {
        self.last_alerted.is_empty()
    }

    pub fn metrics(&self) -> impl Iterator<Item = MetricId> + '_ {
        self.last_alerted.keys().copied()
    }

    /// Parse the stored JSON object, skipping entries that do not read as
    /// `<metric id>: <unix seconds>`. Fractional seconds are truncated.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let entries: BTreeMap<String, Value> = serde_json::from_str(content)?;
        let mut state = Self::new();
        for (key, value) in entries {
            let metric = serde_json::from_value::<MetricId>(Value::String(key.clone()));
            match (metric, stamp_secs(&value)) {
                (Ok(metric), Some(secs)) => {
                    state.last_alerted.insert(metric, secs);
                }
                _ => warn!("Ignoring cooldown entry {:?}: {}", key, value),
            }
        }
        Ok(state)
    }
}

fn stamp_secs(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|secs| secs.is_finite())
            .map(|secs| secs.trunc() as i64)
    })
}

/// Keep the violations allowed to alert at `now`.
///
/// A metric passes when it never alerted, or when at least
/// `cooldown_minutes * 60` seconds elapsed since its last alert.
/// `cooldown_minutes == 0` disables suppression. A stamp later than `now`
/// (clock set back) counts as no history.
pub fn filter(
    violations: &[Violation],
    state: &CooldownState,
    cooldown_minutes: u64,
    now: DateTime<Utc>,
) -> Vec<Violation> {
    let window_secs = i64::try_from(cooldown_minutes.saturating_mul(60)).unwrap_or(i64::MAX);
    let now_secs = now.timestamp();

    violations
        .iter()
        .filter(|v| match state.last_alerted.get(&v.metric) {
            None => true,
            Some(last) if *last > now_secs => {
                debug!("{} last alerted in the future ({}), ignoring it", v.metric, last);
                true
            }
            Some(last) => {
                let elapsed = now_secs.saturating_sub(*last);
                let eligible = elapsed >= window_secs;
                if !eligible {
                    debug!(
                        "{} in cooldown: {}s elapsed of {}s",
                        v.metric, elapsed, window_secs
                    );
                }
                eligible
            }
        })
        .cloned()
        .collect()
}

/// Record `at` as the last alert time of each given metric; others are untouched
pub fn advance<I>(state: &CooldownState, metrics: I, at: DateTime<Utc>) -> CooldownState
where
    I: IntoIterator<Item = MetricId>,
{
    let mut next = state.clone();
    for metric in metrics {
        next.last_alerted.insert(metric, at.timestamp());
    }
    next
}

/// Durable cooldown state, one JSON object keyed by metric id
#[derive(Debug, Clone)]
pub struct CooldownStore {
    path: PathBuf,
}

impl CooldownStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state; absent or corrupt files yield an empty state
    pub async fn load(&self) -> CooldownState {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cooldown state at {:?}, starting fresh", self.path);
                return CooldownState::new();
            }
            Err(e) => {
                warn!("Cannot read cooldown state {:?}, ignoring it: {}", self.path, e);
                return CooldownState::new();
            }
        };

        match CooldownState::from_json(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("Corrupt cooldown state {:?}, ignoring it: {}", self.path, e);
                CooldownState::new()
            }
        }
    }

    /// Replace the stored state atomically
    pub async fn save(&self, state: &CooldownState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        info!("Cooldown state saved to {:?}", self.path);
        Ok(())
    }
}
