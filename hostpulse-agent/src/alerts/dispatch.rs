//! Alert composition and dispatch
//!
//! Eligible violations become one message: a header naming the host, then
//! one line per violation in evaluation order. The caller advances the
//! cooldown state only on [`DispatchOutcome::Sent`].

use super::evaluator::Violation;
use crate::delivery::AlertDelivery;
use tracing::{info, warn};

/// Prefix of every outbound message
pub const MESSAGE_TAG: &str = "[HostPulse]";

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Delivered; cooldown must be advanced for the dispatched metrics
    Sent,
    /// Nothing eligible to send
    Suppressed,
    /// No recipient configured; the body was surfaced locally only
    NoRecipient { body: String },
    /// Transport failed; cooldown stays untouched so the next run retries
    DeliveryFailed { diagnostic: Option<String> },
}

/// Build the message body for `violations`
pub fn compose_message(host: &str, violations: &[Violation]) -> String {
    let mut body = format!("{} {}", MESSAGE_TAG, host);
    for violation in violations {
        body.push_str("\n- ");
        body.push_str(&violation.message);
    }
    body
}

/// Compose and deliver the eligible violations
pub async fn dispatch(
    eligible: &[Violation],
    recipient: Option<&str>,
    host: &str,
    delivery: &dyn AlertDelivery,
) -> DispatchOutcome {
    if eligible.is_empty() {
        return DispatchOutcome::Suppressed;
    }

    let body = compose_message(host, eligible);

    let Some(recipient) = recipient else {
        warn!("Alerts triggered but no recipient configured");
        return DispatchOutcome::NoRecipient { body };
    };

    let result = delivery.deliver(recipient, &body).await;
    if result.success {
        let metrics: Vec<&str> = eligible.iter().map(|v| v.metric.as_str()).collect();
        info!("Alert sent via {} for: {:?}", delivery.name(), metrics);
        DispatchOutcome::Sent
    } else {
        warn!(
            "Alert delivery via {} failed: {}",
            delivery.name(),
            result.diagnostic.as_deref().unwrap_or("no diagnostic")
        );
        DispatchOutcome::DeliveryFailed {
            diagnostic: result.diagnostic,
        }
    }
}
