//! Alert delivery capability
//!
//! A transport turns a composed message into a delivered notification.
//! Failures are reported in the [`DeliveryResult`], never raised.

pub mod imessage;

use async_trait::async_trait;

pub use imessage::IMessageDelivery;

/// Outcome of one delivery attempt
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryResult {
    pub success: bool,
    /// Transport diagnostic output on failure
    pub diagnostic: Option<String>,
}

impl DeliveryResult {
    pub fn success() -> Self {
        Self {
            success: true,
            diagnostic: None,
        }
    }

    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Notification transport
#[async_trait]
pub trait AlertDelivery: Send + Sync {
    /// Deliver `text` to `recipient`
    async fn deliver(&self, recipient: &str, text: &str) -> DeliveryResult;

    /// Transport name, for logs
    fn name(&self) -> &str;
}
