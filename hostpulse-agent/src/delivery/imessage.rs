//! iMessage transport through Messages.app automation (`osascript`)

use super::{AlertDelivery, DeliveryResult};
use crate::execution::CommandExecutor;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};

const OSASCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends alerts as iMessages
#[derive(Debug, Clone)]
pub struct IMessageDelivery {
    timeout: Duration,
}

impl Default for IMessageDelivery {
    fn default() -> Self {
        Self {
            timeout: OSASCRIPT_TIMEOUT,
        }
    }
}

impl IMessageDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// AppleScript sending `text` to `recipient`
    pub fn script(recipient: &str, text: &str) -> String {
        format!(
            "tell application \"Messages\" to send \"{}\" to buddy \"{}\"",
            escape_applescript(text),
            escape_applescript(recipient)
        )
    }
}

/// Escape a value for an AppleScript string literal
pub fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl AlertDelivery for IMessageDelivery {
    async fn deliver(&self, recipient: &str, text: &str) -> DeliveryResult {
        let script = Self::script(recipient, text);
        debug!("Sending iMessage to {}", recipient);

        match CommandExecutor::run("osascript", &["-e", script.as_str()], self.timeout).await {
            Ok(output) if output.success() => DeliveryResult::success(),
            Ok(output) => {
                error!("Failed to send iMessage: {}", output.stderr);
                DeliveryResult::failure(output.stderr)
            }
            Err(e) => {
                error!("Failed to send iMessage: {}", e);
                DeliveryResult::failure(e.to_string())
            }
        }
    }

    fn name(&self) -> &str {
        "imessage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes_and_backslashes() {
        assert_eq!(escape_applescript(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
    }

    #[test]
    fn test_script_embeds_escaped_text() {
        let script = IMessageDelivery::script("+15551234567", "Disk \"/\" full");
        assert_eq!(
            script,
            r#"tell application "Messages" to send "Disk \"/\" full" to buddy "+15551234567""#
        );
    }

    #[test]
    fn test_multiline_text_kept_verbatim() {
        let script = IMessageDelivery::script("me@example.com", "[HostPulse] mac\n- CPU usage at 95.0% (threshold: 90%)");
        assert!(script.contains("[HostPulse] mac\n- CPU usage"));
    }

    #[test]
    fn test_result_helpers() {
        assert!(DeliveryResult::success().success);
        let failed = DeliveryResult::failure("Messages got an error");
        assert!(!failed.success);
        assert_eq!(failed.diagnostic.as_deref(), Some("Messages got an error"));
    }
}
