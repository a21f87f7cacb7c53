//! Output formatting for CLI commands

use crate::notification::{NotificationEvent, SendResult};
use serde::Serialize;

/// Format output as JSON or a single human-readable line based on --json flag
pub fn format_output<T: Serialize + HumanReadable>(data: &T, json: bool) -> String {
    if json {
        serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string())
    } else {
        data.human()
    }
}

/// 单行文本输出
pub trait HumanReadable {
    fn human(&self) -> String;
}

impl HumanReadable for SendResult {
    fn human(&self) -> String {
        match (self.success(), self.error()) {
            (true, _) => format!(
                "RESULT => ok provider={} message_id={}",
                self.provider_name(),
                self.provider_message_id().unwrap_or("-")
            ),
            (false, Some(error)) => format!(
                "RESULT => failed provider={} code={:?} error={}",
                self.provider_name(),
                error.code,
                error.message
            ),
            (false, None) => format!("RESULT => failed provider={}", self.provider_name()),
        }
    }
}

impl HumanReadable for NotificationEvent {
    fn human(&self) -> String {
        let detail = match self {
            NotificationEvent::Requested { .. } => String::new(),
            NotificationEvent::Sent { result, .. } => format!(
                " provider={} message_id={}",
                result.provider_name(),
                result.provider_message_id().unwrap_or("-")
            ),
            NotificationEvent::Failed { error, .. } => format!(" error={}", error.message),
        };
        format!(
            "EVENT => {} channel={} correlation_id={}{}",
            self.kind(),
            self.channel(),
            self.correlation_id(),
            detail
        )
    }
}
