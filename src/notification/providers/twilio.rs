//! Twilio 短信 provider

use crate::notification::channel::{Channel, Message, Notification};
use crate::notification::error::{ProviderError, ValidationError};
use crate::notification::provider::ProviderStrategy;
use crate::notification::result::SendResult;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Twilio 单条消息的最大字符数
pub const MAX_SMS_CHARS: usize = 1600;

/// Twilio 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
}

/// Twilio 短信 provider
#[derive(Debug)]
pub struct TwilioProvider {
    config: TwilioConfig,
}

impl TwilioProvider {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        if config.account_sid.trim().is_empty() {
            bail!("twilio account_sid is required");
        }
        if config.auth_token.trim().is_empty() {
            bail!("twilio auth_token is required");
        }
        Ok(Self { config })
    }
}

impl ProviderStrategy for TwilioProvider {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn provider_name(&self) -> &str {
        "twilio"
    }

    fn send(&self, notification: &Notification) -> Result<SendResult, ProviderError> {
        super::ensure_channel(Channel::Sms, notification)?;

        if let Message::Sms { text } = notification.message() {
            let chars = text.chars().count();
            if chars > MAX_SMS_CHARS {
                return Err(ValidationError::new(format!(
                    "SMS text has {} characters, limit is {}",
                    chars, MAX_SMS_CHARS
                ))
                .into());
            }
        }

        let message_id = format!("tw-{}", Uuid::new_v4());
        info!(
            provider = "twilio",
            account_sid = %self.config.account_sid,
            message_id = %message_id,
            "SMS accepted"
        );
        Ok(SendResult::ok(self.provider_name(), message_id))
    }
}
