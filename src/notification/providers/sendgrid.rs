//! SendGrid 邮件 provider

use crate::notification::channel::{Channel, Notification};
use crate::notification::error::ProviderError;
use crate::notification::provider::ProviderStrategy;
use crate::notification::result::SendResult;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// SendGrid 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendGridConfig {
    /// API key
    pub api_key: String,
}

/// SendGrid 邮件 provider
#[derive(Debug)]
pub struct SendGridProvider {
    config: SendGridConfig,
}

impl SendGridProvider {
    pub fn new(config: SendGridConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("sendgrid api_key is required");
        }
        Ok(Self { config })
    }
}

impl ProviderStrategy for SendGridProvider {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn provider_name(&self) -> &str {
        "sendgrid"
    }

    fn send(&self, notification: &Notification) -> Result<SendResult, ProviderError> {
        super::ensure_channel(Channel::Email, notification)?;

        let message_id = format!("sg-{}", Uuid::new_v4());
        info!(
            provider = "sendgrid",
            key_len = self.config.api_key.len(),
            message_id = %message_id,
            "Email accepted"
        );
        Ok(SendResult::ok(self.provider_name(), message_id))
    }
}
