//! FCM 推送 provider

use crate::notification::channel::{Channel, Notification, Recipient};
use crate::notification::error::{ProviderError, ValidationError};
use crate::notification::provider::ProviderStrategy;
use crate::notification::result::SendResult;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// FCM 接受的 registration token 最大字节数
pub const MAX_TOKEN_BYTES: usize = 4096;

/// FCM 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcmConfig {
    /// service account JSON 内容
    pub service_account_json: String,
}

/// FCM 推送 provider
#[derive(Debug)]
pub struct FcmProvider {
    config: FcmConfig,
}

impl FcmProvider {
    pub fn new(config: FcmConfig) -> Result<Self> {
        if config.service_account_json.trim().is_empty() {
            bail!("fcm service_account_json is required");
        }
        Ok(Self { config })
    }
}

impl ProviderStrategy for FcmProvider {
    fn channel(&self) -> Channel {
        Channel::Push
    }

    fn provider_name(&self) -> &str {
        "fcm"
    }

    fn send(&self, notification: &Notification) -> Result<SendResult, ProviderError> {
        super::ensure_channel(Channel::Push, notification)?;

        if let Recipient::Device { token } = notification.recipient() {
            if token.len() > MAX_TOKEN_BYTES {
                return Err(ValidationError::new("Device token rejected by FCM: too long").into());
            }
        }

        let message_id = format!("fcm-{}", Uuid::new_v4());
        info!(
            provider = "fcm",
            credentials_len = self.config.service_account_json.len(),
            message_id = %message_id,
            "Push accepted"
        );
        Ok(SendResult::ok(self.provider_name(), message_id))
    }
}
