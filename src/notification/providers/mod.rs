//! 具体 provider 实现
//!
//! 只模拟投递并返回 provider 风格的消息 id，不发起网络请求。

pub mod fcm;
pub mod sendgrid;
pub mod twilio;

pub use fcm::{FcmConfig, FcmProvider};
pub use sendgrid::{SendGridConfig, SendGridProvider};
pub use twilio::{TwilioConfig, TwilioProvider};

use crate::notification::channel::{Channel, Notification};
use crate::notification::error::{ProviderError, ValidationError};

/// provider 侧检查：通知渠道必须与 provider 一致
fn ensure_channel(expected: Channel, notification: &Notification) -> Result<(), ProviderError> {
    if notification.channel() == expected {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "{} provider cannot deliver {} notifications",
            expected,
            notification.channel()
        ))
        .into())
    }
}
