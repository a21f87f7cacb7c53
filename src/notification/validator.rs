//! 通知校验 - 按渠道检查收件人与消息

use super::channel::{Channel, Message, Notification, Recipient};
use super::error::ValidationError;
use regex::Regex;

/// 校验器 trait
///
/// 纯函数：无副作用、无 I/O。分发前调用，失败时不会发布任何事件。
pub trait Validator: Send + Sync {
    fn validate(&self, notification: &Notification) -> Result<(), ValidationError>;
}

/// 默认校验器
///
/// - Email: `local@domain.tld` 形式的地址，subject 和 body 非空白
/// - SMS: E.164 号码（`+` 后 8-15 位数字，首位 1-9），text 非空白
/// - Push: device token 非空白，title 和 body 非空白
pub struct DefaultValidator {
    email: Regex,
    e164: Regex,
}

impl DefaultValidator {
    pub fn new() -> Self {
        Self {
            email: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"),
            e164: Regex::new(r"^\+[1-9]\d{7,14}$").expect("e164 pattern is valid"),
        }
    }

    fn validate_email(&self, n: &Notification) -> Result<(), ValidationError> {
        let Recipient::Email { address } = n.recipient() else {
            return Err(ValidationError::new("EMAIL requires an email recipient"));
        };
        if !self.email.is_match(address) {
            return Err(ValidationError::new(format!("Invalid email: {}", address)));
        }
        let Message::Email { subject, body } = n.message() else {
            return Err(ValidationError::new("EMAIL requires an email message"));
        };
        require_non_blank(subject, "Email subject is blank")?;
        require_non_blank(body, "Email body is blank")
    }

    fn validate_sms(&self, n: &Notification) -> Result<(), ValidationError> {
        let Recipient::Phone { number } = n.recipient() else {
            return Err(ValidationError::new("SMS requires a phone recipient"));
        };
        if !self.e164.is_match(number) {
            return Err(ValidationError::new(format!("Invalid phone (E.164): {}", number)));
        }
        let Message::Sms { text } = n.message() else {
            return Err(ValidationError::new("SMS requires an sms message"));
        };
        require_non_blank(text, "SMS text is blank")
    }

    fn validate_push(&self, n: &Notification) -> Result<(), ValidationError> {
        let Recipient::Device { token } = n.recipient() else {
            return Err(ValidationError::new("PUSH requires a device recipient"));
        };
        require_non_blank(token, "Device token is blank")?;
        let Message::Push { title, body } = n.message() else {
            return Err(ValidationError::new("PUSH requires a push message"));
        };
        require_non_blank(title, "Push title is blank")?;
        require_non_blank(body, "Push body is blank")
    }
}

impl Default for DefaultValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for DefaultValidator {
    fn validate(&self, notification: &Notification) -> Result<(), ValidationError> {
        match notification.channel() {
            Channel::Email => self.validate_email(notification),
            Channel::Sms => self.validate_sms(notification),
            Channel::Push => self.validate_push(notification),
        }
    }
}

fn require_non_blank(value: &str, reason: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new(reason))
    } else {
        Ok(())
    }
}
