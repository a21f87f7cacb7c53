//! 通知数据模型 - 渠道、收件人、消息与元数据

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 投递渠道（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Push,
}

impl Channel {
    /// 渠道名称（用于日志和错误信息）
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 收件人，变体必须与通知的渠道一致（由 Validator 检查）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recipient {
    /// 邮箱地址
    Email { address: String },
    /// E.164 格式手机号，例如 +521234567890
    Phone { number: String },
    /// 设备 token（FCM/APNS）
    Device { token: String },
}

impl Recipient {
    pub fn email(address: impl Into<String>) -> Self {
        Recipient::Email { address: address.into() }
    }

    pub fn phone(number: impl Into<String>) -> Self {
        Recipient::Phone { number: number.into() }
    }

    pub fn device(token: impl Into<String>) -> Self {
        Recipient::Device { token: token.into() }
    }

    /// 该变体对应的渠道
    pub fn channel(&self) -> Channel {
        match self {
            Recipient::Email { .. } => Channel::Email,
            Recipient::Phone { .. } => Channel::Sms,
            Recipient::Device { .. } => Channel::Push,
        }
    }
}

/// 消息内容，变体必须与通知的渠道一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Email { subject: String, body: String },
    Sms { text: String },
    Push { title: String, body: String },
}

impl Message {
    pub fn email(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Message::Email {
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn sms(text: impl Into<String>) -> Self {
        Message::Sms { text: text.into() }
    }

    pub fn push(title: impl Into<String>, body: impl Into<String>) -> Self {
        Message::Push {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Message::Email { .. } => Channel::Email,
            Message::Sms { .. } => Channel::Sms,
            Message::Push { .. } => Channel::Push,
        }
    }
}

/// 追踪元数据
///
/// `created_at` 在构造时确定，之后不再改变。分发时生成的 correlation id
/// 只存在于单次调用的上下文中，不会写回这里。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    correlation_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl Metadata {
    /// 带 correlation id 的元数据
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            created_at: Utc::now(),
        }
    }

    /// 空元数据：无 correlation id
    pub fn empty() -> Self {
        Self {
            correlation_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::empty()
    }
}

/// 统一的通知模型
///
/// 使用按渠道区分的类型，而不是通用 map，避免运行时才发现字段错误。
/// 构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    channel: Channel,
    recipient: Recipient,
    message: Message,
    #[serde(default)]
    metadata: Metadata,
}

impl Notification {
    pub fn new(channel: Channel, recipient: Recipient, message: Message, metadata: Metadata) -> Self {
        Self {
            channel,
            recipient,
            message,
            metadata,
        }
    }

    pub fn builder(channel: Channel) -> NotificationBuilder {
        NotificationBuilder::new(channel)
    }

    /// 便捷构造：邮件通知
    pub fn email(address: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(
            Channel::Email,
            Recipient::email(address),
            Message::email(subject, body),
            Metadata::empty(),
        )
    }

    /// 便捷构造：短信通知
    pub fn sms(number: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Channel::Sms, Recipient::phone(number), Message::sms(text), Metadata::empty())
    }

    /// 便捷构造：推送通知
    pub fn push(token: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(
            Channel::Push,
            Recipient::device(token),
            Message::push(title, body),
            Metadata::empty(),
        )
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// 通知构建器
#[derive(Debug)]
pub struct NotificationBuilder {
    channel: Channel,
    recipient: Option<Recipient>,
    message: Option<Message>,
    metadata: Option<Metadata>,
}

impl NotificationBuilder {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            recipient: None,
            message: None,
            metadata: None,
        }
    }

    /// 设置收件人
    pub fn recipient(mut self, recipient: Recipient) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// 设置消息
    pub fn message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    /// 设置元数据
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// 设置 correlation id（created_at 取当前时间）
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.metadata = Some(Metadata::new(correlation_id));
        self
    }

    /// 构建通知
    pub fn build(self) -> Result<Notification, &'static str> {
        let recipient = self.recipient.ok_or("recipient is required")?;
        let message = self.message.ok_or("message is required")?;

        Ok(Notification {
            channel: self.channel,
            recipient,
            message,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}
