//! 发送结果

use super::error::ProviderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error as _;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    ProviderError,
    TransientError,
}

/// 结构化的错误信息，用于区分校验失败与 provider 故障
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    /// 原始原因链（由外到内，以 ": " 连接）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl From<&ProviderError> for ErrorInfo {
    fn from(err: &ProviderError) -> Self {
        let code = classify(err);

        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        let info = ErrorInfo::new(code, err.to_string());
        if chain.is_empty() {
            info
        } else {
            info.with_cause(chain.join(": "))
        }
    }
}

fn classify(err: &ProviderError) -> ErrorCode {
    match err {
        ProviderError::Invalid(_) => ErrorCode::ValidationError,
        ProviderError::Transient(_) => ErrorCode::TransientError,
        ProviderError::RetriesExhausted { last, .. } => classify(last),
        ProviderError::Unavailable(_) | ProviderError::Interrupted(_) | ProviderError::Other(_) => {
            ErrorCode::ProviderError
        }
    }
}

/// 发送结果
///
/// `success == true` 时没有 error；`success == false` 时一定有 error 且没有
/// provider_message_id。只能通过 `ok` / `fail` 构造。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSendResult")]
pub struct SendResult {
    success: bool,
    provider_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
    timestamp: DateTime<Utc>,
}

/// 反序列化的中间形态，转换时检查 success / error 约束
#[derive(Deserialize)]
struct RawSendResult {
    success: bool,
    provider_name: String,
    #[serde(default)]
    provider_message_id: Option<String>,
    #[serde(default)]
    error: Option<ErrorInfo>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<RawSendResult> for SendResult {
    type Error = String;

    fn try_from(raw: RawSendResult) -> Result<Self, Self::Error> {
        match (raw.success, &raw.error, &raw.provider_message_id) {
            (true, Some(_), _) => return Err("successful result must not carry an error".to_string()),
            (false, None, _) => return Err("failed result must carry an error".to_string()),
            (false, _, Some(_)) => {
                return Err("failed result must not carry a provider_message_id".to_string())
            }
            _ => {}
        }

        Ok(Self {
            success: raw.success,
            provider_name: raw.provider_name,
            provider_message_id: raw.provider_message_id,
            error: raw.error,
            timestamp: raw.timestamp,
        })
    }
}

impl SendResult {
    /// 发送成功
    pub fn ok(provider: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            provider_name: provider.into(),
            provider_message_id: Some(message_id.into()),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// 发送失败
    pub fn fail(provider: impl Into<String>, error: ErrorInfo) -> Self {
        Self {
            success: false,
            provider_name: provider.into(),
            provider_message_id: None,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn provider_message_id(&self) -> Option<&str> {
        self.provider_message_id.as_deref()
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
