//! 错误类型
//!
//! 调用方只需按错误种类区分：输入错误（`Validation`）、配置错误（`Configuration`）、
//! 基础设施故障（`SendFailed`），无需匹配字符串。

use super::channel::Channel;
use thiserror::Error;

/// 输入数据无效，不可重试
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed: {reason}")]
pub struct ValidationError {
    reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// 渠道没有注册 provider（调用方的配置问题，不可重试）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no provider registered for channel: {channel}")]
pub struct ConfigurationError {
    pub channel: Channel,
}

/// 重试等待被取消
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Provider 发送失败
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider 判定输入无效（例如 provider 侧 schema 校验），不重试
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Provider 返回错误
    #[error("provider error: {0}")]
    Unavailable(String),

    /// 临时故障（超时、限流等）
    #[error("transient error: {0}")]
    Transient(String),

    /// 重试次数耗尽
    #[error("send failed after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ProviderError>,
    },

    /// 重试等待期间被取消
    #[error("retry interrupted")]
    Interrupted(#[source] Cancelled),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    /// 是否属于输入校验失败
    pub fn is_validation(&self) -> bool {
        matches!(self, ProviderError::Invalid(_))
    }

    /// 是否值得重试（校验失败之外的都视为可能的临时故障）
    pub fn is_retryable(&self) -> bool {
        !self.is_validation()
    }
}

/// 分发失败
#[derive(Error, Debug)]
pub enum DispatchError {
    /// 输入无效（本地校验或 provider 返回），原样透出
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Provider 发送失败，记录使用的 provider 和原始原因
    #[error("send failed via provider={provider}")]
    SendFailed {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// 异步任务在产出结果前被丢弃
    #[error("dispatch task dropped: {0}")]
    Executor(String),
}

impl DispatchError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DispatchError::Validation(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DispatchError::Configuration(_))
    }
}
