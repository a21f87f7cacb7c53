//! Provider strategy trait 定义

use super::channel::{Channel, Notification};
use super::error::ProviderError;
use super::result::SendResult;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 某个渠道的具体投递实现
///
/// 同一个实例会被多个分发调用并发使用，实现必须可重入。
pub trait ProviderStrategy: Send + Sync {
    /// 负责的渠道
    fn channel(&self) -> Channel;

    /// Provider 名称（用于日志和错误信息）
    fn provider_name(&self) -> &str;

    /// 同步发送
    fn send(&self, notification: &Notification) -> Result<SendResult, ProviderError>;

    /// 带调用方取消信号的发送
    ///
    /// 信号只属于这一次调用。默认实现忽略信号，需要等待的实现（例如重试）应在等待时响应取消。
    fn send_cancellable(
        &self,
        notification: &Notification,
        _cancel: &CancellationToken,
    ) -> Result<SendResult, ProviderError> {
        self.send(notification)
    }
}

impl<P: ProviderStrategy + ?Sized> ProviderStrategy for Arc<P> {
    fn channel(&self) -> Channel {
        (**self).channel()
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn send(&self, notification: &Notification) -> Result<SendResult, ProviderError> {
        (**self).send(notification)
    }

    fn send_cancellable(
        &self,
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> Result<SendResult, ProviderError> {
        (**self).send_cancellable(notification, cancel)
    }
}

impl<P: ProviderStrategy + ?Sized> ProviderStrategy for Box<P> {
    fn channel(&self) -> Channel {
        (**self).channel()
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn send(&self, notification: &Notification) -> Result<SendResult, ProviderError> {
        (**self).send(notification)
    }

    fn send_cancellable(
        &self,
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> Result<SendResult, ProviderError> {
        (**self).send_cancellable(notification, cancel)
    }
}
