//! 通知分发器 - 校验、路由、发送并发布生命周期事件

use super::channel::Notification;
use super::error::{DispatchError, ProviderError};
use super::event::{EventSink, NotificationEvent};
use super::executor::Executor;
use super::registry::ProviderRegistry;
use super::result::{ErrorInfo, SendResult};
use super::validator::Validator;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 生成的 correlation id 前缀
pub const CORRELATION_PREFIX: &str = "corr-";

/// 通知分发器
///
/// 对调用方隐藏具体 provider：校验 → 生成 correlation id → 发布 Requested →
/// 按渠道查找 provider → 发送 → 发布 Sent / Failed。
/// 分发器本身不做重试，需要时在注册前用 `RetryingProvider` 包装 provider。
#[derive(Clone)]
pub struct NotificationDispatcher {
    registry: Arc<ProviderRegistry>,
    validator: Arc<dyn Validator>,
    executor: Arc<dyn Executor>,
    events: Arc<dyn EventSink>,
}

impl NotificationDispatcher {
    pub(crate) fn new(
        registry: ProviderRegistry,
        validator: Arc<dyn Validator>,
        executor: Arc<dyn Executor>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            validator,
            executor,
            events,
        }
    }

    /// 同步发送
    ///
    /// 校验失败时直接返回 `DispatchError::Validation`，不发布任何事件，也不会调用 provider。
    /// 没有注册 provider 时返回 `DispatchError::Configuration`，此时 Requested 已经发布，
    /// 不会有对应的终态事件。
    pub fn send(&self, notification: &Notification) -> Result<SendResult, DispatchError> {
        self.send_cancellable(notification, &CancellationToken::new())
    }

    /// 同步发送，`cancel` 只作用于本次调用（例如中断重试等待）
    ///
    /// 被取消时发布 Failed，返回 `DispatchError::SendFailed`，source 为 `ProviderError::Interrupted`。
    pub fn send_cancellable(
        &self,
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> Result<SendResult, DispatchError> {
        self.validator.validate(notification)?;

        let channel = notification.channel();
        let correlation_id = resolve_correlation_id(notification);
        debug!(%channel, correlation_id = %correlation_id, "Notification validated");

        self.events
            .publish(&NotificationEvent::requested(&correlation_id, notification));

        let provider = self.registry.resolve(channel)?;

        match provider.send_cancellable(notification, cancel) {
            Ok(result) => {
                info!(
                    %channel,
                    provider = provider.provider_name(),
                    correlation_id = %correlation_id,
                    "Notification sent"
                );
                self.events.publish(&NotificationEvent::sent(
                    &correlation_id,
                    channel,
                    result.clone(),
                ));
                Ok(result)
            }
            Err(err) => {
                warn!(
                    %channel,
                    provider = provider.provider_name(),
                    correlation_id = %correlation_id,
                    error = %err,
                    "Notification send failed"
                );
                self.events.publish(&NotificationEvent::failed(
                    &correlation_id,
                    channel,
                    ErrorInfo::from(&err),
                ));

                match err {
                    ProviderError::Invalid(validation) => Err(DispatchError::Validation(validation)),
                    other => Err(DispatchError::SendFailed {
                        provider: provider.provider_name().to_string(),
                        source: other,
                    }),
                }
            }
        }
    }

    /// 异步发送：把 `send` 提交到执行器后立即返回，不阻塞调用方
    ///
    /// 事件顺序和错误分类与同步调用完全一致，返回的句柄可以单独取消这一次发送。
    pub fn send_async(&self, notification: Notification) -> SendHandle {
        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let dispatcher = self.clone();
        let job_cancel = cancel.clone();

        self.executor.execute(Box::new(move || {
            let result = dispatcher.send_cancellable(&notification, &job_cancel);
            // 接收方已放弃等待时忽略
            let _ = tx.send(result);
        }));

        SendHandle { rx, cancel }
    }

    /// 已注册的 provider
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// 使用通知自带的 correlation id；缺失或空白时生成 `corr-<uuid>`
///
/// 生成的 id 只在本次调用内使用，不会写回通知的元数据。
fn resolve_correlation_id(notification: &Notification) -> String {
    match notification.metadata().correlation_id() {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => format!("{}{}", CORRELATION_PREFIX, Uuid::new_v4()),
    }
}

/// 异步发送的结果句柄
///
/// 可以 `.await`，也可以在非异步上下文中用 `blocking_join` 等待。
#[derive(Debug)]
pub struct SendHandle {
    rx: oneshot::Receiver<Result<SendResult, DispatchError>>,
    cancel: CancellationToken,
}

impl SendHandle {
    /// 取消这一次发送；只影响尚未结束的重试等待
    pub fn cancel(&self) {
        self.cancel.cancel();
    }


    /// 阻塞当前线程直到结果就绪
    ///
    /// 不能在异步运行时内部调用（tokio 会 panic），异步代码请直接 `.await`。
    pub fn blocking_join(self) -> Result<SendResult, DispatchError> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(dropped()))
    }
}

impl Future for SendHandle {
    type Output = Result<SendResult, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(dropped())))
    }
}

fn dropped() -> DispatchError {
    DispatchError::Executor("task finished without producing a result".to_string())
}
