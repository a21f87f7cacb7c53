//! 通知生命周期事件与事件总线
//!
//! - Requested: 校验通过、调用 provider 之前
//! - Sent: 发送成功
//! - Failed: 发送失败
//!
//! 同一次分发内事件按 Requested → (Sent | Failed) 顺序发布；不同分发之间不保证顺序。

use super::channel::{Channel, Notification};
use super::result::{ErrorInfo, SendResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

/// 生命周期事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    Requested {
        correlation_id: String,
        channel: Channel,
        at: DateTime<Utc>,
        notification: Notification,
    },
    Sent {
        correlation_id: String,
        channel: Channel,
        at: DateTime<Utc>,
        result: SendResult,
    },
    Failed {
        correlation_id: String,
        channel: Channel,
        at: DateTime<Utc>,
        error: ErrorInfo,
    },
}

impl NotificationEvent {
    pub fn requested(correlation_id: impl Into<String>, notification: &Notification) -> Self {
        NotificationEvent::Requested {
            correlation_id: correlation_id.into(),
            channel: notification.channel(),
            at: Utc::now(),
            notification: notification.clone(),
        }
    }

    pub fn sent(correlation_id: impl Into<String>, channel: Channel, result: SendResult) -> Self {
        NotificationEvent::Sent {
            correlation_id: correlation_id.into(),
            channel,
            at: Utc::now(),
            result,
        }
    }

    pub fn failed(correlation_id: impl Into<String>, channel: Channel, error: ErrorInfo) -> Self {
        NotificationEvent::Failed {
            correlation_id: correlation_id.into(),
            channel,
            at: Utc::now(),
            error,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            NotificationEvent::Requested { correlation_id, .. }
            | NotificationEvent::Sent { correlation_id, .. }
            | NotificationEvent::Failed { correlation_id, .. } => correlation_id,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            NotificationEvent::Requested { channel, .. }
            | NotificationEvent::Sent { channel, .. }
            | NotificationEvent::Failed { channel, .. } => *channel,
        }
    }

    /// 事件名称
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::Requested { .. } => "requested",
            NotificationEvent::Sent { .. } => "sent",
            NotificationEvent::Failed { .. } => "failed",
        }
    }
}

/// 事件监听器
pub type EventListener = Box<dyn Fn(&NotificationEvent) + Send + Sync>;

/// 事件发布接口
///
/// `publish` 不能向调用方抛出错误，也不能无限期阻塞；实现必须支持多线程并发发布。
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &NotificationEvent);

    fn subscribe(&self, listener: EventListener);
}

/// 空实现：没有订阅者，发布为 no-op
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: &NotificationEvent) {}

    fn subscribe(&self, _listener: EventListener) {
        warn!("Listener subscribed to a no-op event sink; it will never be called");
    }
}

/// 进程内事件总线
///
/// 每个订阅者都会收到每个事件。订阅者 panic 会被捕获并记录，不影响其他订阅者和分发流程。
#[derive(Default)]
pub struct InMemoryEventBus {
    listeners: RwLock<Vec<Arc<dyn Fn(&NotificationEvent) + Send + Sync>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅者数量
    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or_else(|e| e.into_inner().len())
    }
}

impl EventSink for InMemoryEventBus {
    fn publish(&self, event: &NotificationEvent) {
        // 先拷贝快照再调用，避免订阅者在回调里 subscribe 造成死锁
        let listeners: Vec<_> = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        for (index, listener) in listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(
                    listener = index,
                    event = event.kind(),
                    correlation_id = event.correlation_id(),
                    "Event listener panicked"
                );
            }
        }
    }

    fn subscribe(&self, listener: EventListener) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push(Arc::from(listener));
    }
}

impl std::fmt::Debug for InMemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// 把事件写入 tracing 日志的监听器
pub fn log_listener() -> EventListener {
    Box::new(|event: &NotificationEvent| match event {
        NotificationEvent::Requested { correlation_id, channel, .. } => {
            info!(%channel, correlation_id = %correlation_id, "Notification requested");
        }
        NotificationEvent::Sent { correlation_id, channel, result, .. } => {
            info!(
                %channel,
                correlation_id = %correlation_id,
                provider = result.provider_name(),
                message_id = ?result.provider_message_id(),
                "Notification sent"
            );
        }
        NotificationEvent::Failed { correlation_id, channel, error, .. } => {
            warn!(
                %channel,
                correlation_id = %correlation_id,
                code = ?error.code,
                error = %error.message,
                "Notification failed"
            );
        }
    })
}
