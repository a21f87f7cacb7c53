//! Notify Dispatch - 与渠道无关的通知分发（email / sms / push）

pub mod cli;
pub mod config;
pub mod notification;

pub use config::DispatchConfig;
pub use notification::{
    Channel, DispatchError, DispatcherBuilder, InMemoryEventBus, Message, Metadata, Notification,
    NotificationDispatcher, NotificationEvent, ProviderError, ProviderStrategy, Recipient, RetryingProvider,
    SendResult,
};
