//! 通知分发层 - 与渠道无关的统一发送入口
//!
//! # 设计目标
//! 1. 统一接口：调用方提交带类型的通知（email / sms / push），不关心具体 provider
//! 2. 渠道路由：`ProviderRegistry` 按渠道选择 `ProviderStrategy`
//! 3. 可组合重试：`RetryingProvider` 包装任意 provider，对分发器透明
//! 4. 生命周期事件：Requested / Sent / Failed 通过 `EventSink` 发布
//! 5. 同步与异步：`send_async` 只是把同一条流水线提交给执行器
//!
//! # 使用示例
//! ```ignore
//! use notify_dispatch::notification::{DispatcherBuilder, InMemoryEventBus, Notification, RetryingProvider};
//!
//! let bus = Arc::new(InMemoryEventBus::new());
//! let dispatcher = DispatcherBuilder::new()
//!     .register(RetryingProvider::new(sendgrid, 3, Duration::from_millis(30)))
//!     .event_sink(bus)
//!     .build();
//!
//! let result = dispatcher.send(&Notification::email("user@mail.com", "Hi", "Welcome"))?;
//! ```

pub mod builder;
pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod executor;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod result;
pub mod retry;
pub mod validator;

pub use builder::DispatcherBuilder;
pub use channel::{Channel, Message, Metadata, Notification, NotificationBuilder, Recipient};
pub use dispatcher::{NotificationDispatcher, SendHandle, CORRELATION_PREFIX};
pub use error::{Cancelled, ConfigurationError, DispatchError, ProviderError, ValidationError};
pub use event::{log_listener, EventListener, EventSink, InMemoryEventBus, NoopEventSink, NotificationEvent};
pub use executor::{DefaultExecutor, Executor, Job, ThreadExecutor, TokioExecutor};
pub use provider::ProviderStrategy;
pub use registry::ProviderRegistry;
pub use result::{ErrorCode, ErrorInfo, SendResult};
pub use retry::{RetryConfig, RetryingProvider};
pub use validator::{DefaultValidator, Validator};
pub use tokio_util::sync::CancellationToken;
