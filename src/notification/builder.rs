//! 分发器构建器 - 注册 provider、设置校验器、执行器和事件总线

use super::dispatcher::NotificationDispatcher;
use super::event::{EventSink, NoopEventSink};
use super::executor::{DefaultExecutor, Executor};
use super::provider::ProviderStrategy;
use super::providers::{FcmProvider, SendGridProvider, TwilioProvider};
use super::registry::ProviderRegistry;
use super::retry::RetryingProvider;
use super::validator::{DefaultValidator, Validator};
use crate::config::DispatchConfig;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// 分发器构建器
///
/// 未设置时：校验器为 `DefaultValidator`，执行器为 `DefaultExecutor`，
/// 事件总线为 `NoopEventSink`（发布即丢弃）。
pub struct DispatcherBuilder {
    registry: ProviderRegistry,
    validator: Option<Arc<dyn Validator>>,
    executor: Option<Arc<dyn Executor>>,
    events: Option<Arc<dyn EventSink>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            validator: None,
            executor: None,
            events: None,
        }
    }

    /// 注册 provider，同一渠道后注册的覆盖先注册的
    pub fn register<P>(mut self, provider: P) -> Self
    where
        P: ProviderStrategy + 'static,
    {
        self.registry.register(Arc::new(provider));
        self
    }

    /// 设置校验器
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// 设置执行器
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// 设置事件总线
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// 按配置注册 provider，每个都包装一层重试
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        let mut builder = Self::new();
        let retry = config.retry.to_retry_config();

        if let Some(sendgrid) = &config.sendgrid {
            info!(channel = "email", provider = "sendgrid", "Configuring provider from config");
            let provider = SendGridProvider::new(sendgrid.clone())?;
            builder = builder.register(RetryingProvider::with_config(provider, retry.clone()));
        }

        if let Some(twilio) = &config.twilio {
            info!(channel = "sms", provider = "twilio", "Configuring provider from config");
            let provider = TwilioProvider::new(twilio.clone())?;
            builder = builder.register(RetryingProvider::with_config(provider, retry.clone()));
        }

        if let Some(fcm) = &config.fcm {
            info!(channel = "push", provider = "fcm", "Configuring provider from config");
            let provider = FcmProvider::new(fcm.clone())?;
            builder = builder.register(RetryingProvider::with_config(provider, retry));
        }

        Ok(builder)
    }

    /// 构建 NotificationDispatcher
    pub fn build(self) -> NotificationDispatcher {
        let validator = self
            .validator
            .unwrap_or_else(|| Arc::new(DefaultValidator::new()));
        let executor = self.executor.unwrap_or_else(|| Arc::new(DefaultExecutor));
        let events = self.events.unwrap_or_else(|| Arc::new(NoopEventSink));

        NotificationDispatcher::new(self.registry, validator, executor, events)
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
