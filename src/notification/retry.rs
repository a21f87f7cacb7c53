//! 重试装饰器
//!
//! 包装任意 `ProviderStrategy`，对外暴露相同的接口，失败时按配置重试。
//! 校验失败（provider 判定输入无效）不重试，直接返回。

use super::channel::{Channel, Notification};
use super::error::{Cancelled, ProviderError};
use super::executor::shared_runtime;
use super::provider::ProviderStrategy;
use super::result::SendResult;
use anyhow::anyhow;
use std::sync::mpsc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 重试配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// 最大尝试次数（含第一次），小于 1 时按 1 处理
    pub max_attempts: u32,
    /// 两次尝试之间的等待时间，0 表示不等待
    pub backoff: Duration,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(30),
        }
    }
}

/// 带重试的 provider
///
/// 每次 `send` 都是独立的重试循环，不持有跨调用的可变状态，可并发使用。
/// 同一次调用内的多次尝试严格串行。取消信号由调用方按次传入（`send_cancellable`），
/// 一次调用被取消不影响其他调用。
pub struct RetryingProvider<P> {
    inner: P,
    config: RetryConfig,
}

impl<P: ProviderStrategy> RetryingProvider<P> {
    pub fn new(inner: P, max_attempts: u32, backoff: Duration) -> Self {
        Self::with_config(inner, RetryConfig::new(max_attempts, backoff))
    }

    pub fn with_config(inner: P, config: RetryConfig) -> Self {
        Self {
            inner,
            config: RetryConfig::new(config.max_attempts, config.backoff),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<P: ProviderStrategy> ProviderStrategy for RetryingProvider<P> {
    fn channel(&self) -> Channel {
        self.inner.channel()
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn send(&self, notification: &Notification) -> Result<SendResult, ProviderError> {
        self.send_cancellable(notification, &CancellationToken::new())
    }

    fn send_cancellable(
        &self,
        notification: &Notification,
        cancel: &CancellationToken,
    ) -> Result<SendResult, ProviderError> {
        let max_attempts = self.config.max_attempts;
        let mut attempt = 1;

        loop {
            let err = match self.inner.send_cancellable(notification, cancel) {
                Ok(result) => {
                    if attempt > 1 {
                        info!(
                            provider = self.provider_name(),
                            attempt,
                            "Send succeeded after retry"
                        );
                    }
                    return Ok(result);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            warn!(
                provider = self.provider_name(),
                attempt,
                max_attempts,
                error = %err,
                "Send attempt failed"
            );

            if attempt >= max_attempts {
                return Err(ProviderError::RetriesExhausted {
                    attempts: max_attempts,
                    last: Box::new(err),
                });
            }

            if !self.config.backoff.is_zero() {
                debug!(
                    backoff_ms = self.config.backoff.as_millis() as u64,
                    "Waiting before retry"
                );
                wait_backoff(cancel, self.config.backoff)?;
            }

            attempt += 1;
        }
    }
}

/// 等待 `delay`，期间 `cancel` 被触发则返回 `Interrupted`
///
/// 计时在共享运行时上进行，调用线程只阻塞在结果通道上，
/// 因此在运行时内外、阻塞线程池里调用都安全。
fn wait_backoff(cancel: &CancellationToken, delay: Duration) -> Result<(), ProviderError> {
    if cancel.is_cancelled() {
        return Err(ProviderError::Interrupted(Cancelled));
    }

    let runtime = shared_runtime()
        .map_err(|e| ProviderError::Other(anyhow!("dispatch runtime unavailable: {}", e)))?;

    let (tx, rx) = mpsc::sync_channel(1);
    let cancel = cancel.clone();
    drop(runtime.spawn(async move {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        };
        let _ = tx.send(outcome);
    }));

    // 任务在产出结果前被运行时丢弃时按取消处理
    rx.recv()
        .unwrap_or(Err(Cancelled))
        .map_err(ProviderError::Interrupted)
}
