//! Provider 注册表 - 渠道到 provider 的映射

use super::channel::Channel;
use super::error::ConfigurationError;
use super::provider::ProviderStrategy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// 每个渠道至多一个 provider，重复注册时后者覆盖前者
///
/// 在构建阶段填充，之后只读，可在线程间共享。
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<Channel, Arc<dyn ProviderStrategy>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 provider（按 `provider.channel()` 覆盖已有映射）
    pub fn register(&mut self, provider: Arc<dyn ProviderStrategy>) {
        let channel = provider.channel();
        info!(
            channel = %channel,
            provider = provider.provider_name(),
            "Registering notification provider"
        );

        if let Some(previous) = self.providers.insert(channel, provider) {
            warn!(
                channel = %channel,
                replaced = previous.provider_name(),
                "Replaced existing provider for channel"
            );
        }
    }

    /// 查找渠道对应的 provider
    pub fn resolve(&self, channel: Channel) -> Result<Arc<dyn ProviderStrategy>, ConfigurationError> {
        self.providers
            .get(&channel)
            .cloned()
            .ok_or(ConfigurationError { channel })
    }

    /// 已注册的 provider 数量
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// 已注册的渠道
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.providers.keys().copied().collect();
        channels.sort_by_key(|c| c.as_str());
        channels
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.providers
                    .iter()
                    .map(|(channel, provider)| (channel, provider.provider_name())),
            )
            .finish()
    }
}
