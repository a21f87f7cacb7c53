//! 分发配置 - 从配置文件或环境变量加载 provider 凭据和重试参数

use crate::notification::providers::{FcmConfig, SendGridConfig, TwilioConfig};
use crate::notification::retry::RetryConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "NOTIFY_DISPATCH_CONFIG";

/// 重试参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 30,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

/// 分发配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub retry: RetrySettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sendgrid: Option<SendGridConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twilio: Option<TwilioConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm: Option<FcmConfig>,
}

impl DispatchConfig {
    /// 默认配置文件路径 ~/.config/notify-dispatch/config.json
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("notify-dispatch")
            .join("config.json")
    }

    /// 读取单个配置文件
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: DispatchConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// 按优先级加载配置
    ///
    /// 1. `NOTIFY_DISPATCH_CONFIG` 指定的文件
    /// 2. ~/.config/notify-dispatch/config.json
    /// 3. 环境变量
    pub fn auto_load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                debug!(path = %path, "Loading config from {}", CONFIG_PATH_ENV);
                return Self::load_from(Path::new(&path));
            }
        }

        let default_path = Self::default_path();
        if default_path.exists() {
            debug!(path = %default_path.display(), "Loading config from default path");
            return Self::load_from(&default_path);
        }

        debug!("No config file found, reading environment variables");
        Self::from_env_vars(|key| std::env::var(key).ok())
    }

    /// 从环境变量构建配置（`lookup` 便于测试时注入）
    pub fn from_env_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut retry = RetrySettings::default();
        if let Some(v) = get("NOTIFY_MAX_ATTEMPTS") {
            retry.max_attempts = v
                .trim()
                .parse()
                .with_context(|| format!("NOTIFY_MAX_ATTEMPTS is not a number: {}", v))?;
        }
        if let Some(v) = get("NOTIFY_BACKOFF_MS") {
            retry.backoff_ms = v
                .trim()
                .parse()
                .with_context(|| format!("NOTIFY_BACKOFF_MS is not a number: {}", v))?;
        }

        let sendgrid = get("SENDGRID_API_KEY").map(|api_key| SendGridConfig { api_key });

        let twilio = match (get("TWILIO_ACCOUNT_SID"), get("TWILIO_AUTH_TOKEN")) {
            (Some(account_sid), Some(auth_token)) => Some(TwilioConfig {
                account_sid,
                auth_token,
            }),
            _ => None,
        };

        let fcm = get("FCM_SERVICE_ACCOUNT").map(|service_account_json| FcmConfig {
            service_account_json,
        });

        Ok(Self {
            retry,
            sendgrid,
            twilio,
            fcm,
        })
    }
}
