//! 发送命令 - 通过配置好的 provider 分发一条通知

use super::output::format_output;
use crate::config::DispatchConfig;
use crate::notification::providers::{FcmConfig, SendGridConfig, TwilioConfig};
use crate::notification::{
    log_listener, Channel, DispatchError, DispatcherBuilder, EventSink, InMemoryEventBus, Message,
    Metadata, Notification, NotificationEvent, Recipient,
};
use tokio_util::sync::CancellationToken;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// 分发参数
#[derive(Args, Debug, Clone, Default)]
pub struct DispatchOptions {
    /// 配置文件路径（默认 ~/.config/notify-dispatch/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 使用占位凭据注册全部 provider（演示用）
    #[arg(long, global = true)]
    pub demo: bool,

    /// Correlation id（不指定时自动生成）
    #[arg(long, global = true)]
    pub correlation_id: Option<String>,

    /// 通过执行器异步发送
    #[arg(long = "async", global = true)]
    pub async_send: bool,

    /// 输出 JSON 格式
    #[arg(long, global = true)]
    pub json: bool,

    /// 覆盖最大尝试次数
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// 覆盖重试间隔（毫秒）
    #[arg(long, global = true)]
    pub backoff_ms: Option<u64>,
}

/// 要发送的通知
#[derive(Subcommand, Debug, Clone)]
pub enum SendCommand {
    /// 发送邮件
    Email {
        /// 收件地址
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },
    /// 发送短信
    Sms {
        /// E.164 手机号，例如 +521234567890
        #[arg(long)]
        to: String,
        #[arg(long)]
        text: String,
    },
    /// 发送推送
    Push {
        /// 设备 token
        #[arg(long)]
        token: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
    },
}

impl SendCommand {
    /// 转换为通知
    pub fn to_notification(&self, correlation_id: Option<&str>) -> Result<Notification> {
        let (channel, recipient, message) = match self {
            SendCommand::Email { to, subject, body } => (
                Channel::Email,
                Recipient::email(to.as_str()),
                Message::email(subject.as_str(), body.as_str()),
            ),
            SendCommand::Sms { to, text } => {
                (Channel::Sms, Recipient::phone(to.as_str()), Message::sms(text.as_str()))
            }
            SendCommand::Push { token, title, body } => (
                Channel::Push,
                Recipient::device(token.as_str()),
                Message::push(title.as_str(), body.as_str()),
            ),
        };

        let metadata = correlation_id.map(Metadata::new).unwrap_or_default();

        Notification::builder(channel)
            .recipient(recipient)
            .message(message)
            .metadata(metadata)
            .build()
            .map_err(|e| anyhow!(e))
    }
}

/// 加载配置并应用命令行覆盖
pub fn resolve_config(options: &DispatchOptions) -> Result<DispatchConfig> {
    let mut config = match &options.config {
        Some(path) => DispatchConfig::load_from(path)?,
        None => DispatchConfig::auto_load()?,
    };

    if options.demo {
        config.sendgrid = Some(SendGridConfig {
            api_key: "SG_API_KEY".to_string(),
        });
        config.twilio = Some(TwilioConfig {
            account_sid: "SID".to_string(),
            auth_token: "TOKEN".to_string(),
        });
        config.fcm = Some(FcmConfig {
            service_account_json: "{service-account-json}".to_string(),
        });
    }
    if let Some(max_attempts) = options.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let Some(backoff_ms) = options.backoff_ms {
        config.retry.backoff_ms = backoff_ms;
    }

    Ok(config)
}

/// 处理发送命令
pub async fn handle_send(options: DispatchOptions, command: SendCommand) -> Result<()> {
    let config = resolve_config(&options)?;
    debug!(retry = ?config.retry, "Resolved dispatch config");

    let bus = Arc::new(InMemoryEventBus::new());
    bus.subscribe(log_listener());
    let json = options.json;
    bus.subscribe(Box::new(move |event: &NotificationEvent| {
        println!("{}", format_output(event, json));
    }));

    let dispatcher = DispatcherBuilder::from_config(&config)?.event_sink(bus).build();
    let notification = command.to_notification(options.correlation_id.as_deref())?;

    let cancel = CancellationToken::new();
    let on_interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling pending retries");
                cancel.cancel();
            }
        })
    };

    let outcome = if options.async_send {
        let mut handle = dispatcher.send_async(notification);
        tokio::select! {
            outcome = &mut handle => outcome,
            _ = cancel.cancelled() => {
                handle.cancel();
                handle.await
            }
        }
    } else {
        tokio::task::block_in_place(|| dispatcher.send_cancellable(&notification, &cancel))
    };
    on_interrupt.abort();

    match outcome {
        Ok(result) => {
            println!("{}", format_output(&result, json));
            Ok(())
        }
        Err(err) => Err(describe(err)),
    }
}

/// 按错误种类给出提示
fn describe(err: DispatchError) -> anyhow::Error {
    let hint = match &err {
        DispatchError::Validation(_) => "fix the notification input",
        DispatchError::Configuration(_) => "configure a provider for this channel (see --config / --demo)",
        DispatchError::SendFailed { .. } => "provider trouble, retry later",
        DispatchError::Executor(_) => "dispatch task did not complete",
    };
    anyhow::Error::new(err).context(hint)
}
