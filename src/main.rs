//! Notify Dispatch CLI
//!
//! 通过配置好的 provider 发送 email / sms / push 通知

use anyhow::Result;
use clap::Parser;
use notify_dispatch::cli::{handle_send, DispatchOptions, SendCommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "notify")]
#[command(about = "Notify Dispatch - 与渠道无关的通知发送")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    options: DispatchOptions,

    #[command(subcommand)]
    command: SendCommand,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug notify --demo sms --to +521234567890 --text hola
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notify_dispatch=info,notify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    handle_send(cli.options, cli.command).await
}
