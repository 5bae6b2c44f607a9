//! cograph CLI - 把共现流逐帧播放到流式图下游
//!
//! 用法：`cograph <config.json>`

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cg_stream::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cograph=info,cg_stream=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .context("usage: cograph <config.json>")?;
    let config = PipelineConfig::from_json_file(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path))?;
    config.validate()?;

    tracing::info!(
        config = %config_path,
        max_stored = config.max_stored,
        max_visualized = config.max_visualized,
        interval = config.frame_interval(),
        "cograph starting"
    );

    // Ctrl+C 只置位取消令牌，流水线在帧边界停下
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down at the next frame boundary...");
            on_signal.cancel();
        }
    });

    let stats = cg_stream::run(config, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
