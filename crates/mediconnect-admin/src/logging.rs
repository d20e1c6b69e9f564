//! 日志初始化
//!
//! 基于 `tracing-subscriber` 的 `EnvFilter`，过滤指令来自 [`LoggingConfig`]。

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 解析过滤指令
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("Invalid log filter: {}", level))
}

/// 初始化全局日志订阅者，`level_override` 优先于配置中的级别
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(&config.level);
    let filter = build_filter(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;

    tracing::debug!("Logging initialised with filter {}", level);
    Ok(())
}
