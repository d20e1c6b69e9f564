//! # MediConnect管理模块
//!
//! 提供配置加载、验证以及日志初始化

pub mod config;
pub mod logging;

pub use config::{
    ConfigManager, ConfigValidator, DatabaseBackend, DatabaseConfig, FixturesConfig,
    LoggingConfig, MediConnectConfig, ModelConfig, ModelProvider, ServerConfig,
};
pub use logging::{build_filter, init_logging};
