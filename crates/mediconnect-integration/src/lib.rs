//! # MediConnect集成模块
//!
//! 提供与外部诊断模型的集成：
//! - HTTP模型连接器，调用远程生成式模型
//! - 固定回复模型，用于演示和离线运行

pub mod canned;
pub mod connectors;

pub use canned::CannedDiagnosisModel;
pub use connectors::{AuthenticationConfig, HttpModelConfig, HttpModelConnector, MODEL_ID_HEADER};
