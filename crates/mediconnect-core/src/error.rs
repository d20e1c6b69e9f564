//! 错误定义模块

use thiserror::Error;

use crate::models::CaseStatus;

/// 分诊系统统一错误类型
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效状态: 病例 {case_id} 当前状态为 {status}")]
    InvalidState { case_id: String, status: CaseStatus },

    #[error("上游调用失败: {0}")]
    UpstreamCallFailed(String),

    #[error("模型输出格式错误: {0}")]
    MalformedModelOutput(String),

    #[error("没有可用医生: {0}")]
    NoDoctorAvailable(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("认证失败: {0}")]
    Unauthorized(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("网络错误: {0}")]
    Network(#[from] std::io::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// 错误类别，供调用方区分失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    UpstreamCallFailed,
    MalformedModelOutput,
    NoDoctorAvailable,
    Validation,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::UpstreamCallFailed => "upstream_call_failed",
            Self::MalformedModelOutput => "malformed_model_output",
            Self::NoDoctorAvailable => "no_doctor_available",
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal",
        }
    }
}

impl TriageError {
    /// 获取错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            TriageError::NotFound(_) => ErrorKind::NotFound,
            TriageError::InvalidState { .. } | TriageError::InvalidStateTransition { .. } => {
                ErrorKind::InvalidState
            }
            TriageError::UpstreamCallFailed(_) | TriageError::Network(_) => {
                ErrorKind::UpstreamCallFailed
            }
            TriageError::MalformedModelOutput(_) => ErrorKind::MalformedModelOutput,
            TriageError::NoDoctorAvailable(_) => ErrorKind::NoDoctorAvailable,
            TriageError::Validation(_) => ErrorKind::Validation,
            TriageError::Unauthorized(_) => ErrorKind::Unauthorized,
            TriageError::Config(_) | TriageError::Serialization(_) | TriageError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for TriageError {
    fn from(err: sqlx::Error) -> Self {
        TriageError::UpstreamCallFailed(format!("database: {}", err))
    }
}

/// 分诊系统统一结果类型
pub type Result<T> = std::result::Result<T, TriageError>;
