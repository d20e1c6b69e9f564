//! 外部诊断模型能力接口

use async_trait::async_trait;

use crate::error::Result;

/// 外部生成式诊断模型
///
/// 输入提示词，返回自由文本；调用失败应返回 `TriageError::UpstreamCallFailed`。
#[async_trait]
pub trait DiagnosisModel: Send + Sync {
    /// 模型名称（用于日志）
    fn name(&self) -> &str;

    /// 调用模型
    async fn invoke(&self, prompt: &str) -> Result<String>;
}
