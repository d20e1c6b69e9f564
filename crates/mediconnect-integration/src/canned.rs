//! 固定回复的诊断模型，用于演示和离线运行

use async_trait::async_trait;
use mediconnect_core::{DiagnosisModel, Result};
use serde_json::json;

/// 返回固定文本的诊断模型
#[derive(Debug, Clone)]
pub struct CannedDiagnosisModel {
    response: String,
}

impl CannedDiagnosisModel {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }

    /// 默认回复：常规发热病例
    pub fn default_payload() -> String {
        json!({
            "symptoms_english": "Fever and body ache for two days",
            "primary_diagnosis": "Acute febrile illness",
            "differential_diagnoses": ["Viral fever", "Dengue fever", "Malaria"],
            "confidence_percent": 65,
            "risk_level": "ROUTINE",
            "risk_reason": "Stable vitals reported, no danger signs",
            "immediate_actions": [
                "Give paracetamol as per weight",
                "Encourage oral fluids",
                "Refer for dengue and malaria test if fever persists beyond 3 days"
            ],
            "icmr_protocol": "ICMR Standard Treatment Workflow: Fever",
            "icd10_code": "R50.9",
            "icd10_description": "Fever, unspecified",
            "auto_tag_conditions": []
        })
        .to_string()
    }
}

impl Default for CannedDiagnosisModel {
    fn default() -> Self {
        Self::new(Self::default_payload())
    }
}

#[async_trait]
impl DiagnosisModel for CannedDiagnosisModel {
    fn name(&self) -> &str {
        "canned"
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        tracing::debug!("Canned model answering prompt of {} bytes", prompt.len());
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_configured_text() {
        let model = CannedDiagnosisModel::new("```json\n{}\n```");
        assert_eq!(model.invoke("anything").await.unwrap(), "```json\n{}\n```");
    }

    #[tokio::test]
    async fn test_default_payload_is_json() {
        let text = CannedDiagnosisModel::default().invoke("prompt").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["risk_level"], "ROUTINE");
        assert_eq!(value["confidence_percent"], 65);
    }
}
