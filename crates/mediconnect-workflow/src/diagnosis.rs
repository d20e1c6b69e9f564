//! AI诊断流水线
//!
//! 获取患者 → 构造提示词 → 调用诊断模型 → 解析校验输出 → 紧急关键词兜底
//! → 持久化病例 → 自动标记患者病症。
//!
//! 兜底之前的任一步失败都不会写入任何数据。病例落库后，自动标记失败只记录日志。

use mediconnect_core::utils::{self, CASE_ID_PREFIX};
use mediconnect_core::{
    Case, CaseStatus, DiagnosisModel, DiagnosisRequest, Patient, Result, RiskLevel, TriageError,
    TriageStore,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::emergency::apply_emergency_override;

/// 单个病例在流水线中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisStage {
    New,
    AiCalled,
    Validated,
    EmergencyOverridden,
    Persisted,
}

impl fmt::Display for DiagnosisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosisStage::New => "NEW",
            DiagnosisStage::AiCalled => "AI_CALLED",
            DiagnosisStage::Validated => "VALIDATED",
            DiagnosisStage::EmergencyOverridden => "EMERGENCY_OVERRIDDEN",
            DiagnosisStage::Persisted => "PERSISTED",
        };
        f.write_str(name)
    }
}

const SYSTEM_PROMPT: &str = "You are MediConnect AI, an expert rural diagnosis assistant.

Return ONLY valid JSON.
Do NOT use markdown.
Do NOT use code blocks.
Do NOT include explanations, references or disclaimers.
Output must begin with { and end with }.
No text before or after the JSON.";

const RESPONSE_SHAPE: &str = r#"{
  "symptoms_english": "translated symptoms",
  "primary_diagnosis": "string",
  "differential_diagnoses": ["string"],
  "confidence_percent": 0,
  "risk_level": "EMERGENCY | URGENT | ROUTINE",
  "risk_reason": "string",
  "immediate_actions": ["string"],
  "icmr_protocol": "string",
  "icd10_code": "string",
  "icd10_description": "string",
  "auto_tag_conditions": ["string"]
}"#;

fn format_set(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        return "None recorded".to_string();
    }
    values.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// 构造诊断提示词
///
/// 相同输入总是得到相同的提示词。
pub fn build_prompt(patient: &Patient, symptoms_raw: &str, language: &str) -> String {
    format!(
        "{system}\n\n\
         Patient: {name}, {age}yr, {gender}\n\
         Known conditions: {conditions}\n\
         Known allergies: {allergies}\n\
         Current symptoms: \"{symptoms}\"\n\
         Language: {language}\n\n\
         Return STRICT JSON in this exact structure:\n\n\
         {shape}\n",
        system = SYSTEM_PROMPT,
        name = patient.name,
        age = patient.age,
        gender = patient.gender,
        conditions = format_set(&patient.known_conditions),
        allergies = format_set(&patient.known_allergies),
        symptoms = symptoms_raw,
        language = language,
        shape = RESPONSE_SHAPE,
    )
}

/// 从模型输出中提取第一个完整的JSON对象
///
/// 容忍前后的说明文字和markdown代码块。字符串字面量中的花括号不计入嵌套深度。
pub fn extract_json_object(text: &str) -> Result<&str> {
    let start = text.find('{').ok_or_else(|| {
        TriageError::MalformedModelOutput("No JSON object found in model output".to_string())
    })?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(TriageError::MalformedModelOutput(
        "Incomplete JSON object in model output".to_string(),
    ))
}

/// 模型原始输出结构
#[derive(Debug, Deserialize)]
struct RawDiagnosisOutput {
    symptoms_english: String,
    primary_diagnosis: String,
    differential_diagnoses: Vec<String>,
    confidence_percent: f64,
    risk_level: String,
    risk_reason: String,
    immediate_actions: Vec<String>,
    icmr_protocol: String,
    icd10_code: String,
    icd10_description: String,
    #[serde(default)]
    auto_tag_conditions: Vec<String>,
}

/// 校验后的诊断输出
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisOutput {
    pub symptoms_english: String,
    pub primary_diagnosis: String,
    pub differential_diagnoses: Vec<String>,
    pub confidence_percent: u8,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub immediate_actions: Vec<String>,
    pub icmr_protocol: String,
    pub icd10_code: String,
    pub icd10_description: String,
    pub auto_tag_conditions: BTreeSet<String>,
}

impl TryFrom<RawDiagnosisOutput> for DiagnosisOutput {
    type Error = TriageError;

    fn try_from(raw: RawDiagnosisOutput) -> Result<Self> {
        let confidence = raw.confidence_percent;
        if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
            return Err(TriageError::MalformedModelOutput(format!(
                "confidence_percent {} outside 0-100",
                confidence
            )));
        }
        if confidence.fract() != 0.0 {
            return Err(TriageError::MalformedModelOutput(format!(
                "confidence_percent {} is not a whole number",
                confidence
            )));
        }

        let risk_level: RiskLevel = raw.risk_level.parse().map_err(|_| {
            TriageError::MalformedModelOutput(format!("Unknown risk_level '{}'", raw.risk_level))
        })?;

        if raw.primary_diagnosis.trim().is_empty() {
            return Err(TriageError::MalformedModelOutput(
                "primary_diagnosis is empty".to_string(),
            ));
        }

        let auto_tag_conditions = raw
            .auto_tag_conditions
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        Ok(DiagnosisOutput {
            symptoms_english: raw.symptoms_english,
            primary_diagnosis: raw.primary_diagnosis,
            differential_diagnoses: raw.differential_diagnoses,
            confidence_percent: confidence as u8,
            risk_level,
            risk_reason: raw.risk_reason,
            immediate_actions: raw.immediate_actions,
            icmr_protocol: raw.icmr_protocol,
            icd10_code: raw.icd10_code,
            icd10_description: raw.icd10_description,
            auto_tag_conditions,
        })
    }
}

/// 解析并校验模型输出文本
pub fn parse_model_output(text: &str) -> Result<DiagnosisOutput> {
    let json = extract_json_object(text)?;
    let raw: RawDiagnosisOutput = serde_json::from_str(json).map_err(|e| {
        TriageError::MalformedModelOutput(format!("Model output does not match schema: {}", e))
    })?;
    DiagnosisOutput::try_from(raw)
}

/// 诊断流水线
#[derive(Clone)]
pub struct DiagnosisPipeline {
    store: Arc<dyn TriageStore>,
    model: Arc<dyn DiagnosisModel>,
}

impl DiagnosisPipeline {
    pub fn new(store: Arc<dyn TriageStore>, model: Arc<dyn DiagnosisModel>) -> Self {
        Self { store, model }
    }

    /// 执行诊断并持久化新病例
    pub async fn diagnose(&self, request: &DiagnosisRequest) -> Result<Case> {
        if request.symptoms_raw.trim().is_empty() {
            return Err(TriageError::Validation("Symptoms must not be empty".to_string()));
        }

        let patient_id = request.patient_id.as_str();
        trace_stage(patient_id, DiagnosisStage::New);

        let patient = self
            .store
            .get_patient(patient_id)
            .await?
            .ok_or_else(|| TriageError::NotFound(format!("Patient {} not found", patient_id)))?;

        let prompt = build_prompt(&patient, &request.symptoms_raw, &request.language);
        let text = self.model.invoke(&prompt).await.map_err(|e| {
            tracing::error!("Diagnosis model {} failed for patient {}: {}", self.model.name(), patient_id, e);
            e
        })?;
        trace_stage(patient_id, DiagnosisStage::AiCalled);

        let mut output = parse_model_output(&text).map_err(|e| {
            tracing::error!("Rejected output of model {} for patient {}: {}", self.model.name(), patient_id, e);
            e
        })?;
        trace_stage(patient_id, DiagnosisStage::Validated);

        if let Some(matched) = apply_emergency_override(
            &request.symptoms_raw,
            &mut output.risk_level,
            &mut output.risk_reason,
        ) {
            tracing::warn!(
                "Emergency override for patient {}: matched keywords {:?}",
                patient_id,
                matched
            );
            trace_stage(patient_id, DiagnosisStage::EmergencyOverridden);
        }

        let now = utils::now();
        let case = Case {
            case_id: utils::generate_prefixed_id(CASE_ID_PREFIX),
            patient_id: patient.patient_id.clone(),
            asha_worker_id: request.asha_worker_id.clone(),
            doctor_id: None,
            symptoms_raw: request.symptoms_raw.clone(),
            symptoms_english: output.symptoms_english,
            language: request.language.clone(),
            primary_diagnosis: output.primary_diagnosis,
            differential_diagnoses: output.differential_diagnoses,
            confidence_percent: output.confidence_percent,
            risk_level: output.risk_level,
            risk_reason: output.risk_reason,
            immediate_actions: output.immediate_actions,
            icmr_protocol: output.icmr_protocol,
            icd10_code: output.icd10_code,
            icd10_description: output.icd10_description,
            status: CaseStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.store.put_case(&case).await?;
        trace_stage(patient_id, DiagnosisStage::Persisted);

        // 病例已落库，标记失败只记录日志
        let tags = &output.auto_tag_conditions;
        if !tags.is_subset(&patient.known_conditions) {
            match self.store.add_patient_conditions(&patient.patient_id, tags).await {
                Ok(()) => tracing::debug!("Patient {} tagged with {:?}", patient_id, tags),
                Err(e) => tracing::error!(
                    "Case {} saved but tagging patient {} with {:?} failed: {}",
                    case.case_id,
                    patient_id,
                    tags,
                    e
                ),
            }
        }

        tracing::info!(
            "Created case {} for patient {}: {} ({}, {}%)",
            case.case_id,
            patient_id,
            case.primary_diagnosis,
            case.risk_level,
            case.confidence_percent
        );
        Ok(case)
    }
}

fn trace_stage(patient_id: &str, stage: DiagnosisStage) {
    tracing::debug!("Diagnosis for patient {} reached stage {}", patient_id, stage);
}
