//! 测试夹具：脚本化诊断模型与示例数据

use async_trait::async_trait;
use mediconnect_core::{
    DiagnosisModel, Doctor, Patient, Result, Sex, Specialization, TriageError, TriageStore,
};
use mediconnect_database::MemoryStore;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ASHA_LAT: f64 = 25.5921;
pub const ASHA_LNG: f64 = 85.1376;

pub enum Reply {
    Text(String),
    Upstream(String),
}

/// 返回固定回复并记录收到的提示词
pub struct ScriptedModel {
    reply: Reply,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn text(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Text(text.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Upstream(message.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DiagnosisModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Upstream(message) => Err(TriageError::UpstreamCallFailed(message.clone())),
        }
    }
}

/// 构造模型返回的JSON文本
pub fn model_json(diagnosis: &str, confidence: u32, risk_level: &str, tags: &[&str]) -> String {
    json!({
        "symptoms_english": "translated symptoms",
        "primary_diagnosis": diagnosis,
        "differential_diagnoses": ["Viral fever", "Typhoid"],
        "confidence_percent": confidence,
        "risk_level": risk_level,
        "risk_reason": "Model assessment",
        "immediate_actions": ["Give ORS", "Monitor temperature"],
        "icmr_protocol": "ICMR Standard Treatment Workflow",
        "icd10_code": "R50.9",
        "icd10_description": "Fever, unspecified",
        "auto_tag_conditions": tags,
    })
    .to_string()
}

pub fn patient(patient_id: &str, age: u32) -> Patient {
    Patient {
        patient_id: patient_id.to_string(),
        asha_worker_id: "ASHA-001".to_string(),
        name: "Sunita Kumari".to_string(),
        age,
        gender: Sex::Female,
        village: "Bikram".to_string(),
        block: Some("Bikram".to_string()),
        district: Some("Patna".to_string()),
        phone: None,
        abha_id: None,
        blood_group: None,
        known_conditions: ["Hypertension".to_string()].into_iter().collect(),
        known_allergies: BTreeSet::new(),
        current_medications: BTreeSet::new(),
        registered_date: mediconnect_core::utils::now(),
        last_visit_date: None,
    }
}

pub fn fixture_doctors() -> Vec<Doctor> {
    vec![
        Doctor {
            doctor_id: "DR-001".to_string(),
            name: "Dr. Priya Patel".to_string(),
            specialization: Specialization::Gynaecologist,
            lat: 25.5941,
            lng: 85.1376,
            is_available: true,
        },
        Doctor {
            doctor_id: "DR-002".to_string(),
            name: "Dr. Ramesh Sharma".to_string(),
            specialization: Specialization::GeneralPhysician,
            lat: 25.6121,
            lng: 85.1534,
            is_available: true,
        },
        Doctor {
            doctor_id: "DR-003".to_string(),
            name: "Dr. Anita Singh".to_string(),
            specialization: Specialization::Paediatrician,
            lat: 25.5712,
            lng: 85.1892,
            is_available: true,
        },
    ]
}

/// 带医生种子数据和一位患者的内存存储
pub async fn seeded_store(patient_id: &str, age: u32) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::with_doctors(fixture_doctors()));
    store.put_patient(&patient(patient_id, age)).await.unwrap();
    store
}
