//! 分诊流程演示程序
//!
//! 展示患者登记、AI诊断、紧急关键词兜底和最近医生分配

use mediconnect::core::{Doctor, PatientRegistration, Sex, Specialization, DiagnosisRequest};
use mediconnect::database::MemoryStore;
use mediconnect::integration::CannedDiagnosisModel;
use mediconnect::workflow::TriageEngine;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 演示用ASHA工作者坐标（Bikram）
const ASHA_LAT: f64 = 25.5921;
const ASHA_LNG: f64 = 85.1376;

const MODEL_REPLY: &str = r#"Here is the assessment:
```json
{
  "symptoms_english": "Severe headache and swelling of feet in the eighth month of pregnancy",
  "primary_diagnosis": "Pregnancy induced hypertension",
  "differential_diagnoses": ["Pre-eclampsia", "Migraine"],
  "confidence_percent": 78,
  "risk_level": "URGENT",
  "risk_reason": "Headache with oedema in late pregnancy",
  "immediate_actions": ["Check blood pressure", "Refer to PHC within 24 hours"],
  "icmr_protocol": "ICMR STW: Hypertensive disorders of pregnancy",
  "icd10_code": "O13",
  "icd10_description": "Gestational hypertension",
  "auto_tag_conditions": ["Pregnancy", "Hypertension"]
}
```"#;

fn demo_doctors() -> Vec<Doctor> {
    [
        ("DR-001", "Dr. Priya Patel", Specialization::Gynaecologist, 25.5941, 85.1376),
        ("DR-002", "Dr. Ramesh Sharma", Specialization::GeneralPhysician, 25.6121, 85.1534),
        ("DR-003", "Dr. Anita Singh", Specialization::Paediatrician, 25.5712, 85.1892),
    ]
    .into_iter()
    .map(|(id, name, specialization, lat, lng)| Doctor {
        doctor_id: id.to_string(),
        name: name.to_string(),
        specialization,
        lat,
        lng,
        is_available: true,
    })
    .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    println!("🚑 MediConnect 分诊流程演示\n");

    let store = Arc::new(MemoryStore::with_doctors(demo_doctors()));
    let model = Arc::new(CannedDiagnosisModel::new(MODEL_REPLY));
    let engine = TriageEngine::new(store, model);

    // 1. 登记患者
    let patient = engine
        .patients()
        .register(PatientRegistration {
            asha_worker_id: "ASHA-001".to_string(),
            name: "Sunita Kumari".to_string(),
            age: 24,
            gender: Sex::Female,
            village: "Rampur".to_string(),
            block: None,
            district: None,
            phone: Some("+919800000001".to_string()),
            abha_id: None,
            blood_group: None,
            known_conditions: BTreeSet::new(),
            known_allergies: BTreeSet::new(),
            current_medications: BTreeSet::new(),
        })
        .await?;
    println!("✅ 患者已登记: {} ({})", patient.name, patient.patient_id);

    // 2. AI诊断，症状中含高危关键词
    let case = engine
        .diagnose(&DiagnosisRequest {
            patient_id: patient.patient_id.clone(),
            asha_worker_id: "ASHA-001".to_string(),
            symptoms_raw: "Sar mein tez dard, pairon mein sujan, dauraa pada".to_string(),
            language: "hi-IN".to_string(),
        })
        .await?;
    println!("\n📋 病例 {}", case.case_id);
    println!("   诊断: {} ({}%)", case.primary_diagnosis, case.confidence_percent);
    println!("   风险: {} | {}", case.risk_level, case.risk_reason);

    // 3. 已知病症自动标记
    let updated = engine.patients().get_patient(&patient.patient_id).await?;
    let conditions: Vec<&str> = updated.known_conditions.iter().map(String::as_str).collect();
    println!("   已知病症: {}", conditions.join(", "));

    // 4. 分配最近医生
    let assignment = engine.assign_doctor(&case.case_id, ASHA_LAT, ASHA_LNG).await?;
    println!(
        "\n👩‍⚕️ 已分配 {} ({}), 距离 {:.2} km",
        assignment.doctor_name, assignment.specialization, assignment.distance_km
    );
    println!("\n📱 通知预览:\n{}", assignment.notification_preview);

    // 5. 重复分配会被拒绝
    match engine.assign_doctor(&case.case_id, ASHA_LAT, ASHA_LNG).await {
        Ok(_) => println!("⚠️ 重复分配未被拒绝"),
        Err(e) => println!("\n🔒 重复分配被拒绝: {}", e),
    }

    Ok(())
}
