//! 病例通知消息模板
//!
//! 仅做字段替换，生成发往医生的消息预览。

use mediconnect_core::{Case, MatchedDoctor, Patient};
use std::fmt::Write;

/// 生成病例报告消息（WhatsApp 风格标记）
pub fn format_case_message(case: &Case, patient: &Patient, matched: &MatchedDoctor) -> String {
    let mut message = String::new();

    let _ = writeln!(message, "*MediConnect AI - Case Report*");
    let _ = writeln!(message, "Case ID: {}", case.case_id);
    let _ = writeln!(message);
    let _ = writeln!(
        message,
        "*Patient:* {}, {}yr ({})",
        patient.name, patient.age, patient.gender
    );
    let _ = writeln!(message, "*Symptoms:* {}", case.symptoms_raw);
    let _ = writeln!(message);
    let _ = writeln!(message, "*AI Diagnosis:* {}", case.primary_diagnosis);
    let _ = writeln!(message, "*Confidence:* {}%", case.confidence_percent);
    let _ = writeln!(
        message,
        "*ICD-10:* {} - {}",
        case.icd10_code, case.icd10_description
    );
    let _ = writeln!(message);
    let _ = writeln!(message, "*Risk Level:* {}", case.risk_level);
    let _ = writeln!(message, "_{}_", case.risk_reason);
    let _ = writeln!(message);
    let _ = writeln!(message, "*Immediate Actions:*");
    for (i, action) in case.immediate_actions.iter().enumerate() {
        let _ = writeln!(message, "  {}. {}", i + 1, action);
    }
    let _ = writeln!(message);
    let _ = writeln!(message, "*Protocol:* {}", case.icmr_protocol);
    let _ = writeln!(message);
    let _ = writeln!(message, "*Assigned Doctor:* {}", matched.doctor.name);
    let _ = writeln!(message, "Specialization: {}", matched.doctor.specialization);
    let _ = writeln!(message, "Distance: {:.2} km", matched.distance_km);
    let _ = writeln!(message);
    let _ = write!(message, "_Powered by MediConnect AI_");

    message
}
