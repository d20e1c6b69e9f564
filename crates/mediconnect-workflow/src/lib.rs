//! # MediConnect分诊工作流模块
//!
//! 提供从症状到医生分配的完整分诊流程，包括：
//! - 诊断流水线：调用外部诊断模型、校验输出并应用紧急关键词兜底
//! - 医生匹配：按专长和地理距离选择最近的可用医生
//! - 病例分配：带条件更新保护的医生分配
//! - 病例状态机与患者登记

pub mod assignment;
pub mod diagnosis;
pub mod emergency;
pub mod engine;
pub mod geo;
pub mod matching;
pub mod notification;
pub mod patients;
pub mod specialization;
pub mod state_machine;

#[cfg(test)]
mod test_support;

// 重新导出主要类型
pub use assignment::{round_distance, CaseAssignmentFlow};
pub use diagnosis::{
    build_prompt, extract_json_object, parse_model_output, DiagnosisOutput, DiagnosisPipeline,
    DiagnosisStage,
};
pub use emergency::{
    apply_emergency_override, detect_emergency_keywords, EMERGENCY_KEYWORDS,
    EMERGENCY_OVERRIDE_REASON,
};
pub use engine::TriageEngine;
pub use geo::distance_km;
pub use matching::{rank_by_distance, select_nearest, DoctorMatcher};
pub use notification::format_case_message;
pub use patients::PatientRegistry;
pub use specialization::{required_specialization, SPECIALIZATION_MAP};
pub use state_machine::{CaseEvent, CaseStateMachine};
