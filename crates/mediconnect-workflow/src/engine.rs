//! 分诊引擎
//!
//! 协调诊断流水线、医生匹配、病例分配和患者登记的核心引擎

use mediconnect_core::{
    AssignmentResult, Case, CaseSummary, DiagnosisModel, DiagnosisRequest, MatchedDoctor, Result,
    TriageError, TriageStore,
};
use std::sync::Arc;

use crate::assignment::CaseAssignmentFlow;
use crate::diagnosis::DiagnosisPipeline;
use crate::matching::DoctorMatcher;
use crate::patients::PatientRegistry;

/// 分诊引擎
///
/// 对外提供 `diagnose`、`assign_doctor`、`match_doctor` 以及病例和患者查询
pub struct TriageEngine {
    store: Arc<dyn TriageStore>,
    model: Arc<dyn DiagnosisModel>,
    diagnosis: DiagnosisPipeline,
    assignment: CaseAssignmentFlow,
    matcher: DoctorMatcher,
    patients: PatientRegistry,
}

impl TriageEngine {
    /// 创建新的分诊引擎
    pub fn new(store: Arc<dyn TriageStore>, model: Arc<dyn DiagnosisModel>) -> Self {
        tracing::info!("Creating triage engine with model {}", model.name());
        Self {
            diagnosis: DiagnosisPipeline::new(store.clone(), model.clone()),
            assignment: CaseAssignmentFlow::new(store.clone()),
            matcher: DoctorMatcher::new(store.clone()),
            patients: PatientRegistry::new(store.clone()),
            store,
            model,
        }
    }

    pub fn store(&self) -> &Arc<dyn TriageStore> {
        &self.store
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// 患者登记簿
    pub fn patients(&self) -> &PatientRegistry {
        &self.patients
    }

    /// 诊断症状并创建病例
    pub async fn diagnose(&self, request: &DiagnosisRequest) -> Result<Case> {
        self.diagnosis.diagnose(request).await
    }

    /// 为病例分配医生
    pub async fn assign_doctor(&self, case_id: &str, lat: f64, lng: f64) -> Result<AssignmentResult> {
        self.assignment.assign_doctor(case_id, lat, lng).await
    }

    /// 根据诊断匹配医生（不修改病例）
    pub async fn match_doctor(
        &self,
        primary_diagnosis: &str,
        patient_age: u32,
        lat: f64,
        lng: f64,
    ) -> Result<Option<MatchedDoctor>> {
        self.matcher
            .match_doctor(primary_diagnosis, patient_age, lat, lng)
            .await
    }

    /// 获取病例
    pub async fn get_case(&self, case_id: &str) -> Result<Case> {
        self.store
            .get_case(case_id)
            .await?
            .ok_or_else(|| TriageError::NotFound(format!("Case {} not found", case_id)))
    }

    /// 获取患者的病例摘要，最新的在前
    pub async fn cases_for_patient(&self, patient_id: &str) -> Result<Vec<CaseSummary>> {
        let cases = self.store.query_cases_by_patient(patient_id).await?;
        Ok(cases.iter().map(CaseSummary::from).collect())
    }
}
