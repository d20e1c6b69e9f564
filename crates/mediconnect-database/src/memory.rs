//! 内存存储实现
//!
//! 用于演示、测试和无数据库部署。医生按写入顺序扫描。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediconnect_core::{
    Case, CaseStatus, Doctor, DoctorFilter, Patient, Result, TriageError, TriageStore,
};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// 内存分诊存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    patients: RwLock<HashMap<String, Patient>>,
    cases: RwLock<HashMap<String, Case>>,
    doctors: RwLock<Vec<Doctor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用种子医生数据创建
    pub fn with_doctors(doctors: Vec<Doctor>) -> Self {
        Self {
            doctors: RwLock::new(doctors),
            ..Self::default()
        }
    }

    /// 设置医生可用性（外部维护的状态）
    pub async fn set_doctor_availability(&self, doctor_id: &str, is_available: bool) -> Result<()> {
        let mut doctors = self.doctors.write().await;
        let doctor = doctors
            .iter_mut()
            .find(|d| d.doctor_id == doctor_id)
            .ok_or_else(|| TriageError::NotFound(format!("Doctor {} not found", doctor_id)))?;
        doctor.is_available = is_available;
        Ok(())
    }

    pub async fn case_count(&self) -> usize {
        self.cases.read().await.len()
    }
}

#[async_trait]
impl TriageStore for MemoryStore {
    async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>> {
        Ok(self.patients.read().await.get(patient_id).cloned())
    }

    async fn put_patient(&self, patient: &Patient) -> Result<()> {
        self.patients
            .write()
            .await
            .insert(patient.patient_id.clone(), patient.clone());
        Ok(())
    }

    async fn add_patient_conditions(
        &self,
        patient_id: &str,
        conditions: &BTreeSet<String>,
    ) -> Result<()> {
        let mut patients = self.patients.write().await;
        let patient = patients
            .get_mut(patient_id)
            .ok_or_else(|| TriageError::NotFound(format!("Patient {} not found", patient_id)))?;
        patient.known_conditions.extend(conditions.iter().cloned());
        Ok(())
    }

    async fn query_patients_by_worker(&self, asha_worker_id: &str) -> Result<Vec<Patient>> {
        let patients = self.patients.read().await;
        let mut results: Vec<Patient> = patients
            .values()
            .filter(|p| p.asha_worker_id == asha_worker_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            a.registered_date
                .cmp(&b.registered_date)
                .then_with(|| a.patient_id.cmp(&b.patient_id))
        });
        Ok(results)
    }

    async fn get_case(&self, case_id: &str) -> Result<Option<Case>> {
        Ok(self.cases.read().await.get(case_id).cloned())
    }

    async fn put_case(&self, case: &Case) -> Result<()> {
        self.cases
            .write()
            .await
            .insert(case.case_id.clone(), case.clone());
        Ok(())
    }

    async fn query_cases_by_patient(&self, patient_id: &str) -> Result<Vec<Case>> {
        let cases = self.cases.read().await;
        let mut results: Vec<Case> = cases
            .values()
            .filter(|c| c.patient_id == patient_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    async fn assign_case_if_pending(
        &self,
        case_id: &str,
        doctor_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Case>> {
        // 检查与写入在同一把写锁内完成
        let mut cases = self.cases.write().await;
        match cases.get_mut(case_id) {
            Some(case) if case.status == CaseStatus::Pending => {
                case.doctor_id = Some(doctor_id.to_string());
                case.status = CaseStatus::DoctorAssigned;
                case.updated_at = updated_at;
                Ok(Some(case.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn get_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>> {
        let doctors = self.doctors.read().await;
        Ok(doctors.iter().find(|d| d.doctor_id == doctor_id).cloned())
    }

    async fn put_doctor(&self, doctor: &Doctor) -> Result<()> {
        let mut doctors = self.doctors.write().await;
        match doctors.iter_mut().find(|d| d.doctor_id == doctor.doctor_id) {
            Some(existing) => *existing = doctor.clone(),
            None => doctors.push(doctor.clone()),
        }
        Ok(())
    }

    async fn scan_doctors(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>> {
        let doctors = self.doctors.read().await;
        Ok(doctors.iter().filter(|d| filter.matches(d)).cloned().collect())
    }
}
