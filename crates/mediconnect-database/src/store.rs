//! PostgreSQL存储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediconnect_core::{Case, Doctor, DoctorFilter, Patient, Result, TriageStore};
use std::collections::BTreeSet;

use crate::connection::DatabasePool;
use crate::queries::DatabaseQueries;

/// 基于PostgreSQL的分诊存储
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DatabasePool,
}

impl PgStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn queries(&self) -> DatabaseQueries<'_> {
        DatabaseQueries::new(&self.pool)
    }
}

#[async_trait]
impl TriageStore for PgStore {
    async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>> {
        self.queries().get_patient(patient_id).await
    }

    async fn put_patient(&self, patient: &Patient) -> Result<()> {
        self.queries().upsert_patient(patient).await
    }

    async fn add_patient_conditions(
        &self,
        patient_id: &str,
        conditions: &BTreeSet<String>,
    ) -> Result<()> {
        self.queries()
            .add_patient_conditions(patient_id, conditions)
            .await
    }

    async fn query_patients_by_worker(&self, asha_worker_id: &str) -> Result<Vec<Patient>> {
        self.queries().get_patients_by_worker(asha_worker_id).await
    }

    async fn get_case(&self, case_id: &str) -> Result<Option<Case>> {
        self.queries().get_case(case_id).await
    }

    async fn put_case(&self, case: &Case) -> Result<()> {
        self.queries().insert_case(case).await
    }

    async fn query_cases_by_patient(&self, patient_id: &str) -> Result<Vec<Case>> {
        self.queries().get_cases_by_patient(patient_id).await
    }

    async fn assign_case_if_pending(
        &self,
        case_id: &str,
        doctor_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Case>> {
        self.queries()
            .assign_case_if_pending(case_id, doctor_id, updated_at)
            .await
    }

    async fn get_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>> {
        self.queries().get_doctor(doctor_id).await
    }

    async fn put_doctor(&self, doctor: &Doctor) -> Result<()> {
        self.queries().upsert_doctor(doctor).await
    }

    async fn scan_doctors(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>> {
        self.queries().scan_doctors(filter).await
    }
}
