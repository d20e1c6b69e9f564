//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use chrono::{DateTime, Utc};
use mediconnect_core::{Case, Doctor, DoctorFilter, Patient, Result, TriageError};
use std::collections::BTreeSet;

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建患者表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                patient_id VARCHAR(32) PRIMARY KEY,
                asha_worker_id VARCHAR(32) NOT NULL,
                name VARCHAR(255) NOT NULL,
                age INTEGER NOT NULL CHECK (age >= 0 AND age <= 120),
                gender VARCHAR(8) NOT NULL,
                village VARCHAR(255) NOT NULL,
                block VARCHAR(255),
                district VARCHAR(255),
                phone VARCHAR(32),
                abha_id VARCHAR(64),
                blood_group VARCHAR(8),
                known_conditions TEXT[] NOT NULL DEFAULT '{}',
                known_allergies TEXT[] NOT NULL DEFAULT '{}',
                current_medications TEXT[] NOT NULL DEFAULT '{}',
                registered_date TIMESTAMP WITH TIME ZONE NOT NULL,
                last_visit_date TIMESTAMP WITH TIME ZONE
            )
        "#).execute(pool).await?;

        // 创建病例表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS cases (
                case_id VARCHAR(32) PRIMARY KEY,
                patient_id VARCHAR(32) NOT NULL REFERENCES patients(patient_id),
                asha_worker_id VARCHAR(32) NOT NULL,
                doctor_id VARCHAR(32),
                symptoms_raw TEXT NOT NULL,
                symptoms_english TEXT NOT NULL,
                language VARCHAR(16) NOT NULL,
                primary_diagnosis TEXT NOT NULL,
                differential_diagnoses TEXT[] NOT NULL DEFAULT '{}',
                confidence_percent SMALLINT NOT NULL CHECK (confidence_percent BETWEEN 0 AND 100),
                risk_level VARCHAR(16) NOT NULL,
                risk_reason TEXT NOT NULL,
                immediate_actions TEXT[] NOT NULL DEFAULT '{}',
                icmr_protocol TEXT NOT NULL,
                icd10_code VARCHAR(16) NOT NULL,
                icd10_description TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL,
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL
            )
        "#).execute(pool).await?;

        // 创建医生表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS doctors (
                doctor_id VARCHAR(32) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                specialization VARCHAR(64) NOT NULL,
                lat DOUBLE PRECISION NOT NULL,
                lng DOUBLE PRECISION NOT NULL,
                is_available BOOLEAN NOT NULL DEFAULT TRUE,
                seq BIGSERIAL
            )
        "#).execute(pool).await?;

        // 创建索引以优化查询性能
        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_patients_asha_worker_id ON patients(asha_worker_id)",
            "CREATE INDEX IF NOT EXISTS idx_patients_village ON patients(village)",
            "CREATE INDEX IF NOT EXISTS idx_cases_patient_id ON cases(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_cases_status ON cases(status)",
            "CREATE INDEX IF NOT EXISTS idx_doctors_available ON doctors(is_available)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    // ========== 患者相关操作 ==========

    /// 写入患者（存在则覆盖）
    pub async fn upsert_patient(&self, patient: &Patient) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO patients (
                patient_id, asha_worker_id, name, age, gender, village, block, district,
                phone, abha_id, blood_group, known_conditions, known_allergies,
                current_medications, registered_date, last_visit_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (patient_id) DO UPDATE SET
                asha_worker_id = EXCLUDED.asha_worker_id,
                name = EXCLUDED.name,
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                village = EXCLUDED.village,
                block = EXCLUDED.block,
                district = EXCLUDED.district,
                phone = EXCLUDED.phone,
                abha_id = EXCLUDED.abha_id,
                blood_group = EXCLUDED.blood_group,
                known_conditions = EXCLUDED.known_conditions,
                known_allergies = EXCLUDED.known_allergies,
                current_medications = EXCLUDED.current_medications,
                registered_date = EXCLUDED.registered_date,
                last_visit_date = EXCLUDED.last_visit_date
        "#)
        .bind(&patient.patient_id)
        .bind(&patient.asha_worker_id)
        .bind(&patient.name)
        .bind(patient.age as i32)
        .bind(patient.gender.as_str())
        .bind(&patient.village)
        .bind(&patient.block)
        .bind(&patient.district)
        .bind(&patient.phone)
        .bind(&patient.abha_id)
        .bind(&patient.blood_group)
        .bind(to_array(&patient.known_conditions))
        .bind(to_array(&patient.known_allergies))
        .bind(to_array(&patient.current_medications))
        .bind(patient.registered_date)
        .bind(patient.last_visit_date)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// 根据患者ID查找患者
    pub async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE patient_id = $1"
        )
        .bind(patient_id)
        .fetch_optional(pool)
        .await?;

        result.map(Patient::try_from).transpose()
    }

    /// 并入患者已知病症，去重排序在单条语句内完成
    pub async fn add_patient_conditions(
        &self,
        patient_id: &str,
        conditions: &BTreeSet<String>,
    ) -> Result<()> {
        let pool = self.pool.pool();

        let result = sqlx::query(r#"
            UPDATE patients
            SET known_conditions = ARRAY(
                SELECT DISTINCT unnest(known_conditions || $1::TEXT[]) ORDER BY 1
            )
            WHERE patient_id = $2
        "#)
        .bind(to_array(conditions))
        .bind(patient_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TriageError::NotFound(format!("Patient {} not found", patient_id)));
        }
        Ok(())
    }

    /// 根据ASHA工作者ID获取患者
    pub async fn get_patients_by_worker(&self, asha_worker_id: &str) -> Result<Vec<Patient>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE asha_worker_id = $1 ORDER BY registered_date, patient_id"
        )
        .bind(asha_worker_id)
        .fetch_all(pool)
        .await?;

        results.into_iter().map(Patient::try_from).collect()
    }

    // ========== 病例相关操作 ==========

    /// 创建新病例
    pub async fn insert_case(&self, case: &Case) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO cases (
                case_id, patient_id, asha_worker_id, doctor_id, symptoms_raw, symptoms_english,
                language, primary_diagnosis, differential_diagnoses, confidence_percent,
                risk_level, risk_reason, immediate_actions, icmr_protocol, icd10_code,
                icd10_description, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        "#)
        .bind(&case.case_id)
        .bind(&case.patient_id)
        .bind(&case.asha_worker_id)
        .bind(&case.doctor_id)
        .bind(&case.symptoms_raw)
        .bind(&case.symptoms_english)
        .bind(&case.language)
        .bind(&case.primary_diagnosis)
        .bind(&case.differential_diagnoses)
        .bind(case.confidence_percent as i16)
        .bind(case.risk_level.as_str())
        .bind(&case.risk_reason)
        .bind(&case.immediate_actions)
        .bind(&case.icmr_protocol)
        .bind(&case.icd10_code)
        .bind(&case.icd10_description)
        .bind(case.status.as_str())
        .bind(case.created_at)
        .bind(case.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// 根据病例ID查找病例
    pub async fn get_case(&self, case_id: &str) -> Result<Option<Case>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbCase>("SELECT * FROM cases WHERE case_id = $1")
            .bind(case_id)
            .fetch_optional(pool)
            .await?;

        result.map(Case::try_from).transpose()
    }

    /// 根据患者ID获取所有病例
    pub async fn get_cases_by_patient(&self, patient_id: &str) -> Result<Vec<Case>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbCase>(
            "SELECT * FROM cases WHERE patient_id = $1 ORDER BY created_at DESC"
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await?;

        results.into_iter().map(Case::try_from).collect()
    }

    /// 条件分配医生：状态仍为PENDING时才更新
    pub async fn assign_case_if_pending(
        &self,
        case_id: &str,
        doctor_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Case>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbCase>(r#"
            UPDATE cases
            SET doctor_id = $2, status = 'DOCTOR_ASSIGNED', updated_at = $3
            WHERE case_id = $1 AND status = 'PENDING'
            RETURNING *
        "#)
        .bind(case_id)
        .bind(doctor_id)
        .bind(updated_at)
        .fetch_optional(pool)
        .await?;

        result.map(Case::try_from).transpose()
    }

    // ========== 医生相关操作 ==========

    /// 写入医生（存在则覆盖，保留原扫描顺序）
    pub async fn upsert_doctor(&self, doctor: &Doctor) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO doctors (doctor_id, name, specialization, lat, lng, is_available)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (doctor_id) DO UPDATE SET
                name = EXCLUDED.name,
                specialization = EXCLUDED.specialization,
                lat = EXCLUDED.lat,
                lng = EXCLUDED.lng,
                is_available = EXCLUDED.is_available
        "#)
        .bind(&doctor.doctor_id)
        .bind(&doctor.name)
        .bind(doctor.specialization.as_str())
        .bind(doctor.lat)
        .bind(doctor.lng)
        .bind(doctor.is_available)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// 根据医生ID查找医生
    pub async fn get_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbDoctor>(
            "SELECT doctor_id, name, specialization, lat, lng, is_available FROM doctors WHERE doctor_id = $1"
        )
        .bind(doctor_id)
        .fetch_optional(pool)
        .await?;

        result.map(Doctor::try_from).transpose()
    }

    /// 扫描医生，按写入顺序返回
    pub async fn scan_doctors(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbDoctor>(r#"
            SELECT doctor_id, name, specialization, lat, lng, is_available
            FROM doctors
            WHERE ($1 = FALSE OR is_available = TRUE)
              AND ($2::VARCHAR IS NULL OR specialization = $2)
            ORDER BY seq
        "#)
        .bind(filter.available_only)
        .bind(filter.specialization.as_ref().map(|s| s.as_str().to_string()))
        .fetch_all(pool)
        .await?;

        results.into_iter().map(Doctor::try_from).collect()
    }

    /// 写入种子医生数据
    pub async fn seed_doctors(&self, doctors: &[Doctor]) -> Result<()> {
        for doctor in doctors {
            self.upsert_doctor(doctor).await?;
        }

        tracing::info!("Seeded {} doctors", doctors.len());
        Ok(())
    }
}
