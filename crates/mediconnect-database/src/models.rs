//! 数据库模型

use chrono::{DateTime, Utc};
use mediconnect_core::{Case, Doctor, Patient, TriageError};
use sqlx::FromRow;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub patient_id: String,
    pub asha_worker_id: String,
    pub name: String,
    pub age: i32,
    pub gender: String, // 存储为字符串，转换为Sex枚举
    pub village: String,
    pub block: Option<String>,
    pub district: Option<String>,
    pub phone: Option<String>,
    pub abha_id: Option<String>,
    pub blood_group: Option<String>,
    pub known_conditions: Vec<String>,
    pub known_allergies: Vec<String>,
    pub current_medications: Vec<String>,
    pub registered_date: DateTime<Utc>,
    pub last_visit_date: Option<DateTime<Utc>>,
}

impl TryFrom<DbPatient> for Patient {
    type Error = TriageError;

    fn try_from(db_patient: DbPatient) -> Result<Self, Self::Error> {
        Ok(Patient {
            age: u32::try_from(db_patient.age).map_err(|_| {
                TriageError::Internal(format!(
                    "Patient {} has negative age {}",
                    db_patient.patient_id, db_patient.age
                ))
            })?,
            gender: db_patient.gender.parse()?,
            patient_id: db_patient.patient_id,
            asha_worker_id: db_patient.asha_worker_id,
            name: db_patient.name,
            village: db_patient.village,
            block: db_patient.block,
            district: db_patient.district,
            phone: db_patient.phone,
            abha_id: db_patient.abha_id,
            blood_group: db_patient.blood_group,
            known_conditions: db_patient.known_conditions.into_iter().collect(),
            known_allergies: db_patient.known_allergies.into_iter().collect(),
            current_medications: db_patient.current_medications.into_iter().collect(),
            registered_date: db_patient.registered_date,
            last_visit_date: db_patient.last_visit_date,
        })
    }
}

/// 数据库病例表
#[derive(Debug, FromRow)]
pub struct DbCase {
    pub case_id: String,
    pub patient_id: String,
    pub asha_worker_id: String,
    pub doctor_id: Option<String>,
    pub symptoms_raw: String,
    pub symptoms_english: String,
    pub language: String,
    pub primary_diagnosis: String,
    pub differential_diagnoses: Vec<String>,
    pub confidence_percent: i16,
    pub risk_level: String, // 存储为字符串，转换为RiskLevel枚举
    pub risk_reason: String,
    pub immediate_actions: Vec<String>,
    pub icmr_protocol: String,
    pub icd10_code: String,
    pub icd10_description: String,
    pub status: String, // 存储为字符串，转换为CaseStatus枚举
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbCase> for Case {
    type Error = TriageError;

    fn try_from(db_case: DbCase) -> Result<Self, Self::Error> {
        let confidence_percent = u8::try_from(db_case.confidence_percent)
            .ok()
            .filter(|value| *value <= 100)
            .ok_or_else(|| {
                TriageError::Internal(format!(
                    "Case {} has confidence {} outside 0-100",
                    db_case.case_id, db_case.confidence_percent
                ))
            })?;

        Ok(Case {
            risk_level: db_case.risk_level.parse()?,
            status: db_case.status.parse()?,
            confidence_percent,
            case_id: db_case.case_id,
            patient_id: db_case.patient_id,
            asha_worker_id: db_case.asha_worker_id,
            doctor_id: db_case.doctor_id,
            symptoms_raw: db_case.symptoms_raw,
            symptoms_english: db_case.symptoms_english,
            language: db_case.language,
            primary_diagnosis: db_case.primary_diagnosis,
            differential_diagnoses: db_case.differential_diagnoses,
            risk_reason: db_case.risk_reason,
            immediate_actions: db_case.immediate_actions,
            icmr_protocol: db_case.icmr_protocol,
            icd10_code: db_case.icd10_code,
            icd10_description: db_case.icd10_description,
            created_at: db_case.created_at,
            updated_at: db_case.updated_at,
        })
    }
}

/// 数据库医生表
#[derive(Debug, FromRow)]
pub struct DbDoctor {
    pub doctor_id: String,
    pub name: String,
    pub specialization: String,
    pub lat: f64,
    pub lng: f64,
    pub is_available: bool,
}

impl TryFrom<DbDoctor> for Doctor {
    type Error = TriageError;

    fn try_from(db_doctor: DbDoctor) -> Result<Self, Self::Error> {
        Ok(Doctor {
            specialization: db_doctor.specialization.parse()?,
            doctor_id: db_doctor.doctor_id,
            name: db_doctor.name,
            lat: db_doctor.lat,
            lng: db_doctor.lng,
            is_available: db_doctor.is_available,
        })
    }
}

/// 集合字段按排序后的数组写入
pub(crate) fn to_array<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    values.into_iter().cloned().collect()
}
