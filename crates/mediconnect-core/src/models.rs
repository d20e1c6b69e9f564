//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::TriageError;

/// 性别
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "Other")]
    Other,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Other => "Other",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Sex::Male),
            "F" => Ok(Sex::Female),
            "Other" | "O" => Ok(Sex::Other),
            _ => Err(TriageError::Validation(format!("Unknown sex: {}", s))),
        }
    }
}

/// 患者信息
///
/// 已知病症、过敏和用药均为无序集合，使用 `BTreeSet` 保证序列化顺序稳定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub asha_worker_id: String,
    pub name: String,
    pub age: u32,
    pub gender: Sex,
    pub village: String,
    pub block: Option<String>,
    pub district: Option<String>,
    pub phone: Option<String>,
    pub abha_id: Option<String>,
    pub blood_group: Option<String>,
    pub known_conditions: BTreeSet<String>,
    pub known_allergies: BTreeSet<String>,
    pub current_medications: BTreeSet<String>,
    pub registered_date: DateTime<Utc>,
    pub last_visit_date: Option<DateTime<Utc>>,
}

/// 患者登记请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRegistration {
    pub asha_worker_id: String,
    pub name: String,
    pub age: u32,
    pub gender: Sex,
    pub village: String,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub abha_id: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub known_conditions: BTreeSet<String>,
    #[serde(default)]
    pub known_allergies: BTreeSet<String>,
    #[serde(default)]
    pub current_medications: BTreeSet<String>,
}

/// 患者部分更新
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub known_conditions: Option<BTreeSet<String>>,
    pub known_allergies: Option<BTreeSet<String>>,
    pub current_medications: Option<BTreeSet<String>>,
    pub phone: Option<String>,
    pub blood_group: Option<String>,
}

impl PatientUpdate {
    pub fn is_empty(&self) -> bool {
        self.known_conditions.is_none()
            && self.known_allergies.is_none()
            && self.current_medications.is_none()
            && self.phone.is_none()
            && self.blood_group.is_none()
    }
}

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Emergency, // 紧急
    Urgent,    // 急
    Routine,   // 常规
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Emergency => "EMERGENCY",
            RiskLevel::Urgent => "URGENT",
            RiskLevel::Routine => "ROUTINE",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = TriageError;

    /// 忽略大小写和首尾空白
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMERGENCY" => Ok(RiskLevel::Emergency),
            "URGENT" => Ok(RiskLevel::Urgent),
            "ROUTINE" => Ok(RiskLevel::Routine),
            _ => Err(TriageError::Validation(format!("Unknown risk level: {}", s))),
        }
    }
}

/// 病例状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Pending,        // 待分配
    DoctorAssigned, // 已分配医生
    Completed,      // 已完成
    Closed,         // 已关闭
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "PENDING",
            CaseStatus::DoctorAssigned => "DOCTOR_ASSIGNED",
            CaseStatus::Completed => "COMPLETED",
            CaseStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(CaseStatus::Pending),
            "DOCTOR_ASSIGNED" => Ok(CaseStatus::DoctorAssigned),
            "COMPLETED" => Ok(CaseStatus::Completed),
            "CLOSED" => Ok(CaseStatus::Closed),
            _ => Err(TriageError::Validation(format!("Unknown case status: {}", s))),
        }
    }
}

/// 分诊病例
///
/// 诊断字段是创建时的快照，不随患者信息变化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub patient_id: String,
    pub asha_worker_id: String,
    pub doctor_id: Option<String>,

    pub symptoms_raw: String,
    pub symptoms_english: String,
    pub language: String,

    pub primary_diagnosis: String,
    pub differential_diagnoses: Vec<String>,
    pub confidence_percent: u8,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub immediate_actions: Vec<String>,
    pub icmr_protocol: String,
    pub icd10_code: String,
    pub icd10_description: String,

    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 病例摘要（列表展示用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub case_id: String,
    pub primary_diagnosis: String,
    pub confidence_percent: u8,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub immediate_actions: Vec<String>,
    pub icd10_code: String,
    pub icd10_description: String,
    pub status: CaseStatus,
}

impl From<&Case> for CaseSummary {
    fn from(case: &Case) -> Self {
        CaseSummary {
            case_id: case.case_id.clone(),
            primary_diagnosis: case.primary_diagnosis.clone(),
            confidence_percent: case.confidence_percent,
            risk_level: case.risk_level,
            risk_reason: case.risk_reason.clone(),
            immediate_actions: case.immediate_actions.clone(),
            icd10_code: case.icd10_code.clone(),
            icd10_description: case.icd10_description.clone(),
            status: case.status,
        }
    }
}

/// 诊断请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub patient_id: String,
    pub asha_worker_id: String,
    pub symptoms_raw: String,
    pub language: String,
}

/// 医生专长
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Specialization {
    GeneralPhysician, // 全科医生
    Paediatrician,    // 儿科
    Gynaecologist,    // 妇科
    Other(String),
}

impl Specialization {
    pub fn as_str(&self) -> &str {
        match self {
            Specialization::GeneralPhysician => "General Physician",
            Specialization::Paediatrician => "Paediatrician",
            Specialization::Gynaecologist => "Gynaecologist",
            Specialization::Other(name) => name,
        }
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialization {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TriageError::Validation("Empty specialization".to_string()));
        }
        Ok(match trimmed {
            "General Physician" => Specialization::GeneralPhysician,
            "Paediatrician" => Specialization::Paediatrician,
            "Gynaecologist" => Specialization::Gynaecologist,
            other => Specialization::Other(other.to_string()),
        })
    }
}

impl TryFrom<String> for Specialization {
    type Error = TriageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Specialization> for String {
    fn from(value: Specialization) -> Self {
        value.as_str().to_string()
    }
}

/// 医生信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub doctor_id: String,
    pub name: String,
    pub specialization: Specialization,
    pub lat: f64,
    pub lng: f64,
    pub is_available: bool,
}

/// 匹配候选医生，附带与请求方的距离
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedDoctor {
    pub doctor: Doctor,
    pub distance_km: f64,
}

/// 医生分配结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub case_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialization: Specialization,
    pub distance_km: f64,
    pub case_status: CaseStatus,
    pub notification_preview: String,
}

/// ASHA 社区卫生工作者（演示账号）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AshaWorker {
    pub asha_worker_id: String,
    pub name: String,
    pub block: String,
    pub district: String,
    pub phone: String,
    pub lat: f64,
    pub lng: f64,
    pub pin: String,
}

/// ASHA 工作者公开信息（不含PIN）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AshaProfile {
    pub asha_worker_id: String,
    pub name: String,
    pub block: String,
    pub district: String,
    pub phone: String,
    pub lat: f64,
    pub lng: f64,
}

impl From<&AshaWorker> for AshaProfile {
    fn from(worker: &AshaWorker) -> Self {
        AshaProfile {
            asha_worker_id: worker.asha_worker_id.clone(),
            name: worker.name.clone(),
            block: worker.block.clone(),
            district: worker.district.clone(),
            phone: worker.phone.clone(),
            lat: worker.lat,
            lng: worker.lng,
        }
    }
}
