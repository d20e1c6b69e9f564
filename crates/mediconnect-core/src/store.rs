//! 持久化存储接口
//!
//! 任意键值/文档存储只要实现 [`TriageStore`] 即可接入分诊流程。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::models::{Case, Doctor, Patient, Specialization};

/// 医生扫描过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorFilter {
    /// 仅返回可用医生
    pub available_only: bool,
    /// 按专长过滤
    pub specialization: Option<Specialization>,
}

impl DoctorFilter {
    /// 所有可用医生
    pub fn available() -> Self {
        Self {
            available_only: true,
            specialization: None,
        }
    }

    pub fn matches(&self, doctor: &Doctor) -> bool {
        if self.available_only && !doctor.is_available {
            return false;
        }
        match &self.specialization {
            Some(specialization) => &doctor.specialization == specialization,
            None => true,
        }
    }
}

/// 分诊数据存储接口
///
/// 扫描类操作必须保持稳定的返回顺序，匹配逻辑依赖它做平局裁决。
#[async_trait]
pub trait TriageStore: Send + Sync {
    // ========== 患者 ==========

    async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>>;

    async fn put_patient(&self, patient: &Patient) -> Result<()>;

    /// 将病症并入患者的已知病症集合，合并在存储端原子完成
    async fn add_patient_conditions(
        &self,
        patient_id: &str,
        conditions: &BTreeSet<String>,
    ) -> Result<()>;

    /// 按ASHA工作者ID查询患者
    async fn query_patients_by_worker(&self, asha_worker_id: &str) -> Result<Vec<Patient>>;

    // ========== 病例 ==========

    async fn get_case(&self, case_id: &str) -> Result<Option<Case>>;

    async fn put_case(&self, case: &Case) -> Result<()>;

    /// 按患者ID查询病例，按创建时间倒序返回
    async fn query_cases_by_patient(&self, patient_id: &str) -> Result<Vec<Case>>;

    /// 条件更新：仅当病例仍为 PENDING 时写入医生并置为 DOCTOR_ASSIGNED。
    ///
    /// 返回更新后的病例；条件不满足（或病例不存在）时返回 `None`。
    async fn assign_case_if_pending(
        &self,
        case_id: &str,
        doctor_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Case>>;

    // ========== 医生 ==========

    async fn get_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>>;

    async fn put_doctor(&self, doctor: &Doctor) -> Result<()>;

    async fn scan_doctors(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>>;
}
