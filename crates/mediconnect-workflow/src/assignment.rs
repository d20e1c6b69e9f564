//! 病例医生分配流程

use mediconnect_core::{utils, AssignmentResult, Result, TriageError, TriageStore};
use std::sync::Arc;

use crate::matching::DoctorMatcher;
use crate::notification::format_case_message;
use crate::state_machine::{CaseEvent, CaseStateMachine};

/// 距离保留两位小数
pub fn round_distance(distance_km: f64) -> f64 {
    (distance_km * 100.0).round() / 100.0
}

/// 医生分配流程
///
/// 状态检查后的写入依赖存储层的条件更新；并发请求中只有一个能成功。
pub struct CaseAssignmentFlow {
    store: Arc<dyn TriageStore>,
    matcher: DoctorMatcher,
    state_machine: CaseStateMachine,
}

impl CaseAssignmentFlow {
    pub fn new(store: Arc<dyn TriageStore>) -> Self {
        Self {
            matcher: DoctorMatcher::new(store.clone()),
            store,
            state_machine: CaseStateMachine::new(),
        }
    }

    /// 为病例分配最合适的医生
    pub async fn assign_doctor(&self, case_id: &str, lat: f64, lng: f64) -> Result<AssignmentResult> {
        tracing::info!("Assigning doctor to case {}", case_id);

        let case = self
            .store
            .get_case(case_id)
            .await?
            .ok_or_else(|| TriageError::NotFound(format!("Case {} not found", case_id)))?;

        let next_status = self
            .state_machine
            .transition(case.status, CaseEvent::AssignDoctor)
            .map_err(|_| TriageError::InvalidState {
                case_id: case_id.to_string(),
                status: case.status,
            })?;

        let patient = self
            .store
            .get_patient(&case.patient_id)
            .await?
            .ok_or_else(|| {
                TriageError::NotFound(format!(
                    "Patient {} of case {} not found",
                    case.patient_id, case_id
                ))
            })?;

        let matched = self
            .matcher
            .match_doctor(&case.primary_diagnosis, patient.age, lat, lng)
            .await?
            .ok_or_else(|| {
                TriageError::NoDoctorAvailable(format!("No available doctor for case {}", case_id))
            })?;

        let updated = match self
            .store
            .assign_case_if_pending(case_id, &matched.doctor.doctor_id, utils::now())
            .await?
        {
            Some(updated) => updated,
            None => {
                let status = self
                    .store
                    .get_case(case_id)
                    .await?
                    .map(|c| c.status)
                    .unwrap_or(next_status);
                tracing::warn!(
                    "Lost assignment race for case {}: status is now {}",
                    case_id,
                    status
                );
                return Err(TriageError::InvalidState {
                    case_id: case_id.to_string(),
                    status,
                });
            }
        };

        let notification_preview = format_case_message(&updated, &patient, &matched);

        tracing::info!(
            "Case {} assigned to {} ({}, {:.2} km)",
            case_id,
            matched.doctor.doctor_id,
            matched.doctor.specialization,
            matched.distance_km
        );

        Ok(AssignmentResult {
            case_id: updated.case_id,
            doctor_id: matched.doctor.doctor_id,
            doctor_name: matched.doctor.name,
            specialization: matched.doctor.specialization,
            distance_km: round_distance(matched.distance_km),
            case_status: updated.status,
            notification_preview,
        })
    }
}
