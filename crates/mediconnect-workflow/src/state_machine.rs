//! 病例状态机
//!
//! 管理分诊病例的生命周期状态转换

use mediconnect_core::{CaseStatus, Result, TriageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 病例状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CaseEvent {
    AssignDoctor,
    Complete,
    Close,
}

/// 病例状态机
#[derive(Debug)]
pub struct CaseStateMachine {
    transitions: HashMap<(CaseStatus, CaseEvent), CaseStatus>,
}

impl CaseStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 定义状态转换规则
        transitions.insert((CaseStatus::Pending, CaseEvent::AssignDoctor), CaseStatus::DoctorAssigned);
        transitions.insert((CaseStatus::DoctorAssigned, CaseEvent::Complete), CaseStatus::Completed);
        transitions.insert((CaseStatus::Completed, CaseEvent::Close), CaseStatus::Closed);
        transitions.insert((CaseStatus::Pending, CaseEvent::Close), CaseStatus::Closed);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: CaseStatus, event: CaseEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: CaseStatus, event: CaseEvent) -> Result<CaseStatus> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(TriageError::InvalidStateTransition {
                from: from.to_string(),
                event: format!("{:?}", event),
            }),
        }
    }
}

impl Default for CaseStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
