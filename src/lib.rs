//! # MediConnect
//!
//! 农村医疗分诊后端的门面包，统一重新导出各子模块。

pub use mediconnect_core as core;
pub use mediconnect_database as database;
pub use mediconnect_integration as integration;
pub use mediconnect_workflow as workflow;
