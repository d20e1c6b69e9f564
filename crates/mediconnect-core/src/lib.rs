//! # MediConnect Core
//!
//! 分诊系统的核心模块，提供基础数据结构、错误定义、通用工具，
//! 以及存储和诊断模型的能力接口。

pub mod error;
pub mod inference;
pub mod models;
pub mod store;
pub mod utils;

pub use error::{ErrorKind, Result, TriageError};
pub use inference::DiagnosisModel;
pub use models::*;
pub use store::{DoctorFilter, TriageStore};
