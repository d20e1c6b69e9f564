//! # MediConnect Web模块
//!
//! 基于axum的HTTP接口：ASHA登录、患者登记、诊断与医生分配

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::{AuthService, LoginRequest, LoginResponse};
pub use handlers::{ApiError, ApiResult};
pub use server::{create_app, AppState, WebServer};
