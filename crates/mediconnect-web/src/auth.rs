//! ASHA工作者演示登录
//!
//! 账号来自配置中的演示数据，PIN以明文比较，不签发令牌。

use axum::{
    extract::{Path, State},
    Json,
};
use mediconnect_core::{AshaProfile, AshaWorker, Result, TriageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::handlers::ApiResult;
use crate::server::AppState;

/// 登录请求
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub pin: String,
}

/// 登录响应
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub asha: AshaProfile,
}

/// 认证服务
#[derive(Debug, Clone, Default)]
pub struct AuthService {
    workers: HashMap<String, AshaWorker>,
}

impl AuthService {
    pub fn new(workers: Vec<AshaWorker>) -> Self {
        let workers = workers
            .into_iter()
            .map(|worker| (worker.asha_worker_id.clone(), worker))
            .collect::<HashMap<_, _>>();

        info!("Loaded {} ASHA worker account(s)", workers.len());
        Self { workers }
    }

    /// 手机号加PIN登录
    pub fn login(&self, request: &LoginRequest) -> Result<AshaProfile> {
        let worker = self
            .workers
            .values()
            .find(|worker| worker.phone == request.phone)
            .ok_or_else(|| TriageError::Unauthorized("Invalid phone number".to_string()))?;

        if worker.pin != request.pin {
            return Err(TriageError::Unauthorized("Invalid PIN".to_string()));
        }

        Ok(AshaProfile::from(worker))
    }

    /// 获取工作者公开信息
    pub fn profile(&self, asha_worker_id: &str) -> Result<AshaProfile> {
        self.worker(asha_worker_id)
            .map(AshaProfile::from)
            .ok_or_else(|| TriageError::NotFound(format!("ASHA worker {} not found", asha_worker_id)))
    }

    pub fn worker(&self, asha_worker_id: &str) -> Option<&AshaWorker> {
        self.workers.get(asha_worker_id)
    }
}

/// 登录处理器
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    info!("Login attempt for phone ending {}", phone_suffix(&request.phone));

    match state.auth.login(&request) {
        Ok(asha) => {
            info!("ASHA worker logged in: {}", asha.asha_worker_id);
            Ok(Json(LoginResponse {
                message: "Login successful".to_string(),
                asha,
            }))
        }
        Err(e) => {
            warn!("Login failed: {}", e);
            Err(e.into())
        }
    }
}

/// 工作者信息处理器
pub async fn profile_handler(
    State(state): State<AppState>,
    Path(asha_id): Path<String>,
) -> ApiResult<Json<AshaProfile>> {
    Ok(Json(state.auth.profile(&asha_id)?))
}

fn phone_suffix(phone: &str) -> &str {
    let start = phone
        .char_indices()
        .rev()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &phone[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediconnect_core::ErrorKind;

    fn service() -> AuthService {
        AuthService::new(vec![AshaWorker {
            asha_worker_id: "ASHA-001".to_string(),
            name: "Amita Devi".to_string(),
            block: "Bikram".to_string(),
            district: "Patna".to_string(),
            phone: "+919876543210".to_string(),
            lat: 25.5921,
            lng: 85.1376,
            pin: "1234".to_string(),
        }])
    }

    fn request(phone: &str, pin: &str) -> LoginRequest {
        LoginRequest {
            phone: phone.to_string(),
            pin: pin.to_string(),
        }
    }

    #[test]
    fn test_login_success_returns_profile() {
        let profile = service().login(&request("+919876543210", "1234")).unwrap();
        assert_eq!(profile.asha_worker_id, "ASHA-001");
        assert_eq!(profile.block, "Bikram");
    }

    #[test]
    fn test_login_failures() {
        let err = service().login(&request("+910000000000", "1234")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.to_string().contains("Invalid phone number"));

        let err = service().login(&request("+919876543210", "0000")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.to_string().contains("Invalid PIN"));
    }

    #[test]
    fn test_profile_lookup() {
        let auth = service();
        assert_eq!(auth.profile("ASHA-001").unwrap().lat, 25.5921);
        assert_eq!(auth.profile("ASHA-404").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_phone_suffix() {
        assert_eq!(phone_suffix("+919876543210"), "3210");
        assert_eq!(phone_suffix("12"), "12");
    }
}
