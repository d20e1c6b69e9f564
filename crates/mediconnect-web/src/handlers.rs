//! HTTP处理器

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use mediconnect_core::{
    AssignmentResult, Case, CaseSummary, DiagnosisRequest, ErrorKind, Patient,
    PatientRegistration, PatientUpdate, TriageError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::server::AppState;

/// API版本
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// API根路径处理器
pub async fn api_root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "MediConnect AI Backend Running",
        "version": API_VERSION,
        "model": state.engine.model_name(),
        "endpoints": {
            "health": "/health",
            "asha": "/asha",
            "patients": "/patients",
            "cases": "/cases"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": API_VERSION
    }))
}

// ========== 患者 ==========

pub async fn register_patient(
    State(state): State<AppState>,
    Json(registration): Json<PatientRegistration>,
) -> ApiResult<Json<Patient>> {
    let patient = state.engine.patients().register(registration).await?;
    Ok(Json(patient))
}

/// 按ASHA工作者列出患者
pub async fn list_patients(
    State(state): State<AppState>,
    Path(asha_id): Path<String>,
) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.engine.patients().list_for_worker(&asha_id).await?))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.engine.patients().get_patient(&patient_id).await?))
}

/// 搜索参数
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub asha_id: String,
    pub q: String,
}

pub async fn search_patients(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Patient>>> {
    let patients = state
        .engine
        .patients()
        .search(&params.asha_id, &params.q)
        .await?;
    Ok(Json(patients))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(update): Json<PatientUpdate>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.engine.patients().update(&patient_id, update).await?))
}

// ========== 病例 ==========

/// 诊断处理器
pub async fn diagnose(
    State(state): State<AppState>,
    Json(request): Json<DiagnosisRequest>,
) -> ApiResult<Json<Case>> {
    info!("Diagnosis requested for patient {}", request.patient_id);
    Ok(Json(state.engine.diagnose(&request).await?))
}

pub async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> ApiResult<Json<Case>> {
    Ok(Json(state.engine.get_case(&case_id).await?))
}

pub async fn cases_for_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Vec<CaseSummary>>> {
    Ok(Json(state.engine.cases_for_patient(&patient_id).await?))
}

/// 分配医生请求，坐标需同时给出；都缺省时使用病例所属ASHA工作者的位置
#[derive(Debug, Default, Deserialize)]
pub struct ConnectDoctorRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// 分配医生响应
#[derive(Debug, Serialize)]
pub struct ConnectDoctorResponse {
    pub message: String,
    #[serde(flatten)]
    pub result: AssignmentResult,
}

pub async fn connect_doctor(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    body: Option<Json<ConnectDoctorRequest>>,
) -> ApiResult<Json<ConnectDoctorResponse>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let (lat, lng) = match (request.lat, request.lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        (None, None) => {
            let case = state.engine.get_case(&case_id).await?;
            let worker = state.auth.worker(&case.asha_worker_id).ok_or_else(|| {
                TriageError::Validation(format!(
                    "No coordinates supplied and ASHA worker {} is unknown",
                    case.asha_worker_id
                ))
            })?;
            (worker.lat, worker.lng)
        }
        _ => {
            return Err(TriageError::Validation(
                "Both lat and lng must be supplied".to_string(),
            )
            .into())
        }
    };

    let result = state.engine.assign_doctor(&case_id, lat, lng).await?;
    Ok(Json(ConnectDoctorResponse {
        message: "Doctor assigned successfully".to_string(),
        result,
    }))
}

// ========== 错误处理 ==========

/// 处理器结果类型
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// HTTP错误包装
#[derive(Debug)]
pub struct ApiError(pub TriageError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::UpstreamCallFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::MalformedModelOutput => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NoDoctorAvailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self.0);
        } else {
            warn!("Request rejected with {}: {}", status, self.0);
        }

        let body = Json(json!({
            "error": true,
            "kind": self.0.kind().as_str(),
            "message": self.0.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
