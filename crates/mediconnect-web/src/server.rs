//! Web服务器

use axum::{
    routing::{get, post},
    Router,
};
use mediconnect_core::Result;
use mediconnect_workflow::TriageEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::auth::{login_handler, profile_handler, AuthService};
use crate::handlers::{
    api_root, cases_for_patient, connect_doctor, diagnose, get_case, get_patient, health,
    list_patients, register_patient, search_patients, update_patient,
};

/// 处理器共享状态
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TriageEngine>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(engine: Arc<TriageEngine>, auth: AuthService) -> Self {
        Self {
            engine,
            auth: Arc::new(auth),
        }
    }
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            app: create_app(state),
        }
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app).await?;

        Ok(())
    }
}

/// 构建完整路由
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api_root))
        .route("/health", get(health))
        .nest("/asha", asha_routes())
        .nest("/patients", patient_routes())
        .nest("/cases", case_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// ASHA工作者路由
fn asha_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/:asha_id/profile", get(profile_handler))
}

/// 患者路由
///
/// `/:id` 上 GET 按ASHA工作者列出患者，PUT 更新单个患者。
fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_patient))
        .route("/search", get(search_patients))
        .route("/profile/:patient_id", get(get_patient))
        .route("/:id", get(list_patients).put(update_patient))
}

/// 病例路由
fn case_routes() -> Router<AppState> {
    Router::new()
        .route("/diagnose", post(diagnose))
        .route("/patient/:patient_id", get(cases_for_patient))
        .route("/:case_id", get(get_case))
        .route("/:case_id/connect-doctor", post(connect_doctor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use mediconnect_core::{AshaWorker, Doctor, Specialization};
    use mediconnect_database::MemoryStore;
    use mediconnect_integration::CannedDiagnosisModel;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn doctor(id: &str, specialization: Specialization, lat: f64, lng: f64) -> Doctor {
        Doctor {
            doctor_id: id.to_string(),
            name: format!("Dr. {}", id),
            specialization,
            lat,
            lng,
            is_available: true,
        }
    }

    fn worker() -> AshaWorker {
        AshaWorker {
            asha_worker_id: "ASHA-001".to_string(),
            name: "Amita Devi".to_string(),
            block: "Bikram".to_string(),
            district: "Patna".to_string(),
            phone: "+919876543210".to_string(),
            lat: 25.5921,
            lng: 85.1376,
            pin: "1234".to_string(),
        }
    }

    fn model_reply(diagnosis: &str, risk: &str) -> String {
        json!({
            "symptoms_english": "reported symptoms",
            "primary_diagnosis": diagnosis,
            "differential_diagnoses": ["Viral fever"],
            "confidence_percent": 72,
            "risk_level": risk,
            "risk_reason": "Reported by ASHA",
            "immediate_actions": ["Monitor"],
            "icmr_protocol": "ICMR STW",
            "icd10_code": "R50.9",
            "icd10_description": "Fever, unspecified",
            "auto_tag_conditions": ["Fever"]
        })
        .to_string()
    }

    fn app_with_reply(reply: String) -> Router {
        let store = Arc::new(MemoryStore::with_doctors(vec![
            doctor("DR-001", Specialization::Gynaecologist, 25.5941, 85.1376),
            doctor("DR-002", Specialization::GeneralPhysician, 25.6121, 85.1534),
            doctor("DR-003", Specialization::Paediatrician, 25.5712, 85.1892),
        ]));
        let model = Arc::new(CannedDiagnosisModel::new(reply));
        let engine = Arc::new(TriageEngine::new(store, model));
        create_app(AppState::new(engine, AuthService::new(vec![worker()])))
    }

    fn app() -> Router {
        app_with_reply(model_reply("Viral fever", "ROUTINE"))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn register(app: &Router, name: &str, age: u32) -> String {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/patients/register",
                json!({
                    "asha_worker_id": "ASHA-001",
                    "name": name,
                    "age": age,
                    "gender": "F",
                    "village": "Rampur"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["patient_id"].as_str().unwrap().to_string()
    }

    async fn diagnose_case(app: &Router, patient_id: &str, symptoms: &str) -> Value {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/cases/diagnose",
                json!({
                    "patient_id": patient_id,
                    "asha_worker_id": "ASHA-001",
                    "symptoms_raw": symptoms,
                    "language": "hi-IN"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let app = app();
        let (status, body) = send(&app, empty_request("GET", "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "MediConnect AI Backend Running");
        assert_eq!(body["model"], "canned");

        let (status, body) = send(&app, empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_login_and_profile() {
        let app = app();
        let (status, body) = send(
            &app,
            json_request("POST", "/asha/login", json!({"phone": "+919876543210", "pin": "1234"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["asha"]["asha_worker_id"], "ASHA-001");
        assert!(body["asha"].get("pin").is_none());

        let (status, body) = send(
            &app,
            json_request("POST", "/asha/login", json!({"phone": "+919876543210", "pin": "9999"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "unauthorized");

        let (status, body) = send(&app, empty_request("GET", "/asha/ASHA-001/profile")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lat"], 25.5921);

        let (status, _) = send(&app, empty_request("GET", "/asha/ASHA-999/profile")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patient_routes() {
        let app = app();
        let patient_id = register(&app, "Sunita Kumari", 28).await;
        register(&app, "Geeta Devi", 41).await;

        let (status, body) = send(&app, empty_request("GET", "/patients/ASHA-001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) =
            send(&app, empty_request("GET", "/patients/search?asha_id=ASHA-001&q=sunita")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["patient_id"], patient_id.as_str());

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                &format!("/patients/{}", patient_id),
                json!({"blood_group": "B+"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blood_group"], "B+");

        let (status, body) = send(
            &app,
            empty_request("GET", &format!("/patients/profile/{}", patient_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blood_group"], "B+");

        let (status, body) = send(
            &app,
            json_request("PUT", &format!("/patients/{}", patient_id), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");

        let (status, _) = send(&app, empty_request("GET", "/patients/profile/PAT-ffffffff")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_diagnose_and_connect_doctor() {
        let app = app();
        let patient_id = register(&app, "Sunita Kumari", 28).await;

        let case = diagnose_case(&app, &patient_id, "bukhar aur badan dard").await;
        let case_id = case["case_id"].as_str().unwrap().to_string();
        assert_eq!(case["status"], "PENDING");
        assert_eq!(case["risk_level"], "ROUTINE");

        let (status, body) = send(&app, empty_request("GET", &format!("/cases/{}", case_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["primary_diagnosis"], "Viral fever");

        let (status, body) = send(
            &app,
            empty_request("POST", &format!("/cases/{}/connect-doctor", case_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["message"], "Doctor assigned successfully");
        assert_eq!(body["doctor_id"], "DR-002");
        assert_eq!(body["case_status"], "DOCTOR_ASSIGNED");
        assert!(body["notification_preview"].as_str().unwrap().contains(&case_id));

        let (status, body) = send(
            &app,
            empty_request("POST", &format!("/cases/{}/connect-doctor", case_id)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "invalid_state");

        let (status, body) = send(
            &app,
            empty_request("GET", &format!("/cases/patient/{}", patient_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["status"], "DOCTOR_ASSIGNED");
    }

    #[tokio::test]
    async fn test_connect_doctor_with_explicit_coordinates() {
        let app = app_with_reply(model_reply("Pneumonia", "URGENT"));
        let patient_id = register(&app, "Ravi Kumar", 6).await;
        let case = diagnose_case(&app, &patient_id, "cough and fever").await;
        let case_id = case["case_id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/cases/{}/connect-doctor", case_id),
                json!({"lat": 25.5712, "lng": 85.1892}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["doctor_id"], "DR-003");
        assert_eq!(body["specialization"], "Paediatrician");
        assert_eq!(body["distance_km"], 0.0);
    }

    #[tokio::test]
    async fn test_connect_doctor_rejects_partial_coordinates() {
        let app = app();
        let patient_id = register(&app, "Meena Devi", 30).await;
        let case = diagnose_case(&app, &patient_id, "bukhar").await;
        let case_id = case["case_id"].as_str().unwrap();
        let uri = format!("/cases/{}/connect-doctor", case_id);

        for partial in [json!({"lat": 25.5712}), json!({"lng": 85.1892})] {
            let (status, body) = send(&app, json_request("POST", &uri, partial)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(body["kind"], "validation");
        }

        let (status, body) = send(&app, empty_request("GET", &format!("/cases/{}", case_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PENDING");
    }

    #[tokio::test]
    async fn test_emergency_keywords_override_model_risk() {
        let app = app();
        let patient_id = register(&app, "Meena Devi", 24).await;

        let case = diagnose_case(&app, &patient_id, "Heavy bleeding after delivery").await;
        assert_eq!(case["risk_level"], "EMERGENCY");
    }

    #[tokio::test]
    async fn test_error_mapping_for_model_and_missing_case() {
        let app = app_with_reply("I cannot answer that".to_string());
        let patient_id = register(&app, "Sunita Kumari", 28).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/cases/diagnose",
                json!({
                    "patient_id": patient_id,
                    "asha_worker_id": "ASHA-001",
                    "symptoms_raw": "fever",
                    "language": "en-IN"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "malformed_model_output");
        assert_eq!(body["status"], 422);

        let (status, body) = send(&app, empty_request("GET", "/cases/CASE-ffffffff")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], true);

        let (status, _) = send(
            &app,
            empty_request("POST", "/cases/CASE-ffffffff/connect-doctor"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
