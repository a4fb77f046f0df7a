use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

/// Name reported by `/health`; registered as app data by each binary.
#[derive(Debug, Clone, Copy)]
pub struct ServiceName(pub &'static str);

/// Liveness check shared by both services. Always `200` with
/// `{"status": "ok", "service": <name>, "timestamp": <RFC 3339>}`; it never
/// touches storage or the auth service, and sits outside the session gate.
#[get("/health")]
pub async fn health(service: web::Data<ServiceName>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": service.0,
        "timestamp": Utc::now()
    }))
}
