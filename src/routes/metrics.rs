use crate::{error::AppError, middleware::HttpMetrics};
use actix_web::{get, web, HttpResponse, Responder};

pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Prometheus text exposition of the HTTP metrics.
#[get("/metrics")]
pub async fn metrics(metrics: web::Data<HttpMetrics>) -> Result<impl Responder, AppError> {
    let body = metrics
        .render()
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(HttpResponse::Ok()
        .content_type(PROMETHEUS_CONTENT_TYPE)
        .body(body))
}
