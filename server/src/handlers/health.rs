use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::{db::Database, error::Result};

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
}

#[get("/health")]
pub async fn health_check(db: web::Data<Database>) -> Result<HttpResponse> {
    if let Err(err) = db.ping().await {
        log::warn!("Health check: storage unavailable: {}", err);
        return Ok(HttpResponse::ServiceUnavailable().json(HealthCheckResponse {
            status: "degraded".to_string(),
            storage: "unavailable".to_string(),
        }));
    }

    Ok(HttpResponse::Ok().json(HealthCheckResponse {
        status: "healthy".to_string(),
        storage: "ok".to_string(),
    }))
}
