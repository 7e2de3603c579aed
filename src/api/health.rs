//! Health check and configuration endpoints

use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{FeatureConfig, SearchConfig, ThresholdConfig};
use crate::service::EvaluationService;

#[derive(Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessStatus {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub model: String,
    pub web_search: String,
}

/// Non-sensitive runtime configuration
#[derive(Serialize, ToSchema)]
pub struct PublicConfig {
    pub provider: String,
    pub model: String,
    pub web_search_enabled: bool,
    pub features: FeatureConfig,
    pub thresholds: ThresholdConfig,
    pub search: SearchConfig,
    pub max_post_chars: usize,
    pub request_timeout_secs: u64,
}

/// Liveness probe endpoint
///
/// Always returns 200 OK if the service is running.
#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Service is alive", body = HealthStatus)
    ),
    tag = "health"
)]
#[get("/health/live")]
pub async fn liveness() -> impl Responder {
    HttpResponse::Ok().json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe endpoint
///
/// Credentials and templates are validated at startup, so a running
/// instance is ready. Web search is reported as it is optional.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessStatus)
    ),
    tag = "health"
)]
#[get("/health/ready")]
pub async fn readiness(service: web::Data<EvaluationService>) -> impl Responder {
    let web_search = if service.search_enabled() {
        "enabled"
    } else {
        "disabled"
    };

    HttpResponse::Ok().json(ReadinessStatus {
        status: "ready".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: service.provider_name().to_string(),
        model: service.model().to_string(),
        web_search: web_search.to_string(),
    })
}

/// Current evaluation configuration, without credentials
#[utoipa::path(
    get,
    path = "/config",
    responses(
        (status = 200, description = "Active configuration", body = PublicConfig)
    ),
    tag = "health"
)]
#[get("/config")]
pub async fn public_config(service: web::Data<EvaluationService>) -> impl Responder {
    let settings = service.settings();

    HttpResponse::Ok().json(PublicConfig {
        provider: service.provider_name().to_string(),
        model: service.model().to_string(),
        web_search_enabled: service.search_enabled(),
        features: settings.features.clone(),
        thresholds: settings.thresholds.clone(),
        search: settings.search.clone(),
        max_post_chars: settings.max_post_chars,
        request_timeout_secs: settings.request_timeout.as_secs(),
    })
}

/// Configure health check routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(liveness)
        .service(readiness)
        .service(public_config);
}
