//! REST API endpoint for post evaluation

use actix_web::{HttpRequest, HttpResponse, error::JsonPayloadError, post, web};
use utoipa::OpenApi;

use crate::api::error::{ApiError, ErrorResponse};
use crate::api::health;
use crate::model::{
    AnalysisRequest, AnalysisResponse, ClassificationResult, Intent, Language, NuanceResult,
    PoliticalTendency, PoliticalTendencyResult, PostType, Source, VeracityResult, VeracityStatus,
    VerificationMethod,
};
use crate::service::EvaluationService;

#[derive(OpenApi)]
#[openapi(
    info(title = "Unite-I Evaluation API"),
    paths(evaluate, health::liveness, health::readiness, health::public_config),
    components(schemas(
        AnalysisRequest,
        AnalysisResponse,
        ClassificationResult,
        PostType,
        VeracityResult,
        VeracityStatus,
        VerificationMethod,
        Source,
        NuanceResult,
        PoliticalTendencyResult,
        PoliticalTendency,
        Intent,
        Language,
        ErrorResponse,
        health::HealthStatus,
        health::ReadinessStatus,
        health::PublicConfig,
    )),
    tags(
        (name = "evaluation", description = "Post evaluation"),
        (name = "health", description = "Service health and configuration")
    )
)]
pub struct ApiDoc;

/// Evaluate a post
///
/// Classifies the post, fact-checks factual claims against web search
/// results and analyses political tendency and intent. Optional analyses
/// that fail are degraded or omitted; only a failed classification fails
/// the request.
#[utoipa::path(
    post,
    path = "/evaluate",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Post evaluated", body = AnalysisResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Classification failed", body = ErrorResponse),
        (status = 504, description = "Evaluation timed out", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "evaluation"
)]
#[post("/evaluate")]
pub async fn evaluate(
    service: web::Data<EvaluationService>,
    body: web::Json<AnalysisRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();

    tracing::info!(
        post_id = %request.post_id,
        language = %request.language,
        "Evaluation requested"
    );

    let response = service.evaluate(&request).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Report malformed bodies with the standard error envelope
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

/// Configure evaluation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(evaluate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderClient, ProviderError, RetryPolicy};
    use crate::service::evaluation::EvaluationSettings;
    use crate::service::prompts::PromptStore;
    use crate::testing::{FakeProvider, FakeSearch};
    use actix_web::{App, http::StatusCode, test};
    use std::sync::Arc;
    use std::time::Duration;

    fn service(provider: FakeProvider, search: FakeSearch) -> web::Data<EvaluationService> {
        let client = ProviderClient::new(
            Arc::new(provider),
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            },
            Duration::from_secs(5),
        );
        let mut settings = EvaluationSettings::default();
        settings.search.query_spacing_ms = 0;

        web::Data::new(EvaluationService::new(
            client,
            Some(Arc::new(search)),
            Arc::new(PromptStore::load(None, true).unwrap()),
            settings,
        ))
    }

    #[actix_web::test]
    async fn test_evaluate_claim() {
        let data = service(
            FakeProvider::with_defaults(r#"{"primary_label": "Factual Claim", "confidence": 0.9}"#),
            FakeSearch::orbit(),
        );
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/evaluate")
            .set_json(serde_json::json!({
                "post_id": "p1",
                "post_text": "The Earth revolves around the Sun.",
                "language": "en"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["post_id"], "p1");
        assert_eq!(body["language"], "en");
        assert_eq!(body["post_analysis"]["post_type"], "Factual Claim");
        assert_eq!(body["post_analysis"]["is_spam"], false);
        assert_eq!(body["veracity_analysis"]["status"], "Factually Correct");
        assert_eq!(body["veracity_analysis"]["verification_method"], "Web Search");
        assert!(body["nuance_analysis"]["political_tendency"]["scores"].is_object());
    }

    #[actix_web::test]
    async fn test_evaluate_promotion_has_null_veracity() {
        let data = service(
            FakeProvider::with_defaults(r#"{"primary_label": "Promotional", "confidence": 0.95}"#),
            FakeSearch::orbit(),
        );
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/evaluate")
            .set_json(serde_json::json!({
                "post_id": "p2",
                "post_text": "Best pizza in town, 50% off today!"
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["post_analysis"]["post_type"], "Promotional");
        assert!(body["veracity_analysis"].is_null());
        assert_eq!(body["language"], "en");
    }

    #[actix_web::test]
    async fn test_invalid_bodies_are_bad_requests() {
        let data = service(FakeProvider::new(), FakeSearch::orbit());
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let bodies = [
            serde_json::json!({"post_id": "p3"}),
            serde_json::json!({"post_id": "p3", "post_text": "Hallo", "language": "fr"}),
            serde_json::json!({"post_id": "p3", "post_text": "   "}),
        ];

        for body in bodies {
            let req = test::TestRequest::post()
                .uri("/evaluate")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

            let json: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(json["error"], "bad_request");
            assert!(json["request_id"].is_string());
        }
    }

    #[actix_web::test]
    async fn test_classification_failure_is_bad_gateway() {
        let data = service(
            FakeProvider::new().fail(
                "classification",
                ProviderError::Rejected {
                    status: 401,
                    message: "invalid x-api-key".to_string(),
                },
            ),
            FakeSearch::orbit(),
        );
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/evaluate")
            .set_json(serde_json::json!({"post_id": "p4", "post_text": "Water boils at 100 C."}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["error"], "classification_failed");
        assert!(json.get("post_analysis").is_none());
    }
}
