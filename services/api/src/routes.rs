use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use intake::error::AppError;
use intake::workflows::intake::{raw_submission_from_json, SubmissionCategory, SubmissionService};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub(crate) fn with_intake_routes(service: Arc<SubmissionService>) -> Router {
    Router::new()
        .route(
            "/api/v1/submissions/:category",
            post(submission_endpoint),
        )
        .with_state(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Accepts an already validated form. Archiving and notification problems are
/// logged by the pipeline and never change the response.
pub(crate) async fn submission_endpoint(
    State(service): State<Arc<SubmissionService>>,
    Path(category): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let category = SubmissionCategory::new(category)?;
    let raw = raw_submission_from_json(payload)?;

    let outcome = service.process(&category, &raw).await;
    debug!(
        base_id = %outcome.base_id,
        state = outcome.state.label(),
        "submission handled"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "received",
            "message": acknowledgement(&category),
        })),
    ))
}

fn acknowledgement(category: &SubmissionCategory) -> &'static str {
    match category.as_str() {
        SubmissionCategory::GENERAL_CONTACT => {
            "Thank you for your inquiry. We will contact you shortly."
        }
        SubmissionCategory::PERSONAL_INJURY => {
            "Case evaluation request submitted. We will review it immediately."
        }
        SubmissionCategory::CRIMINAL_DEFENSE => {
            "Criminal case intake submitted. We are reviewing your details."
        }
        SubmissionCategory::AUTO_ACCIDENT_WIZARD => {
            "Assessment complete! We are analyzing your case."
        }
        _ => "Thank you. Your submission has been received.",
    }
}
