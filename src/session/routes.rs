//! REST endpoints for the patient intake flow and committed records.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::IntakeError;
use crate::session::manager::{AnswersRequest, DetailsRequest, IntakeManager, SymptomsRequest};
use crate::store::Database;

/// Default and maximum page size for record listings.
const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

/// Shared state for intake routes.
#[derive(Clone)]
pub struct ApiState {
    pub manager: Arc<IntakeManager>,
    pub db: Arc<dyn Database>,
}

/// Map an intake error to its status code and JSON payload.
fn error_response(err: &IntakeError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        IntakeError::InvalidRequest { field, message } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "invalid_request",
                "field": field,
                "message": message,
            })),
        ),
        IntakeError::SessionNotFound { id } => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "session_not_found",
                "message": format!("Session {id} not found"),
            })),
        ),
        IntakeError::StepMismatch { .. } => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "step_mismatch",
                "message": err.to_string(),
            })),
        ),
        IntakeError::SessionClosed { id } => (
            StatusCode::GONE,
            Json(serde_json::json!({
                "error": "session_closed",
                "message": format!("Session {id} is already submitted"),
            })),
        ),
    }
}

fn invalid_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "invalid_id",
            "message": "Id must be a UUID",
        })),
    )
        .into_response()
}

// ── Session handlers ────────────────────────────────────────────────

/// POST /api/intake/sessions
///
/// Opens a new intake session and returns the greeting.
async fn begin_session(State(state): State<ApiState>) -> impl IntoResponse {
    let resp = state.manager.begin().await;
    (StatusCode::CREATED, Json(resp))
}

/// GET /api/intake/sessions/{id}
///
/// Returns a snapshot of the session. Works at every step.
async fn session_status(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return invalid_id();
    };
    match state.manager.status(id).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/intake/sessions/{id}/details
///
/// Records the patient's name and email.
async fn submit_details(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<DetailsRequest>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return invalid_id();
    };
    match state.manager.submit_details(id, req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/intake/sessions/{id}/symptoms
///
/// Selects symptoms and returns the aggregated follow-up form.
async fn select_symptoms(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<SymptomsRequest>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return invalid_id();
    };
    match state.manager.select_symptoms(id, req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /api/intake/sessions/{id}/answers
///
/// Submits follow-up answers; completes the intake once all questions are
/// covered.
async fn submit_answers(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<AnswersRequest>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return invalid_id();
    };
    match state.manager.submit_answers(id, req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// ── Record handlers ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

/// GET /api/records?limit=
///
/// Lists committed records, most recent first.
async fn list_records(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    match state.db.list_records(limit).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            tracing::error!("Failed to list records: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "database",
                    "message": "Failed to list records",
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/records/{id}
///
/// Returns a single committed record, or 404.
async fn show_record(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return invalid_id();
    };
    match state.db.get_record(id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "record_not_found",
                "message": format!("Record {id} not found"),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(record_id = %id, "Failed to load record: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "database",
                    "message": "Failed to load record",
                })),
            )
                .into_response()
        }
    }
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "clinic-intake"
    }))
}

/// Build the intake REST routes.
pub fn intake_routes(state: ApiState) -> Router {
    Router::new()
        .route("/api/intake/sessions", post(begin_session))
        .route("/api/intake/sessions/{id}", get(session_status))
        .route("/api/intake/sessions/{id}/details", post(submit_details))
        .route("/api/intake/sessions/{id}/symptoms", post(select_symptoms))
        .route("/api/intake/sessions/{id}/answers", post(submit_answers))
        .route("/api/records", get(list_records))
        .route("/api/records/{id}", get(show_record))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_responses_carry_the_right_status() {
        let id = Uuid::new_v4();

        let (code, _) = error_response(&IntakeError::invalid("email", "bad"));
        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);

        let (code, _) = error_response(&IntakeError::SessionNotFound { id });
        assert_eq!(code, StatusCode::NOT_FOUND);

        let (code, _) = error_response(&IntakeError::StepMismatch {
            id,
            expected: "follow_up".into(),
            actual: "greeting".into(),
        });
        assert_eq!(code, StatusCode::CONFLICT);

        let (code, _) = error_response(&IntakeError::SessionClosed { id });
        assert_eq!(code, StatusCode::GONE);
    }

    #[test]
    fn invalid_request_payload_names_the_field() {
        let (_, Json(body)) = error_response(&IntakeError::invalid("email", "does not look valid"));
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["field"], "email");
        assert_eq!(body["message"], "does not look valid");
    }
}
