use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::bulk::BulkOperation;
use super::service::{CrmError, StudentRelationshipService};
use super::state::RosterViewState;
use crate::error::AppError;
use crate::export::ExportScope;

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    #[serde(flatten)]
    pub state: RosterViewState,
    pub operation: BulkOperation,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub state: RosterViewState,
    #[serde(default)]
    pub scope: ExportScope,
    pub columns: Vec<String>,
}

/// Router exposing the roster view, bulk actions and exports.
pub fn student_router(service: Arc<StudentRelationshipService>) -> Router {
    Router::new()
        .route("/api/v1/students/view", post(view_handler))
        .route("/api/v1/students/bulk", post(bulk_handler))
        .route("/api/v1/students/export", post(export_handler))
        .with_state(service)
}

pub(crate) async fn view_handler(
    State(service): State<Arc<StudentRelationshipService>>,
    Json(state): Json<RosterViewState>,
) -> Response {
    match service.view(&state) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn bulk_handler(
    State(service): State<Arc<StudentRelationshipService>>,
    Json(request): Json<BulkRequest>,
) -> Response {
    match service.bulk(request.state, request.operation).await {
        Ok(completion) => (StatusCode::OK, Json(completion)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler(
    State(service): State<Arc<StudentRelationshipService>>,
    Json(request): Json<ExportRequest>,
) -> Response {
    match service.export_csv(&request.state, request.scope, &request.columns) {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"students.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: CrmError) -> Response {
    AppError::from(err).into_response()
}
