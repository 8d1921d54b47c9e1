use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::domain::InvoiceNumber;
use super::service::{BillingError, BillingService};
use crate::crm::domain::StudentId;
use crate::error::AppError;

/// Header listing the invoices left out of an archive, comma separated.
pub const RENDER_FAILURES_HEADER: &str = "x-render-failures";

/// Router exposing per-student financials, reconciliation and invoice documents.
pub fn billing_router(service: Arc<BillingService>) -> Router {
    Router::new()
        .route("/api/v1/students/:student_id/financials", get(financials_handler))
        .route("/api/v1/students/:student_id/reconcile", post(reconcile_handler))
        .route(
            "/api/v1/students/:student_id/invoices/archive",
            get(archive_handler),
        )
        .route("/api/v1/invoices/:number/document", get(document_handler))
        .with_state(service)
}

pub(crate) async fn financials_handler(
    State(service): State<Arc<BillingService>>,
    Path(student_id): Path<String>,
) -> Response {
    match service.financial_summary(&StudentId(student_id)) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reconcile_handler(
    State(service): State<Arc<BillingService>>,
    Path(student_id): Path<String>,
) -> Response {
    match service.reconcile_student(&StudentId(student_id)) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn archive_handler(
    State(service): State<Arc<BillingService>>,
    Path(student_id): Path<String>,
) -> Response {
    let disposition = format!("attachment; filename=\"invoices-{student_id}.zip\"");
    match service.invoice_archive(&StudentId(student_id)) {
        Ok(batch) => {
            let failed = batch
                .failures
                .iter()
                .map(|failure| failure.invoice_number.0.as_str())
                .collect::<Vec<_>>()
                .join(",");
            let failed = HeaderValue::from_str(&failed)
                .unwrap_or_else(|_| HeaderValue::from(batch.failures.len()));
            let disposition = HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

            let mut response = (StatusCode::OK, batch.archive).into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
            headers.insert(header::CONTENT_DISPOSITION, disposition);
            headers.insert(RENDER_FAILURES_HEADER, failed);
            response
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn document_handler(
    State(service): State<Arc<BillingService>>,
    Path(number): Path<String>,
) -> Response {
    match service.invoice_document(&InvoiceNumber(number)) {
        Ok((invoice, bytes)) => {
            let disposition = HeaderValue::from_str(&format!(
                "inline; filename=\"invoice-{}.pdf\"",
                invoice.number
            ))
            .unwrap_or_else(|_| HeaderValue::from_static("inline"));
            let mut response = (StatusCode::OK, bytes).into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
            headers.insert(header::CONTENT_DISPOSITION, disposition);
            response
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: BillingError) -> Response {
    AppError::from(err).into_response()
}
