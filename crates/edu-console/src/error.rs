use crate::billing::BillingError;
use crate::config::ConfigError;
use crate::crm::CrmError;
use crate::export::ExportError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Crm(CrmError),
    Billing(BillingError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Crm(CrmError::Validation(_))
            | AppError::Crm(CrmError::Export(ExportError::EmptyColumns))
            | AppError::Billing(BillingError::Validation(_))
            | AppError::Billing(BillingError::Render(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Billing(BillingError::InvoiceNotFound(_))
            | AppError::Billing(BillingError::StudentNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Crm(_)
            | AppError::Billing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Crm(err) => write!(f, "student console error: {}", err),
            AppError::Billing(err) => write!(f, "billing error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Crm(err) => Some(err),
            AppError::Billing(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CrmError> for AppError {
    fn from(value: CrmError) -> Self {
        Self::Crm(value)
    }
}

impl From<BillingError> for AppError {
    fn from(value: BillingError) -> Self {
        Self::Billing(value)
    }
}
