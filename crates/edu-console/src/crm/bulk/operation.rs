use serde::{Deserialize, Serialize};

use crate::crm::domain::CourseId;

/// One logical action applied to every student in a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BulkOperation {
    Enroll { course_id: CourseId },
    Unenroll { course_id: CourseId },
    Tag { name: String, color: String },
    Archive,
    Email { subject: String, body: String },
    ExportReport { columns: Vec<String> },
}

impl BulkOperation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Enroll { .. } => "enroll",
            Self::Unenroll { .. } => "unenroll",
            Self::Tag { .. } => "tag",
            Self::Archive => "archive",
            Self::Email { .. } => "email",
            Self::ExportReport { .. } => "export_report",
        }
    }

    /// Rejects malformed parameters before any per-student call is issued.
    pub fn validate(&self) -> Result<(), BulkValidationError> {
        match self {
            Self::Enroll { course_id } | Self::Unenroll { course_id } => {
                if course_id.0.trim().is_empty() {
                    return Err(BulkValidationError::EmptyCourseId);
                }
            }
            Self::Tag { name, color } => {
                if name.trim().is_empty() {
                    return Err(BulkValidationError::EmptyTagName);
                }
                if !is_hex_color(color) {
                    return Err(BulkValidationError::InvalidTagColor(color.clone()));
                }
            }
            Self::Email { subject, .. } => {
                if subject.trim().is_empty() {
                    return Err(BulkValidationError::EmptySubject);
                }
            }
            Self::ExportReport { columns } => {
                if columns.is_empty() {
                    return Err(BulkValidationError::EmptyColumns);
                }
            }
            Self::Archive => {}
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkValidationError {
    #[error("course id must not be empty")]
    EmptyCourseId,
    #[error("tag name must not be empty")]
    EmptyTagName,
    #[error("tag color '{0}' must be a #rgb or #rrggbb hex value")]
    InvalidTagColor(String),
    #[error("email subject must not be empty")]
    EmptySubject,
    #[error("export requires at least one column")]
    EmptyColumns,
}
