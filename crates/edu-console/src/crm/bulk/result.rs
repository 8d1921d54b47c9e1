use serde::Serialize;

use crate::crm::domain::StudentId;
use crate::export::ExportError;

/// What a successful per-student call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Applied,
    /// The student was already in the target state.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItemError {
    pub student_id: StudentId,
    pub message: String,
}

/// Aggregate of one bulk dispatch. `unchanged` is a subset of `succeeded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOperationResult {
    pub operation: &'static str,
    pub attempted: usize,
    pub succeeded: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub errors: Vec<BulkItemError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_csv: Option<String>,
    /// Set when the report artifact could not be built from the fetched records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<String>,
}

impl BulkOperationResult {
    pub fn from_outcomes(
        operation: &'static str,
        outcomes: &[(StudentId, Result<ItemOutcome, String>)],
    ) -> Self {
        let mut result = Self {
            operation,
            attempted: outcomes.len(),
            succeeded: 0,
            unchanged: 0,
            failed: 0,
            errors: Vec::new(),
            report_csv: None,
            report_error: None,
        };

        for (student_id, outcome) in outcomes {
            match outcome {
                Ok(ItemOutcome::Applied) => result.succeeded += 1,
                Ok(ItemOutcome::Unchanged) => {
                    result.succeeded += 1;
                    result.unchanged += 1;
                }
                Err(message) => {
                    result.failed += 1;
                    result.errors.push(BulkItemError {
                        student_id: student_id.clone(),
                        message: message.clone(),
                    });
                }
            }
        }

        result
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0 && self.report_error.is_none()
    }

    pub fn with_report(mut self, report: Result<String, ExportError>) -> Self {
        match report {
            Ok(csv) => self.report_csv = Some(csv),
            Err(err) => self.report_error = Some(err.to_string()),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes() -> Vec<(StudentId, Result<ItemOutcome, String>)> {
        vec![
            (StudentId("s1".to_string()), Ok(ItemOutcome::Applied)),
            (StudentId("s2".to_string()), Ok(ItemOutcome::Unchanged)),
            (StudentId("s3".to_string()), Err("timeout".to_string())),
        ]
    }

    #[test]
    fn unchanged_items_count_as_succeeded() {
        let result = BulkOperationResult::from_outcomes("tag", &outcomes());
        assert_eq!(result.attempted, 3);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.unchanged, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].student_id.0, "s3");
    }

    #[test]
    fn report_failure_is_carried_on_the_result() {
        let result = BulkOperationResult::from_outcomes("export_report", &outcomes()[..1])
            .with_report(Err(ExportError::Buffer("writer closed".to_string())));

        assert_eq!(result.succeeded, 1);
        assert!(result.report_csv.is_none());
        assert_eq!(
            result.report_error.as_deref(),
            Some("export buffer could not be finalized: writer closed")
        );
        assert!(!result.is_complete_success());

        let json = serde_json::to_value(&result).expect("result serializes");
        assert_eq!(json["report_error"], "export buffer could not be finalized: writer closed");
        assert!(json.get("report_csv").is_none());
    }

    #[test]
    fn built_report_is_attached() {
        let result = BulkOperationResult::from_outcomes("export_report", &outcomes()[..1])
            .with_report(Ok("ID\ns1\n".to_string()));
        assert_eq!(result.report_csv.as_deref(), Some("ID\ns1\n"));
        assert!(result.report_error.is_none());
        assert!(result.is_complete_success());
    }
}
