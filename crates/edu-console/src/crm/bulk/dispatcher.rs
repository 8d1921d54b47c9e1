use std::sync::Arc;

use tracing::{info, warn};

use super::operation::{BulkOperation, BulkValidationError};
use super::result::{BulkOperationResult, ItemOutcome};
use crate::billing::ledger::BillingLedger;
use crate::crm::domain::{StudentId, StudentRecord, StudentStatus, Tag};
use crate::crm::repository::{DirectoryError, EnrollmentGateway, Mailer, StudentDirectory};
use crate::crm::roster::{Roster, RosterEntry};
use crate::crm::selection::SelectionSet;
use crate::crm::state::RosterViewState;
use crate::export::{self, ExportScope};

/// Runs `call` once per id on the blocking pool and waits for every call to settle.
///
/// Results come back in `ids` order regardless of completion order. A call that panics
/// is reported as that id's failure.
pub async fn settle_all<T, F>(ids: Vec<StudentId>, call: F) -> Vec<(StudentId, Result<T, String>)>
where
    T: Send + 'static,
    F: Fn(&StudentId) -> Result<T, String> + Send + Sync + 'static,
{
    let call = Arc::new(call);
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let call = Arc::clone(&call);
            let task_id = id.clone();
            let handle = tokio::task::spawn_blocking(move || call(&task_id));
            (id, handle)
        })
        .collect();

    let mut settled = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(err) => Err(format!("task did not complete: {err}")),
        };
        settled.push((id, outcome));
    }
    settled
}

/// Fans bulk operations out over a selection against the external collaborators.
#[derive(Clone)]
pub struct BulkDispatcher {
    directory: Arc<dyn StudentDirectory>,
    enrollments: Arc<dyn EnrollmentGateway>,
    mailer: Arc<dyn Mailer>,
    ledger: Arc<dyn BillingLedger>,
}

impl BulkDispatcher {
    pub fn new(
        directory: Arc<dyn StudentDirectory>,
        enrollments: Arc<dyn EnrollmentGateway>,
        mailer: Arc<dyn Mailer>,
        ledger: Arc<dyn BillingLedger>,
    ) -> Self {
        Self {
            directory,
            enrollments,
            mailer,
            ledger,
        }
    }

    /// Apply `operation` to every selected student.
    ///
    /// Only parameter validation can fail the dispatch as a whole; per-student failures are
    /// counted in the returned result. Clearing the selection afterwards is the caller's job.
    pub async fn dispatch(
        &self,
        selection: &SelectionSet,
        operation: BulkOperation,
    ) -> Result<BulkOperationResult, BulkValidationError> {
        operation.validate()?;

        let label = operation.label();
        let ids = selection.to_vec();
        info!(operation = label, selected = ids.len(), "bulk dispatch started");

        let result = match operation {
            BulkOperation::Enroll { course_id } => {
                let gateway = Arc::clone(&self.enrollments);
                let outcomes = settle_all(ids, move |id| {
                    gateway
                        .enroll_student_in_course(id, &course_id)
                        .map(|()| ItemOutcome::Applied)
                        .map_err(|err| err.to_string())
                })
                .await;
                BulkOperationResult::from_outcomes(label, &outcomes)
            }
            BulkOperation::Unenroll { course_id } => {
                let gateway = Arc::clone(&self.enrollments);
                let outcomes = settle_all(ids, move |id| {
                    gateway
                        .unenroll_student_from_course(id, &course_id)
                        .map(|()| ItemOutcome::Applied)
                        .map_err(|err| err.to_string())
                })
                .await;
                BulkOperationResult::from_outcomes(label, &outcomes)
            }
            BulkOperation::Tag { name, color } => {
                let tag = Tag::new(name.trim(), color.to_ascii_lowercase());
                let directory = Arc::clone(&self.directory);
                let outcomes = settle_all(ids, move |id| {
                    match directory.add_tag(id, tag.clone()) {
                        Ok(true) => Ok(ItemOutcome::Applied),
                        Ok(false) => Ok(ItemOutcome::Unchanged),
                        Err(err) => Err(err.to_string()),
                    }
                })
                .await;
                BulkOperationResult::from_outcomes(label, &outcomes)
            }
            BulkOperation::Archive => {
                let directory = Arc::clone(&self.directory);
                let outcomes = settle_all(ids, move |id| archive_one(directory.as_ref(), id)).await;
                BulkOperationResult::from_outcomes(label, &outcomes)
            }
            BulkOperation::Email { subject, body } => {
                let directory = Arc::clone(&self.directory);
                let mailer = Arc::clone(&self.mailer);
                let outcomes = settle_all(ids, move |id| {
                    let student = fetch_existing(directory.as_ref(), id)?;
                    mailer
                        .send_email(&student.email, &subject, &body)
                        .map(|()| ItemOutcome::Applied)
                        .map_err(|err| err.to_string())
                })
                .await;
                BulkOperationResult::from_outcomes(label, &outcomes)
            }
            BulkOperation::ExportReport { columns } => {
                self.export_report(label, ids, columns).await
            }
        };

        for error in &result.errors {
            warn!(
                operation = label,
                student_id = %error.student_id,
                error = %error.message,
                "bulk item failed"
            );
        }
        info!(
            operation = label,
            attempted = result.attempted,
            succeeded = result.succeeded,
            unchanged = result.unchanged,
            failed = result.failed,
            "bulk dispatch finished"
        );

        Ok(result)
    }

    async fn export_report(
        &self,
        label: &'static str,
        ids: Vec<StudentId>,
        columns: Vec<String>,
    ) -> BulkOperationResult {
        let directory = Arc::clone(&self.directory);
        let ledger = Arc::clone(&self.ledger);
        let fetched = settle_all(ids, move |id| {
            let student = fetch_existing(directory.as_ref(), id)?;
            let payments = ledger
                .list_payments_for(id)
                .map_err(|err| err.to_string())?;
            let entry = Roster::assemble(vec![student], &payments)
                .entries()
                .first()
                .cloned();
            entry.ok_or_else(|| format!("student {id} could not be assembled"))
        })
        .await;

        let mut entries: Vec<RosterEntry> = Vec::new();
        let outcomes: Vec<(StudentId, Result<ItemOutcome, String>)> = fetched
            .into_iter()
            .map(|(id, outcome)| {
                let outcome = outcome.map(|entry| {
                    entries.push(entry);
                    ItemOutcome::Applied
                });
                (id, outcome)
            })
            .collect();

        let roster = Roster::from_entries(entries);
        let state = RosterViewState::default();
        let report = export::project(&roster, ExportScope::All, &state, &columns)
            .and_then(|rows| export::write_csv(&rows, &columns));
        if let Err(err) = &report {
            warn!(operation = label, error = %err, "export report could not be serialized");
        }
        BulkOperationResult::from_outcomes(label, &outcomes).with_report(report)
    }
}

fn fetch_existing(
    directory: &dyn StudentDirectory,
    id: &StudentId,
) -> Result<StudentRecord, String> {
    directory
        .fetch_student(id)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| DirectoryError::NotFound(id.clone()).to_string())
}

fn archive_one(directory: &dyn StudentDirectory, id: &StudentId) -> Result<ItemOutcome, String> {
    let student = fetch_existing(directory, id)?;
    if student.status == StudentStatus::Inactive {
        return Ok(ItemOutcome::Unchanged);
    }
    directory
        .update_student_status(id, StudentStatus::Inactive)
        .map(|()| ItemOutcome::Applied)
        .map_err(|err| err.to_string())
}
