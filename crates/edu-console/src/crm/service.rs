use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::bulk::{BulkDispatcher, BulkOperation, BulkOperationResult, BulkValidationError};
use super::repository::{DirectoryError, EnrollmentGateway, Mailer, StudentDirectory};
use super::roster::{Roster, RosterEntry};
use super::state::RosterViewState;
use crate::billing::ledger::{BillingLedger, LedgerError};
use crate::export::{self, ExportError, ExportScope};

/// Service composing the roster store, the payment ledger and the bulk dispatcher.
pub struct StudentRelationshipService {
    directory: Arc<dyn StudentDirectory>,
    ledger: Arc<dyn BillingLedger>,
    dispatcher: BulkDispatcher,
}

/// Outcome of a bulk action plus the state the console moves to afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct BulkCompletion {
    pub result: BulkOperationResult,
    pub state: RosterViewState,
    /// Refreshed view; empty when `refresh_error` is set.
    pub view: Vec<RosterEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

impl StudentRelationshipService {
    pub fn new(
        directory: Arc<dyn StudentDirectory>,
        enrollments: Arc<dyn EnrollmentGateway>,
        mailer: Arc<dyn Mailer>,
        ledger: Arc<dyn BillingLedger>,
    ) -> Self {
        let dispatcher = BulkDispatcher::new(
            Arc::clone(&directory),
            enrollments,
            mailer,
            Arc::clone(&ledger),
        );
        Self {
            directory,
            ledger,
            dispatcher,
        }
    }

    /// Loads the roster with `total_paid` recomputed from the ledger.
    pub fn roster(&self) -> Result<Roster, CrmError> {
        let students = self.directory.list_students()?;
        let payments = self.ledger.list_all_payments()?;
        debug!(
            students = students.len(),
            payments = payments.len(),
            "roster assembled"
        );
        Ok(Roster::assemble(students, &payments))
    }

    pub fn view(&self, state: &RosterViewState) -> Result<Vec<RosterEntry>, CrmError> {
        let roster = self.roster()?;
        Ok(state.view(&roster).into_iter().cloned().collect())
    }

    /// Runs `operation` over the selection, then clears it and refreshes the view,
    /// whatever the per-student outcomes were.
    ///
    /// Only validation fails the call. Once the dispatch ran, its result is returned even
    /// when the refresh cannot load the roster.
    pub async fn bulk(
        &self,
        state: RosterViewState,
        operation: BulkOperation,
    ) -> Result<BulkCompletion, CrmError> {
        let result = self.dispatcher.dispatch(&state.selection, operation).await?;
        let state = state.clear_selection();
        let (view, refresh_error) = match self.view(&state) {
            Ok(view) => (view, None),
            Err(err) => {
                warn!(
                    operation = result.operation,
                    error = %err,
                    "view refresh failed after bulk dispatch"
                );
                (Vec::new(), Some(err.to_string()))
            }
        };
        Ok(BulkCompletion {
            result,
            state,
            view,
            refresh_error,
        })
    }

    pub fn export_csv(
        &self,
        state: &RosterViewState,
        scope: ExportScope,
        columns: &[String],
    ) -> Result<String, CrmError> {
        if columns.is_empty() {
            return Err(ExportError::EmptyColumns.into());
        }
        let roster = self.roster()?;
        let rows = export::project(&roster, scope, state, columns)?;
        Ok(export::write_csv(&rows, columns)?)
    }
}

/// Error raised by the relationship service.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Validation(#[from] BulkValidationError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
