use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{InvoiceNumber, InvoiceRecord, PaymentId, PaymentRecord, PaymentStatus};
use super::ledger::{BillingLedger, LedgerError};
use super::numbering::InvoiceNumberer;
use super::reconcile::{reconcile, TaxPolicy};
use crate::config::{BillingConfig, IssuerConfig};
use crate::crm::domain::{StudentId, StudentProfile};
use crate::crm::repository::{DirectoryError, StudentDirectory};
use crate::documents::{package_batch, render_invoice, PackageError, PackagedBatch, RenderError};

/// Service keeping payments, invoices and invoice documents consistent per student.
pub struct BillingService {
    ledger: Arc<dyn BillingLedger>,
    directory: Arc<dyn StudentDirectory>,
    numberer: InvoiceNumberer,
    tax: TaxPolicy,
    currency: String,
    issuer: IssuerConfig,
}

/// One invoice a reconciliation pass could not create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationFailure {
    pub transaction_id: PaymentId,
    pub invoice_number: InvoiceNumber,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub student_id: StudentId,
    pub created: Vec<InvoiceRecord>,
    /// Payments another pass invoiced between our read and our write.
    pub already_invoiced: Vec<PaymentId>,
    pub failed: Vec<ReconciliationFailure>,
}

impl ReconciliationReport {
    pub fn is_converged(&self) -> bool {
        self.created.is_empty() && self.failed.is_empty()
    }
}

/// Per-student money view. Amounts are minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialSummary {
    pub student_id: StudentId,
    pub currency: String,
    pub total_paid: i64,
    pub pending: i64,
    pub refunded: i64,
    pub failed: i64,
    pub payment_count: usize,
    pub invoice_count: usize,
    pub uninvoiced_payments: usize,
}

impl BillingService {
    /// Builds the service, seeding invoice numbering from what the ledger already holds.
    pub fn new(
        ledger: Arc<dyn BillingLedger>,
        directory: Arc<dyn StudentDirectory>,
        billing: &BillingConfig,
        issuer: IssuerConfig,
    ) -> Result<Self, BillingError> {
        let existing = ledger.list_all_invoices()?;
        let numberer = InvoiceNumberer::seeded_from(billing.invoice_prefix.clone(), &existing);
        Ok(Self {
            ledger,
            directory,
            numberer,
            tax: TaxPolicy::from_config(billing),
            currency: billing.default_currency.clone(),
            issuer,
        })
    }

    /// Creates every invoice the student's completed payments are missing.
    ///
    /// Each invoice is created independently. A racing pass that invoiced the payment first
    /// shows up in `already_invoiced`; any other ledger rejection fails only that invoice.
    pub fn reconcile_student(
        &self,
        student_id: &StudentId,
    ) -> Result<ReconciliationReport, BillingError> {
        let payments = self.ledger.list_payments_for(student_id)?;
        let invoices = self.ledger.list_invoices_for(student_id)?;
        let specs = reconcile(&payments, &invoices, &self.tax);

        let mut report = ReconciliationReport {
            student_id: student_id.clone(),
            created: Vec::new(),
            already_invoiced: Vec::new(),
            failed: Vec::new(),
        };

        for spec in specs {
            let transaction_id = spec.transaction_id.clone();
            let number = self.numberer.allocate(spec.paid_on);
            match self.ledger.create_invoice(spec.into_record(number.clone())) {
                Ok(invoice) => report.created.push(invoice),
                Err(LedgerError::TransactionAlreadyInvoiced(payment)) => {
                    report.already_invoiced.push(payment)
                }
                Err(err) => {
                    if matches!(err, LedgerError::InvoiceNumberCollision(_)) {
                        match self.ledger.list_all_invoices() {
                            Ok(existing) => self.numberer.observe(&existing),
                            Err(reread) => warn!(
                                student_id = %student_id,
                                error = %reread,
                                "invoice numbers could not be re-read after a collision"
                            ),
                        }
                    }
                    warn!(
                        student_id = %student_id,
                        transaction_id = %transaction_id,
                        invoice = %number,
                        error = %err,
                        "invoice creation failed"
                    );
                    report.failed.push(ReconciliationFailure {
                        transaction_id,
                        invoice_number: number,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            student_id = %student_id,
            created = report.created.len(),
            already_invoiced = report.already_invoiced.len(),
            failed = report.failed.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Totals are only meaningful in one currency; a student paying in several is rejected.
    pub fn financial_summary(
        &self,
        student_id: &StudentId,
    ) -> Result<FinancialSummary, BillingError> {
        let payments = self.ledger.list_payments_for(student_id)?;
        let invoices = self.ledger.list_invoices_for(student_id)?;
        let invoiced: HashSet<&PaymentId> =
            invoices.iter().map(|invoice| &invoice.transaction_id).collect();

        let currency = match payments.first() {
            Some(first) => first.currency.clone(),
            None => self.currency.clone(),
        };
        if let Some(other) = payments.iter().find(|payment| payment.currency != currency) {
            return Err(BillingError::Validation(format!(
                "student {student_id} has payments in {currency} and {}",
                other.currency
            )));
        }

        let mut summary = FinancialSummary {
            student_id: student_id.clone(),
            currency,
            total_paid: 0,
            pending: 0,
            refunded: 0,
            failed: 0,
            payment_count: payments.len(),
            invoice_count: invoices.len(),
            uninvoiced_payments: 0,
        };
        for payment in &payments {
            match payment.status {
                PaymentStatus::Completed => {
                    summary.total_paid += payment.amount;
                    if !invoiced.contains(&payment.id) {
                        summary.uninvoiced_payments += 1;
                    }
                }
                PaymentStatus::Pending => summary.pending += payment.amount,
                PaymentStatus::Refunded => summary.refunded += payment.amount,
                PaymentStatus::Failed => summary.failed += payment.amount,
            }
        }
        Ok(summary)
    }

    pub fn record_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord, BillingError> {
        if payment.amount <= 0 {
            return Err(BillingError::Validation(format!(
                "payment {} amount must be positive",
                payment.id
            )));
        }
        if payment.currency.trim().is_empty() {
            return Err(BillingError::Validation(format!(
                "payment {} has no currency",
                payment.id
            )));
        }
        let stored = self.ledger.record_payment(payment)?;
        info!(
            payment_id = %stored.id,
            student_id = %stored.student_id,
            amount = stored.amount,
            "payment recorded"
        );
        Ok(stored)
    }

    pub fn invoice_archive(&self, student_id: &StudentId) -> Result<PackagedBatch, BillingError> {
        self.invoice_archive_for(std::slice::from_ref(student_id))
    }

    /// Packages the invoices of every listed student, fetching all profiles in one call.
    /// Repeated ids are packaged once.
    pub fn invoice_archive_for(
        &self,
        student_ids: &[StudentId],
    ) -> Result<PackagedBatch, BillingError> {
        let mut seen = HashSet::new();
        let student_ids: Vec<StudentId> = student_ids
            .iter()
            .filter(|student_id| seen.insert(*student_id))
            .cloned()
            .collect();

        let mut invoices = Vec::new();
        for student_id in &student_ids {
            invoices.extend(self.ledger.list_invoices_for(student_id)?);
        }
        invoices.sort_by(|a, b| a.number.cmp(&b.number));

        let profiles = self.profiles_for(&student_ids)?;
        let batch = package_batch(&invoices, &profiles, &self.issuer)?;
        info!(
            students = student_ids.len(),
            included = batch.included.len(),
            failed = batch.failures.len(),
            "invoice archive built"
        );
        Ok(batch)
    }

    /// Renders one stored invoice as a PDF.
    pub fn invoice_document(
        &self,
        number: &InvoiceNumber,
    ) -> Result<(InvoiceRecord, Vec<u8>), BillingError> {
        let invoice = self
            .ledger
            .fetch_invoice(number)?
            .ok_or_else(|| BillingError::InvoiceNotFound(number.clone()))?;
        let profile = self
            .profiles_for(std::slice::from_ref(&invoice.student_id))?
            .remove(&invoice.student_id)
            .ok_or_else(|| BillingError::StudentNotFound(invoice.student_id.clone()))?;
        let bytes = render_invoice(&invoice, &profile, &self.issuer)?;
        Ok((invoice, bytes))
    }

    fn profiles_for(
        &self,
        student_ids: &[StudentId],
    ) -> Result<HashMap<StudentId, StudentProfile>, BillingError> {
        Ok(self
            .directory
            .list_profiles_by_ids(student_ids)?
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect())
    }
}

/// Error raised by the billing service.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("{0}")]
    Validation(String),
    #[error("invoice {0} not found")]
    InvoiceNotFound(InvoiceNumber),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Package(#[from] PackageError),
}
