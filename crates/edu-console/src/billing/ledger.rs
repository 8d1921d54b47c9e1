use super::domain::{InvoiceNumber, InvoiceRecord, PaymentId, PaymentRecord};
use crate::crm::domain::StudentId;

/// Payment and invoice store. Writes are serialized by the store itself.
pub trait BillingLedger: Send + Sync {
    fn list_all_payments(&self) -> Result<Vec<PaymentRecord>, LedgerError>;
    fn list_payments_for(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<PaymentRecord>, LedgerError>;
    fn list_invoices_for(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<InvoiceRecord>, LedgerError>;
    fn list_all_invoices(&self) -> Result<Vec<InvoiceRecord>, LedgerError>;
    fn record_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord, LedgerError>;
    /// Must reject a second invoice for the same `transaction_id` and a reused number.
    fn create_invoice(&self, invoice: InvoiceRecord) -> Result<InvoiceRecord, LedgerError>;
    fn fetch_invoice(&self, number: &InvoiceNumber) -> Result<Option<InvoiceRecord>, LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("payment {0} already recorded")]
    DuplicatePayment(PaymentId),
    #[error("payment {0} already has an invoice")]
    TransactionAlreadyInvoiced(PaymentId),
    #[error("invoice number {0} already in use")]
    InvoiceNumberCollision(InvoiceNumber),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
