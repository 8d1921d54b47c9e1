//! Payments, invoices and the reconciliation that keeps them in step.

pub mod domain;
pub mod ledger;
pub mod numbering;
pub mod plan;
pub mod reconcile;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    format_amount, format_minor_units, InvoiceNumber, InvoiceRecord, InvoiceSpec, InvoiceStatus,
    PaymentId, PaymentMethod, PaymentRecord, PaymentStatus,
};
pub use ledger::{BillingLedger, LedgerError};
pub use numbering::InvoiceNumberer;
pub use plan::{Installment, PaymentPlan};
pub use reconcile::{reconcile, TaxPolicy};
pub use router::billing_router;
pub use service::{
    BillingError, BillingService, FinancialSummary, ReconciliationFailure, ReconciliationReport,
};
