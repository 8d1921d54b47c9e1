use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::crm::domain::StudentId;

/// Payment identifier; invoices reference it as their `transaction_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable invoice number such as `INV-2026-00042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(pub String);

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Cash,
    Other,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Card => "Card",
            Self::BankTransfer => "Bank transfer",
            Self::Cash => "Cash",
            Self::Other => "Other",
        }
    }
}

/// Recorded payment. Amounts are integer minor units (cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub student_id: StudentId,
    pub amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub number: InvoiceNumber,
    pub student_id: StudentId,
    pub transaction_id: PaymentId,
    pub issued_on: NaiveDate,
    pub amount: i64,
    pub tax_amount: i64,
    pub total: i64,
    pub currency: String,
    pub status: InvoiceStatus,
}

/// Invoice the reconciliation engine wants created for an uninvoiced payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSpec {
    pub student_id: StudentId,
    pub transaction_id: PaymentId,
    pub amount: i64,
    pub tax_amount: i64,
    pub currency: String,
    pub paid_on: NaiveDate,
}

impl InvoiceSpec {
    pub fn total(&self) -> i64 {
        self.amount + self.tax_amount
    }

    /// Reconciled payments are already settled, so the invoice is issued as paid.
    pub fn into_record(self, number: InvoiceNumber) -> InvoiceRecord {
        let total = self.total();
        InvoiceRecord {
            number,
            student_id: self.student_id,
            transaction_id: self.transaction_id,
            issued_on: self.paid_on,
            amount: self.amount,
            tax_amount: self.tax_amount,
            total,
            currency: self.currency,
            status: InvoiceStatus::Paid,
        }
    }
}

/// Formats minor units as `1234.50`.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Formats minor units as `1234.50 EUR`.
pub fn format_amount(amount: i64, currency: &str) -> String {
    format!("{} {currency}", format_minor_units(amount))
}
