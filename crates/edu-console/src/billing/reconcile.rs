use std::collections::HashSet;

use super::domain::{InvoiceRecord, InvoiceSpec, PaymentId, PaymentRecord};
use crate::config::BillingConfig;

/// Flat tax applied on top of the paid amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaxPolicy {
    /// Basis points; 2000 = 20%.
    pub rate_bps: u32,
}

impl TaxPolicy {
    pub const fn exempt() -> Self {
        Self { rate_bps: 0 }
    }

    pub const fn with_rate_bps(rate_bps: u32) -> Self {
        Self { rate_bps }
    }

    pub fn from_config(config: &BillingConfig) -> Self {
        Self::with_rate_bps(config.tax_rate_bps)
    }

    /// Tax on `amount` minor units, rounded half away from zero.
    pub fn tax_for(&self, amount: i64) -> i64 {
        if self.rate_bps == 0 {
            return 0;
        }
        let scaled = i128::from(amount) * i128::from(self.rate_bps);
        let rounded = if scaled >= 0 {
            (scaled + 5_000) / 10_000
        } else {
            (scaled - 5_000) / 10_000
        };
        i64::try_from(rounded).unwrap_or(if rounded > 0 { i64::MAX } else { i64::MIN })
    }
}

/// Computes the invoices missing for `payments`.
///
/// Only completed payments are invoiceable. A payment already referenced by an invoice's
/// `transaction_id` is skipped, so persisting the output and running again yields nothing.
/// Output is ordered by payment creation time, then payment id.
pub fn reconcile(
    payments: &[PaymentRecord],
    invoices: &[InvoiceRecord],
    tax: &TaxPolicy,
) -> Vec<InvoiceSpec> {
    let invoiced: HashSet<&PaymentId> = invoices
        .iter()
        .map(|invoice| &invoice.transaction_id)
        .collect();

    let mut missing: Vec<&PaymentRecord> = payments
        .iter()
        .filter(|payment| payment.is_completed())
        .filter(|payment| !invoiced.contains(&payment.id))
        .collect();
    missing.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    missing
        .into_iter()
        .map(|payment| InvoiceSpec {
            student_id: payment.student_id.clone(),
            transaction_id: payment.id.clone(),
            amount: payment.amount,
            tax_amount: tax.tax_for(payment.amount),
            currency: payment.currency.clone(),
            paid_on: payment.created_at.date_naive(),
        })
        .collect()
}
