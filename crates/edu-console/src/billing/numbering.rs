use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, NaiveDate};

use super::domain::{InvoiceNumber, InvoiceRecord};

/// Hands out `<prefix>-<year>-<sequence>` invoice numbers.
///
/// The sequence is shared across years and only ever grows, so a number is never reissued
/// by the same process. Seed it from the ledger so restarts continue after the highest
/// number already stored.
#[derive(Debug)]
pub struct InvoiceNumberer {
    prefix: String,
    next: AtomicU64,
}

impl InvoiceNumberer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    pub fn seeded_from<'a>(
        prefix: impl Into<String>,
        existing: impl IntoIterator<Item = &'a InvoiceRecord>,
    ) -> Self {
        let numberer = Self::new(prefix);
        numberer.observe(existing);
        numberer
    }

    /// Moves the sequence past every number in `existing` carrying this prefix.
    pub fn observe<'a>(&self, existing: impl IntoIterator<Item = &'a InvoiceRecord>) {
        let highest = existing
            .into_iter()
            .filter_map(|invoice| parse_sequence(&self.prefix, &invoice.number))
            .max();
        if let Some(highest) = highest {
            self.next.fetch_max(highest + 1, Ordering::SeqCst);
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn allocate(&self, issued_on: NaiveDate) -> InvoiceNumber {
        let sequence = self.next.fetch_add(1, Ordering::SeqCst);
        InvoiceNumber(format!(
            "{}-{:04}-{sequence:05}",
            self.prefix,
            issued_on.year()
        ))
    }
}

/// Sequence part of `number` when it follows the `<prefix>-<year>-<sequence>` shape.
pub fn parse_sequence(prefix: &str, number: &InvoiceNumber) -> Option<u64> {
    let rest = number.0.strip_prefix(prefix)?.strip_prefix('-')?;
    let (year, sequence) = rest.split_once('-')?;
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    sequence.parse().ok()
}
