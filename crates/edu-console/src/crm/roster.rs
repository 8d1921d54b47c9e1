use std::collections::HashMap;

use serde::Serialize;

use super::domain::{StudentId, StudentRecord};
use crate::billing::domain::PaymentRecord;

/// Roster row with the revenue aggregate derived from payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub record: StudentRecord,
    /// Sum of completed payments in minor units. Never stored on the record.
    pub total_paid: i64,
}

impl RosterEntry {
    pub fn id(&self) -> &StudentId {
        &self.record.id
    }
}

/// Every student known to the console, in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Joins students with their payments, recomputing `total_paid` from completed ones.
    pub fn assemble(students: Vec<StudentRecord>, payments: &[PaymentRecord]) -> Self {
        let mut totals: HashMap<&StudentId, i64> = HashMap::new();
        for payment in payments.iter().filter(|payment| payment.is_completed()) {
            *totals.entry(&payment.student_id).or_default() += payment.amount;
        }

        let entries = students
            .into_iter()
            .map(|record| {
                let total_paid = totals.get(&record.id).copied().unwrap_or(0);
                RosterEntry { record, total_paid }
            })
            .collect();

        Self { entries }
    }

    pub fn from_entries(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn get(&self, id: &StudentId) -> Option<&RosterEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
