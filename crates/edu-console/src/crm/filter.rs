use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{EnrollmentStatus, FormationType, StudentStatus};
use super::roster::{Roster, RosterEntry};

/// Conjunction of optional roster predicates. An absent field places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub status: Option<StudentStatus>,
    pub enrollment_status: Option<EnrollmentStatus>,
    pub formation_type: Option<FormationType>,
    pub registered_from: Option<NaiveDate>,
    pub registered_to: Option<NaiveDate>,
    pub min_total_paid: Option<i64>,
    pub max_total_paid: Option<i64>,
}

impl FilterSpec {
    pub fn matches(&self, entry: &RosterEntry) -> bool {
        let record = &entry.record;

        if self.status.is_some_and(|status| record.status != status) {
            return false;
        }
        if let Some(status) = self.enrollment_status {
            if !record.enrollments.iter().any(|e| e.status == status) {
                return false;
            }
        }
        if let Some(kind) = self.formation_type {
            if !record.enrollments.iter().any(|e| e.formation_type == kind) {
                return false;
            }
        }
        if self
            .registered_from
            .is_some_and(|from| record.registered_on < from)
        {
            return false;
        }
        if self.registered_to.is_some_and(|to| record.registered_on > to) {
            return false;
        }
        if self.min_total_paid.is_some_and(|min| entry.total_paid < min) {
            return false;
        }
        if self.max_total_paid.is_some_and(|max| entry.total_paid > max) {
            return false;
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    FullName,
    Email,
    Phone,
    Status,
    RegisteredOn,
    TotalPaid,
    EnrollmentCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub const fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: SortColumn,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub const fn ascending(column: SortColumn) -> Self {
        Self {
            column,
            direction: SortDirection::Ascending,
        }
    }

    /// Header-click semantics: the same column flips direction, a new column starts ascending.
    pub fn select(current: Option<SortSpec>, column: SortColumn) -> SortSpec {
        match current {
            Some(spec) if spec.column == column => SortSpec {
                column,
                direction: spec.direction.flipped(),
            },
            _ => SortSpec::ascending(column),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SortKey {
    Numeric(i64),
    Text(String),
}

impl SortKey {
    fn of(entry: &RosterEntry, column: SortColumn) -> Self {
        let record = &entry.record;
        match column {
            SortColumn::TotalPaid => Self::Numeric(entry.total_paid),
            SortColumn::EnrollmentCount => Self::Numeric(record.enrollments.len() as i64),
            SortColumn::FullName => Self::Text(record.full_name.to_lowercase()),
            SortColumn::Email => Self::Text(record.email.to_lowercase()),
            SortColumn::Phone => Self::Text(record.phone.clone().unwrap_or_default()),
            SortColumn::Status => Self::Text(record.status.label().to_string()),
            SortColumn::RegisteredOn => Self::Text(record.registered_on.to_string()),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            // A column always yields one key kind.
            (Self::Numeric(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Numeric(_)) => Ordering::Greater,
        }
    }
}

/// Case-insensitive substring match over name, email and phone. Blank search matches all.
pub fn matches_search(entry: &RosterEntry, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    let record = &entry.record;
    record.full_name.to_lowercase().contains(&needle)
        || record.email.to_lowercase().contains(&needle)
        || record
            .phone
            .as_deref()
            .is_some_and(|phone| phone.to_lowercase().contains(&needle))
}

/// Produces the filtered view. Ties keep roster order.
pub fn evaluate<'a>(
    roster: &'a Roster,
    filters: &FilterSpec,
    search: &str,
    sort: Option<&SortSpec>,
) -> Vec<&'a RosterEntry> {
    let mut view: Vec<&RosterEntry> = roster
        .entries()
        .iter()
        .filter(|entry| filters.matches(entry) && matches_search(entry, search))
        .collect();

    if let Some(spec) = sort {
        let mut keyed: Vec<(SortKey, &RosterEntry)> = view
            .into_iter()
            .map(|entry| (SortKey::of(entry, spec.column), entry))
            .collect();
        // `sort_by` is stable, and reversing the comparator keeps equal keys in place.
        keyed.sort_by(|(a, _), (b, _)| match spec.direction {
            SortDirection::Ascending => a.compare(b),
            SortDirection::Descending => b.compare(a),
        });
        view = keyed.into_iter().map(|(_, entry)| entry).collect();
    }

    view
}
