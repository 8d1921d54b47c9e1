use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::ExportError;
use crate::billing::domain::format_minor_units;
use crate::crm::roster::{Roster, RosterEntry};
use crate::crm::state::RosterViewState;

/// Which roster ids feed an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    #[default]
    All,
    Filtered,
    Selected,
}

/// Columns the projection knows how to populate, with their header labels.
pub const KNOWN_COLUMNS: [(&str, &str); 11] = [
    ("id", "ID"),
    ("full_name", "Full name"),
    ("email", "Email"),
    ("phone", "Phone"),
    ("address", "Address"),
    ("status", "Status"),
    ("registered_on", "Registered on"),
    ("total_paid", "Total paid"),
    ("enrollment_count", "Enrollments"),
    ("courses", "Courses"),
    ("tags", "Tags"),
];

/// Header label for a column key; unknown keys are echoed back.
pub fn column_label(key: &str) -> &str {
    KNOWN_COLUMNS
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, label)| *label)
        .unwrap_or(key)
}

/// One flat export row. Keys are exactly the requested columns, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    cells: Vec<(String, String)>,
}

impl ExportRow {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for ExportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (key, value) in &self.cells {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Projects the scoped roster subset onto `columns`.
///
/// `Filtered` follows the view order of `state`; `All` and `Selected` follow roster order.
/// Selected ids missing from the roster are skipped.
pub fn project(
    roster: &Roster,
    scope: ExportScope,
    state: &RosterViewState,
    columns: &[String],
) -> Result<Vec<ExportRow>, ExportError> {
    if columns.is_empty() {
        return Err(ExportError::EmptyColumns);
    }

    let source: Vec<&RosterEntry> = match scope {
        ExportScope::All => roster.entries().iter().collect(),
        ExportScope::Filtered => state.view(roster),
        ExportScope::Selected => roster
            .entries()
            .iter()
            .filter(|entry| state.selection.contains(entry.id()))
            .collect(),
    };

    Ok(source
        .into_iter()
        .map(|entry| ExportRow {
            cells: columns
                .iter()
                .map(|column| (column.clone(), cell_value(entry, column)))
                .collect(),
        })
        .collect())
}

fn cell_value(entry: &RosterEntry, column: &str) -> String {
    let record = &entry.record;
    match column {
        "id" => record.id.0.clone(),
        "full_name" => record.full_name.clone(),
        "email" => record.email.clone(),
        "phone" => record.phone.clone().unwrap_or_default(),
        "address" => record.address.clone().unwrap_or_default(),
        "status" => record.status.label().to_string(),
        "registered_on" => record.registered_on.format("%Y-%m-%d").to_string(),
        "total_paid" => format_minor_units(entry.total_paid),
        "enrollment_count" => record.enrollments.len().to_string(),
        "courses" => record
            .enrollments
            .iter()
            .map(|enrollment| enrollment.course_title.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        "tags" => record
            .tags
            .iter()
            .map(|tag| tag.name.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    }
}
