use serde::{Deserialize, Serialize};

use super::domain::StudentId;
use super::filter::{self, FilterSpec, SortColumn, SortSpec};
use super::roster::{Roster, RosterEntry};
use super::selection::SelectionSet;

/// Filter, search, sort and selection for one console session.
///
/// Every transition consumes the state and returns the next one. Filter, search and sort
/// transitions leave `selection` untouched; ids stay selected after they leave the view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterViewState {
    pub filters: FilterSpec,
    pub search: String,
    pub sort: Option<SortSpec>,
    pub selection: SelectionSet,
}

impl RosterViewState {
    pub fn with_filters(self, filters: FilterSpec) -> Self {
        Self { filters, ..self }
    }

    pub fn with_search(self, search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..self
        }
    }

    pub fn sort_by(self, column: SortColumn) -> Self {
        let sort = Some(SortSpec::select(self.sort, column));
        Self { sort, ..self }
    }

    pub fn toggle_selection(mut self, id: StudentId) -> Self {
        self.selection.toggle(id);
        self
    }

    /// Select-all over the current filtered view of `roster`.
    pub fn select_all_visible(mut self, roster: &Roster) -> Self {
        let view = filter::evaluate(roster, &self.filters, &self.search, self.sort.as_ref());
        self.selection.select_all(&view);
        self
    }

    pub fn clear_selection(mut self) -> Self {
        self.selection.clear();
        self
    }

    pub fn view<'a>(&self, roster: &'a Roster) -> Vec<&'a RosterEntry> {
        filter::evaluate(roster, &self.filters, &self.search, self.sort.as_ref())
    }
}
