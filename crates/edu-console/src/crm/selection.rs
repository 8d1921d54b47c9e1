use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::StudentId;
use super::roster::RosterEntry;

/// Student ids marked for bulk action. Independent of whatever view is on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet {
    ids: BTreeSet<StudentId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: StudentId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    /// Select-all toggle relative to `view`: clears when the selection is exactly the
    /// view's ids, otherwise replaces the selection with them.
    pub fn select_all(&mut self, view: &[&RosterEntry]) {
        let visible: BTreeSet<StudentId> = view.iter().map(|entry| entry.id().clone()).collect();
        if self.ids == visible {
            self.ids.clear();
        } else {
            self.ids = visible;
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &StudentId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StudentId> {
        self.ids.iter()
    }

    pub fn to_vec(&self) -> Vec<StudentId> {
        self.ids.iter().cloned().collect()
    }
}

impl FromIterator<StudentId> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = StudentId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
