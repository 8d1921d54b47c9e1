//! Student relationship layer: roster view state, selection and bulk actions.

pub mod bulk;
pub mod domain;
pub mod filter;
pub mod repository;
pub mod roster;
pub mod router;
pub mod selection;
pub mod service;
pub mod state;

#[cfg(test)]
mod tests;

pub use bulk::{
    settle_all, BulkDispatcher, BulkItemError, BulkOperation, BulkOperationResult,
    BulkValidationError, ItemOutcome,
};
pub use domain::{
    CourseId, Enrollment, EnrollmentStatus, FormationType, StudentId, StudentProfile,
    StudentRecord, StudentStatus, Tag,
};
pub use filter::{evaluate, FilterSpec, SortColumn, SortDirection, SortSpec};
pub use repository::{
    DirectoryError, EnrollmentError, EnrollmentGateway, MailError, Mailer, StudentDirectory,
};
pub use roster::{Roster, RosterEntry};
pub use router::student_router;
pub use selection::SelectionSet;
pub use service::{BulkCompletion, CrmError, StudentRelationshipService};
pub use state::RosterViewState;
