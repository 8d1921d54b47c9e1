//! Fan-out of one logical action over a selection, with per-student outcome accounting.

mod dispatcher;
mod operation;
mod result;

pub use dispatcher::{settle_all, BulkDispatcher};
pub use operation::{BulkOperation, BulkValidationError};
pub use result::{BulkItemError, BulkOperationResult, ItemOutcome};
