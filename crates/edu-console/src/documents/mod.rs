//! Invoice documents and the archives they ship in.

pub mod archive;
pub mod invoice;
pub mod pdf;

#[cfg(test)]
mod tests;

pub use archive::{entry_name, package_batch, PackageError, PackagedBatch, RenderFailure};
pub use invoice::{render_invoice, RenderError};
