use std::collections::HashMap;
use std::io::{Cursor, Write};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::invoice::render_invoice;
use crate::billing::domain::{InvoiceNumber, InvoiceRecord};
use crate::config::IssuerConfig;
use crate::crm::domain::{StudentId, StudentProfile};

/// One invoice left out of a batch, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderFailure {
    pub invoice_number: InvoiceNumber,
    pub student_id: StudentId,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct PackagedBatch {
    pub archive: Vec<u8>,
    pub included: Vec<InvoiceNumber>,
    pub failures: Vec<RenderFailure>,
}

impl PackagedBatch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("archive write failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub fn entry_name(number: &InvoiceNumber) -> String {
    format!("invoice-{number}.pdf")
}

/// Renders every invoice into one ZIP archive.
///
/// `profiles` is fetched once by the caller. An invoice whose profile is missing or that
/// fails to render is skipped and listed in `failures`; the others still package. Entries
/// are stamped with their invoice date so the archive bytes depend only on the inputs.
pub fn package_batch(
    invoices: &[InvoiceRecord],
    profiles: &HashMap<StudentId, StudentProfile>,
    issuer: &IssuerConfig,
) -> Result<PackagedBatch, PackageError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut included = Vec::new();
    let mut failures = Vec::new();

    for invoice in invoices {
        let rendered = match profiles.get(&invoice.student_id) {
            Some(profile) => {
                render_invoice(invoice, profile, issuer).map_err(|err| err.to_string())
            }
            None => Err(format!("no profile for student {}", invoice.student_id)),
        };

        match rendered {
            Ok(bytes) => {
                let options = FileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .last_modified_time(entry_timestamp(invoice.issued_on));
                writer.start_file(entry_name(&invoice.number), options)?;
                writer.write_all(&bytes)?;
                included.push(invoice.number.clone());
            }
            Err(reason) => {
                warn!(
                    invoice = %invoice.number,
                    student_id = %invoice.student_id,
                    reason = %reason,
                    "invoice left out of archive"
                );
                failures.push(RenderFailure {
                    invoice_number: invoice.number.clone(),
                    student_id: invoice.student_id.clone(),
                    reason,
                });
            }
        }
    }

    let archive = writer.finish()?.into_inner();
    debug!(
        included = included.len(),
        failed = failures.len(),
        bytes = archive.len(),
        "invoice archive packaged"
    );

    Ok(PackagedBatch {
        archive,
        included,
        failures,
    })
}

fn entry_timestamp(date: NaiveDate) -> zip::DateTime {
    let year = u16::try_from(date.year()).unwrap_or(1980);
    zip::DateTime::from_date_and_time(year, date.month() as u8, date.day() as u8, 0, 0, 0)
        .unwrap_or_default()
}
