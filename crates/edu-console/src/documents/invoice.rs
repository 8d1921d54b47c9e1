use super::pdf::{Font, PdfDocument};
use crate::billing::domain::{format_amount, InvoiceNumber, InvoiceRecord};
use crate::config::IssuerConfig;
use crate::crm::domain::{StudentId, StudentProfile};

const LEFT: u32 = 50;
const RIGHT: u32 = 545;
const AMOUNT_COLUMN: u32 = 420;
const LINE: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("invoice for payment {0} has no number")]
    MissingInvoiceNumber(String),
    #[error("student {0} has no name to print")]
    MissingStudentName(StudentId),
    #[error("invoice {number} belongs to {expected}, profile is for {actual}")]
    ProfileMismatch {
        number: InvoiceNumber,
        expected: StudentId,
        actual: StudentId,
    },
    #[error("invoice {number} total {total} does not equal amount {amount} plus tax {tax}")]
    InconsistentTotal {
        number: InvoiceNumber,
        amount: i64,
        tax: i64,
        total: i64,
    },
}

/// Renders one invoice as a single-page PDF.
///
/// Pure: the same invoice, profile and issuer always give the same bytes. The issue date is
/// the only date printed and doubles as the document creation date.
pub fn render_invoice(
    invoice: &InvoiceRecord,
    profile: &StudentProfile,
    issuer: &IssuerConfig,
) -> Result<Vec<u8>, RenderError> {
    validate(invoice, profile)?;

    let mut doc = PdfDocument::new(
        format!("Invoice {}", invoice.number),
        invoice.issued_on,
    );
    let mut y = 790;

    doc.text(Font::Bold, 16, LEFT, y, &issuer.name);
    if let Some(address) = &issuer.address {
        for line in address.lines() {
            y = y.saturating_sub(LINE);
            doc.text(Font::Regular, 10, LEFT, y, line);
        }
    }

    y = y.saturating_sub(2 * LINE);
    doc.text(Font::Bold, 22, LEFT, y, "INVOICE");
    y = y.saturating_sub(LINE + 4);
    doc.text(
        Font::Regular,
        10,
        LEFT,
        y,
        &format!("Invoice number: {}", invoice.number),
    );
    y = y.saturating_sub(LINE);
    doc.text(
        Font::Regular,
        10,
        LEFT,
        y,
        &format!("Issue date: {}", invoice.issued_on.format("%Y-%m-%d")),
    );
    y = y.saturating_sub(LINE);
    doc.text(
        Font::Regular,
        10,
        LEFT,
        y,
        &format!("Status: {}", invoice.status.label()),
    );
    y = y.saturating_sub(LINE);
    doc.text(
        Font::Regular,
        10,
        LEFT,
        y,
        &format!("Payment reference: {}", invoice.transaction_id),
    );

    y = y.saturating_sub(2 * LINE);
    doc.text(Font::Bold, 11, LEFT, y, "Bill to");
    y = y.saturating_sub(LINE);
    doc.text(Font::Regular, 10, LEFT, y, profile.full_name.trim());
    y = y.saturating_sub(LINE);
    doc.text(Font::Regular, 10, LEFT, y, &profile.email);
    if let Some(phone) = profile.phone.as_deref().filter(|phone| !phone.trim().is_empty()) {
        y = y.saturating_sub(LINE);
        doc.text(Font::Regular, 10, LEFT, y, phone);
    }
    if let Some(address) = profile
        .address
        .as_deref()
        .filter(|address| !address.trim().is_empty())
    {
        for line in address.lines() {
            y = y.saturating_sub(LINE);
            doc.text(Font::Regular, 10, LEFT, y, line);
        }
    }

    y = y.saturating_sub(2 * LINE);
    doc.text(Font::Bold, 10, LEFT, y, "Description");
    doc.text(Font::Bold, 10, AMOUNT_COLUMN, y, "Amount");
    y = y.saturating_sub(6);
    doc.rule(LEFT, y, RIGHT, y);
    y = y.saturating_sub(LINE);
    doc.text(Font::Regular, 10, LEFT, y, "Course fees");
    doc.text(
        Font::Regular,
        10,
        AMOUNT_COLUMN,
        y,
        &format_amount(invoice.amount, &invoice.currency),
    );
    y = y.saturating_sub(LINE);
    doc.text(Font::Regular, 10, LEFT, y, "Tax");
    doc.text(
        Font::Regular,
        10,
        AMOUNT_COLUMN,
        y,
        &format_amount(invoice.tax_amount, &invoice.currency),
    );
    y = y.saturating_sub(6);
    doc.rule(LEFT, y, RIGHT, y);
    y = y.saturating_sub(LINE);
    doc.text(Font::Bold, 11, LEFT, y, "Total");
    doc.text(
        Font::Bold,
        11,
        AMOUNT_COLUMN,
        y,
        &format_amount(invoice.total, &invoice.currency),
    );

    Ok(doc.finish())
}

fn validate(invoice: &InvoiceRecord, profile: &StudentProfile) -> Result<(), RenderError> {
    if invoice.number.0.trim().is_empty() {
        return Err(RenderError::MissingInvoiceNumber(
            invoice.transaction_id.0.clone(),
        ));
    }
    if profile.id != invoice.student_id {
        return Err(RenderError::ProfileMismatch {
            number: invoice.number.clone(),
            expected: invoice.student_id.clone(),
            actual: profile.id.clone(),
        });
    }
    if profile.full_name.trim().is_empty() {
        return Err(RenderError::MissingStudentName(profile.id.clone()));
    }
    if invoice.amount.checked_add(invoice.tax_amount) != Some(invoice.total) {
        return Err(RenderError::InconsistentTotal {
            number: invoice.number.clone(),
            amount: invoice.amount,
            tax: invoice.tax_amount,
            total: invoice.total,
        });
    }
    Ok(())
}
