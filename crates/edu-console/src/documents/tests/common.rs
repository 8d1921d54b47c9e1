use chrono::NaiveDate;

use crate::billing::domain::{InvoiceNumber, InvoiceRecord, InvoiceStatus, PaymentId};
use crate::config::IssuerConfig;
use crate::crm::domain::{StudentId, StudentProfile};

pub(super) fn issuer() -> IssuerConfig {
    IssuerConfig {
        name: "Lisbon Coding Academy".to_string(),
        address: Some("Rua do Ouro 12\n1100-060 Lisboa".to_string()),
    }
}

pub(super) fn profile(student: &str) -> StudentProfile {
    StudentProfile {
        id: StudentId(student.to_string()),
        full_name: format!("Student {student}"),
        email: format!("{student}@campus.example"),
        phone: None,
        address: None,
    }
}

pub(super) fn invoice(sequence: u32, student: &str) -> InvoiceRecord {
    InvoiceRecord {
        number: InvoiceNumber(format!("INV-2026-{sequence:05}")),
        student_id: StudentId(student.to_string()),
        transaction_id: PaymentId(format!("pay-{sequence}")),
        issued_on: NaiveDate::from_ymd_opt(2026, 3, sequence.clamp(1, 28)).expect("valid date"),
        amount: 25_000,
        tax_amount: 5_750,
        total: 30_750,
        currency: "EUR".to_string(),
        status: InvoiceStatus::Paid,
    }
}

pub(super) fn pdf_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
