use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};

use crate::billing::domain::{
    InvoiceNumber, InvoiceRecord, InvoiceStatus, PaymentId, PaymentMethod, PaymentRecord,
    PaymentStatus,
};
use crate::billing::ledger::{BillingLedger, LedgerError};
use crate::billing::service::BillingService;
use crate::config::{BillingConfig, IssuerConfig};
use crate::crm::domain::{StudentId, StudentProfile, StudentRecord, StudentStatus, Tag};
use crate::crm::repository::{DirectoryError, StudentDirectory};

pub(super) fn sid(raw: &str) -> StudentId {
    StudentId(raw.to_string())
}

pub(super) fn payment(
    id: &str,
    student: &str,
    day: u32,
    amount: i64,
    status: PaymentStatus,
) -> PaymentRecord {
    PaymentRecord {
        id: PaymentId(id.to_string()),
        student_id: sid(student),
        amount,
        currency: "EUR".to_string(),
        method: PaymentMethod::Card,
        status,
        created_at: Utc.with_ymd_and_hms(2026, 5, day, 14, 0, 0).unwrap(),
    }
}

pub(super) fn invoice_for(payment: &PaymentRecord, number: &str) -> InvoiceRecord {
    InvoiceRecord {
        number: InvoiceNumber(number.to_string()),
        student_id: payment.student_id.clone(),
        transaction_id: payment.id.clone(),
        issued_on: payment.created_at.date_naive(),
        amount: payment.amount,
        tax_amount: 0,
        total: payment.amount,
        currency: payment.currency.clone(),
        status: InvoiceStatus::Paid,
    }
}

/// Student s1 has three completed payments, one already invoiced, plus a pending one.
pub(super) fn seeded_ledger() -> MemoryLedger {
    let payments = vec![
        payment("p1", "s1", 2, 40_000, PaymentStatus::Completed),
        payment("p2", "s1", 3, 40_000, PaymentStatus::Completed),
        payment("p3", "s1", 4, 20_000, PaymentStatus::Completed),
        payment("p4", "s1", 5, 9_900, PaymentStatus::Pending),
        payment("p5", "s1", 6, 5_000, PaymentStatus::Refunded),
        payment("p6", "s2", 2, 70_000, PaymentStatus::Completed),
    ];
    let ledger = MemoryLedger::with_payments(payments.clone());
    ledger
        .create_invoice(invoice_for(&payments[0], "INV-2026-00003"))
        .expect("seed invoice stored");
    ledger
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    pub(super) payments: Mutex<Vec<PaymentRecord>>,
    pub(super) invoices: Mutex<BTreeMap<InvoiceNumber, InvoiceRecord>>,
    /// Payments another writer invoices just before we do.
    pub(super) raced: HashSet<PaymentId>,
    /// Payments whose invoice write fails outright.
    pub(super) unavailable: HashSet<PaymentId>,
}

impl MemoryLedger {
    pub(super) fn with_payments(payments: Vec<PaymentRecord>) -> Self {
        Self {
            payments: Mutex::new(payments),
            ..Self::default()
        }
    }

    pub(super) fn invoices(&self) -> Vec<InvoiceRecord> {
        self.invoices
            .lock()
            .expect("ledger mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl BillingLedger for MemoryLedger {
    fn list_all_payments(&self) -> Result<Vec<PaymentRecord>, LedgerError> {
        Ok(self.payments.lock().expect("ledger mutex poisoned").clone())
    }

    fn list_payments_for(&self, student_id: &StudentId) -> Result<Vec<PaymentRecord>, LedgerError> {
        Ok(self
            .list_all_payments()?
            .into_iter()
            .filter(|payment| &payment.student_id == student_id)
            .collect())
    }

    fn list_invoices_for(&self, student_id: &StudentId) -> Result<Vec<InvoiceRecord>, LedgerError> {
        Ok(self
            .invoices()
            .into_iter()
            .filter(|invoice| &invoice.student_id == student_id)
            .collect())
    }

    fn list_all_invoices(&self) -> Result<Vec<InvoiceRecord>, LedgerError> {
        Ok(self.invoices())
    }

    fn record_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord, LedgerError> {
        let mut guard = self.payments.lock().expect("ledger mutex poisoned");
        if guard.iter().any(|existing| existing.id == payment.id) {
            return Err(LedgerError::DuplicatePayment(payment.id));
        }
        guard.push(payment.clone());
        Ok(payment)
    }

    fn create_invoice(&self, invoice: InvoiceRecord) -> Result<InvoiceRecord, LedgerError> {
        if self.unavailable.contains(&invoice.transaction_id) {
            return Err(LedgerError::Unavailable("write timeout".to_string()));
        }
        let mut guard = self.invoices.lock().expect("ledger mutex poisoned");
        if self.raced.contains(&invoice.transaction_id)
            && !guard
                .values()
                .any(|existing| existing.transaction_id == invoice.transaction_id)
        {
            let mut competitor = invoice.clone();
            competitor.number = InvoiceNumber(format!("RACE-{}", invoice.transaction_id));
            guard.insert(competitor.number.clone(), competitor);
        }
        if guard
            .values()
            .any(|existing| existing.transaction_id == invoice.transaction_id)
        {
            return Err(LedgerError::TransactionAlreadyInvoiced(invoice.transaction_id));
        }
        if guard.contains_key(&invoice.number) {
            return Err(LedgerError::InvoiceNumberCollision(invoice.number));
        }
        guard.insert(invoice.number.clone(), invoice.clone());
        Ok(invoice)
    }

    fn fetch_invoice(&self, number: &InvoiceNumber) -> Result<Option<InvoiceRecord>, LedgerError> {
        Ok(self
            .invoices
            .lock()
            .expect("ledger mutex poisoned")
            .get(number)
            .cloned())
    }
}

/// Directory that only knows student profiles; profile lookups are counted.
#[derive(Default)]
pub(super) struct ProfileDirectory {
    pub(super) profiles: Vec<StudentProfile>,
    pub(super) lookups: Mutex<usize>,
}

impl ProfileDirectory {
    pub(super) fn with(ids: &[&str]) -> Self {
        Self {
            profiles: ids
                .iter()
                .map(|raw| StudentProfile {
                    id: sid(raw),
                    full_name: format!("Student {}", raw.to_uppercase()),
                    email: format!("{raw}@campus.example"),
                    phone: None,
                    address: None,
                })
                .collect(),
            lookups: Mutex::new(0),
        }
    }

    pub(super) fn lookups(&self) -> usize {
        *self.lookups.lock().expect("lookup mutex poisoned")
    }
}

impl StudentDirectory for ProfileDirectory {
    fn list_students(&self) -> Result<Vec<StudentRecord>, DirectoryError> {
        Ok(self
            .profiles
            .iter()
            .map(|profile| StudentRecord {
                id: profile.id.clone(),
                email: profile.email.clone(),
                full_name: profile.full_name.clone(),
                phone: None,
                address: None,
                status: StudentStatus::Active,
                registered_on: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
                enrollments: Vec::new(),
                tags: Vec::new(),
            })
            .collect())
    }

    fn fetch_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<StudentRecord>, DirectoryError> {
        Ok(self
            .list_students()?
            .into_iter()
            .find(|record| &record.id == student_id))
    }

    fn update_student_status(
        &self,
        student_id: &StudentId,
        _status: StudentStatus,
    ) -> Result<(), DirectoryError> {
        Err(DirectoryError::Unavailable(format!(
            "read-only directory cannot update {student_id}"
        )))
    }

    fn add_tag(&self, student_id: &StudentId, _tag: Tag) -> Result<bool, DirectoryError> {
        Err(DirectoryError::Unavailable(format!(
            "read-only directory cannot tag {student_id}"
        )))
    }

    fn list_profiles_by_ids(
        &self,
        ids: &[StudentId],
    ) -> Result<Vec<StudentProfile>, DirectoryError> {
        *self.lookups.lock().expect("lookup mutex poisoned") += 1;
        Ok(self
            .profiles
            .iter()
            .filter(|profile| ids.contains(&profile.id))
            .cloned()
            .collect())
    }
}

pub(super) fn billing_config() -> BillingConfig {
    BillingConfig {
        invoice_prefix: "INV".to_string(),
        tax_rate_bps: 0,
        default_currency: "EUR".to_string(),
    }
}

pub(super) fn build_service(
    ledger: MemoryLedger,
    directory: ProfileDirectory,
) -> (BillingService, Arc<MemoryLedger>, Arc<ProfileDirectory>) {
    build_service_with(ledger, directory, billing_config())
}

pub(super) fn build_service_with(
    ledger: MemoryLedger,
    directory: ProfileDirectory,
    config: BillingConfig,
) -> (BillingService, Arc<MemoryLedger>, Arc<ProfileDirectory>) {
    let ledger = Arc::new(ledger);
    let directory = Arc::new(directory);
    let service = BillingService::new(
        ledger.clone(),
        directory.clone(),
        &config,
        IssuerConfig::default(),
    )
    .expect("service builds");
    (service, ledger, directory)
}
