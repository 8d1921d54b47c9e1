use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};

use crate::billing::domain::{
    InvoiceNumber, InvoiceRecord, PaymentId, PaymentMethod, PaymentRecord, PaymentStatus,
};
use crate::billing::ledger::{BillingLedger, LedgerError};
use crate::crm::domain::{
    CourseId, Enrollment, EnrollmentStatus, FormationType, StudentId, StudentProfile,
    StudentRecord, StudentStatus, Tag,
};
use crate::crm::repository::{
    DirectoryError, EnrollmentError, EnrollmentGateway, MailError, Mailer, StudentDirectory,
};
use crate::crm::roster::Roster;
use crate::crm::service::StudentRelationshipService;

pub(super) fn id(raw: &str) -> StudentId {
    StudentId(raw.to_string())
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn student(
    raw_id: &str,
    name: &str,
    status: StudentStatus,
    registered_on: NaiveDate,
) -> StudentRecord {
    StudentRecord {
        id: id(raw_id),
        email: format!("{}@campus.example", name.to_lowercase().replace(' ', ".")),
        full_name: name.to_string(),
        phone: None,
        address: None,
        status,
        registered_on,
        enrollments: Vec::new(),
        tags: Vec::new(),
    }
}

pub(super) fn enrollment(
    course: &str,
    status: EnrollmentStatus,
    kind: FormationType,
) -> Enrollment {
    Enrollment {
        course_id: CourseId(course.to_string()),
        course_title: format!("Course {course}"),
        status,
        formation_type: kind,
        enrolled_on: date(2026, 2, 1),
    }
}

pub(super) fn payment(
    raw_id: &str,
    student: &str,
    amount: i64,
    status: PaymentStatus,
) -> PaymentRecord {
    PaymentRecord {
        id: PaymentId(raw_id.to_string()),
        student_id: id(student),
        amount,
        currency: "EUR".to_string(),
        method: PaymentMethod::Card,
        status,
        created_at: Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap(),
    }
}

/// Five students; three are active.
pub(super) fn sample_students() -> Vec<StudentRecord> {
    let mut ana = student("s1", "Ana Souza", StudentStatus::Active, date(2026, 1, 10));
    ana.phone = Some("+351 910 000 001".to_string());
    ana.enrollments.push(enrollment(
        "rust-101",
        EnrollmentStatus::Active,
        FormationType::Online,
    ));

    let mut bruno = student("s2", "Bruno Lima", StudentStatus::OnHold, date(2026, 1, 15));
    bruno.enrollments.push(enrollment(
        "ux-200",
        EnrollmentStatus::Pending,
        FormationType::InPerson,
    ));

    let mut carla = student("s3", "Carla Dias", StudentStatus::Active, date(2026, 2, 1));
    carla.enrollments.push(enrollment(
        "rust-101",
        EnrollmentStatus::Completed,
        FormationType::Hybrid,
    ));

    let diego = student("s4", "Diego Alves", StudentStatus::Graduated, date(2026, 2, 20));
    let mut eva = student("s5", "Eva Costa", StudentStatus::Active, date(2026, 3, 5));
    eva.phone = Some("+351 910 000 555".to_string());

    vec![ana, bruno, carla, diego, eva]
}

pub(super) fn sample_payments() -> Vec<PaymentRecord> {
    vec![
        payment("p1", "s1", 30_000, PaymentStatus::Completed),
        payment("p2", "s1", 15_000, PaymentStatus::Pending),
        payment("p3", "s3", 30_000, PaymentStatus::Completed),
        payment("p4", "s4", 90_000, PaymentStatus::Completed),
        payment("p5", "s5", 12_000, PaymentStatus::Refunded),
    ]
}

pub(super) fn sample_roster() -> Roster {
    Roster::assemble(sample_students(), &sample_payments())
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    pub(super) students: Mutex<Vec<StudentRecord>>,
    pub(super) failing: HashSet<StudentId>,
    pub(super) calls: Mutex<Vec<StudentId>>,
    pub(super) status_updates: Mutex<Vec<StudentId>>,
}

impl MemoryDirectory {
    pub(super) fn with_students(students: Vec<StudentRecord>) -> Self {
        Self {
            students: Mutex::new(students),
            ..Self::default()
        }
    }

    pub(super) fn failing_for(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|raw| id(raw)).collect();
        self
    }

    fn record_call(&self, student_id: &StudentId) -> Result<(), DirectoryError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(student_id.clone());
        if self.failing.contains(student_id) {
            return Err(DirectoryError::Unavailable("write timeout".to_string()));
        }
        Ok(())
    }

    pub(super) fn calls(&self) -> Vec<StudentId> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn student(&self, student_id: &StudentId) -> Option<StudentRecord> {
        self.students
            .lock()
            .expect("students mutex poisoned")
            .iter()
            .find(|record| &record.id == student_id)
            .cloned()
    }
}

impl StudentDirectory for MemoryDirectory {
    fn list_students(&self) -> Result<Vec<StudentRecord>, DirectoryError> {
        Ok(self.students.lock().expect("students mutex poisoned").clone())
    }

    fn fetch_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<StudentRecord>, DirectoryError> {
        self.record_call(student_id)?;
        Ok(self.student(student_id))
    }

    fn update_student_status(
        &self,
        student_id: &StudentId,
        status: StudentStatus,
    ) -> Result<(), DirectoryError> {
        self.status_updates
            .lock()
            .expect("updates mutex poisoned")
            .push(student_id.clone());
        let mut guard = self.students.lock().expect("students mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| &record.id == student_id)
            .ok_or_else(|| DirectoryError::NotFound(student_id.clone()))?;
        record.status = status;
        Ok(())
    }

    fn add_tag(&self, student_id: &StudentId, tag: Tag) -> Result<bool, DirectoryError> {
        self.record_call(student_id)?;
        let mut guard = self.students.lock().expect("students mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| &record.id == student_id)
            .ok_or_else(|| DirectoryError::NotFound(student_id.clone()))?;
        Ok(record.apply_tag(tag))
    }

    fn list_profiles_by_ids(
        &self,
        ids: &[StudentId],
    ) -> Result<Vec<StudentProfile>, DirectoryError> {
        let guard = self.students.lock().expect("students mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| ids.contains(&record.id))
            .map(StudentRecord::profile)
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryEnrollments {
    pub(super) enrolled: Mutex<Vec<(StudentId, CourseId)>>,
    pub(super) rejected: HashSet<StudentId>,
}

impl EnrollmentGateway for MemoryEnrollments {
    fn enroll_student_in_course(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<(), EnrollmentError> {
        if self.rejected.contains(student_id) {
            return Err(EnrollmentError::Rejected("course is full".to_string()));
        }
        self.enrolled
            .lock()
            .expect("enrollment mutex poisoned")
            .push((student_id.clone(), course_id.clone()));
        Ok(())
    }

    fn unenroll_student_from_course(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<(), EnrollmentError> {
        let mut guard = self.enrolled.lock().expect("enrollment mutex poisoned");
        let before = guard.len();
        guard.retain(|(student, course)| !(student == student_id && course == course_id));
        if guard.len() == before {
            return Err(EnrollmentError::StudentNotFound(student_id.clone()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryMailer {
    pub(super) sent: Mutex<Vec<(String, String)>>,
    pub(super) bouncing: HashSet<String>,
}

impl Mailer for MemoryMailer {
    fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        if self.bouncing.contains(to) {
            return Err(MailError::Rejected(to.to_string()));
        }
        self.sent
            .lock()
            .expect("mail mutex poisoned")
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    pub(super) payments: Mutex<Vec<PaymentRecord>>,
    pub(super) invoices: Mutex<BTreeMap<InvoiceNumber, InvoiceRecord>>,
    /// Makes the roster-wide payment listing fail.
    pub(super) listing_down: bool,
}

impl MemoryLedger {
    pub(super) fn with_payments(payments: Vec<PaymentRecord>) -> Self {
        Self {
            payments: Mutex::new(payments),
            ..Self::default()
        }
    }
}

impl BillingLedger for MemoryLedger {
    fn list_all_payments(&self) -> Result<Vec<PaymentRecord>, LedgerError> {
        if self.listing_down {
            return Err(LedgerError::Unavailable("down".to_string()));
        }
        Ok(self.payments.lock().expect("ledger mutex poisoned").clone())
    }

    fn list_payments_for(&self, student_id: &StudentId) -> Result<Vec<PaymentRecord>, LedgerError> {
        Ok(self
            .payments
            .lock()
            .expect("ledger mutex poisoned")
            .iter()
            .filter(|payment| &payment.student_id == student_id)
            .cloned()
            .collect())
    }

    fn list_invoices_for(&self, student_id: &StudentId) -> Result<Vec<InvoiceRecord>, LedgerError> {
        Ok(self
            .invoices
            .lock()
            .expect("ledger mutex poisoned")
            .values()
            .filter(|invoice| &invoice.student_id == student_id)
            .cloned()
            .collect())
    }

    fn list_all_invoices(&self) -> Result<Vec<InvoiceRecord>, LedgerError> {
        Ok(self
            .invoices
            .lock()
            .expect("ledger mutex poisoned")
            .values()
            .cloned()
            .collect())
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
        let mut guard = self.invoices.lock().expect("ledger mutex poisoned");
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

pub(super) struct Fixture {
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) enrollments: Arc<MemoryEnrollments>,
    pub(super) mailer: Arc<MemoryMailer>,
    pub(super) ledger: Arc<MemoryLedger>,
}

impl Fixture {
    pub(super) fn new(directory: MemoryDirectory) -> Self {
        Self {
            directory: Arc::new(directory),
            enrollments: Arc::new(MemoryEnrollments::default()),
            mailer: Arc::new(MemoryMailer::default()),
            ledger: Arc::new(MemoryLedger::with_payments(sample_payments())),
        }
    }

    pub(super) fn service(&self) -> StudentRelationshipService {
        StudentRelationshipService::new(
            self.directory.clone(),
            self.enrollments.clone(),
            self.mailer.clone(),
            self.ledger.clone(),
        )
    }
}
