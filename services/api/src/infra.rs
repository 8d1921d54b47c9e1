use chrono::{Local, NaiveDate, TimeZone, Utc};
use edu_console::billing::{
    BillingLedger, InvoiceNumber, InvoiceRecord, LedgerError, PaymentId, PaymentMethod,
    PaymentRecord, PaymentStatus,
};
use edu_console::crm::{
    CourseId, DirectoryError, Enrollment, EnrollmentError, EnrollmentGateway, EnrollmentStatus,
    FormationType, MailError, Mailer, StudentDirectory, StudentId, StudentProfile, StudentRecord,
    StudentStatus, Tag,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutboundEmail {
    pub(crate) to: String,
    pub(crate) subject: String,
}

/// Process-local stand-in for the student store, course catalog, mail relay and ledger.
#[derive(Default, Clone)]
pub(crate) struct InMemoryBackOffice {
    students: Arc<Mutex<Vec<StudentRecord>>>,
    courses: Arc<HashMap<CourseId, String>>,
    payments: Arc<Mutex<Vec<PaymentRecord>>>,
    invoices: Arc<Mutex<BTreeMap<InvoiceNumber, InvoiceRecord>>>,
    outbox: Arc<Mutex<Vec<OutboundEmail>>>,
    unreachable: Arc<HashSet<StudentId>>,
}

fn guard<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, String> {
    mutex
        .lock()
        .map_err(|_| "back office lock poisoned".to_string())
}

impl InMemoryBackOffice {
    /// Students whose profile service times out on writes.
    pub(crate) fn with_unreachable(mut self, ids: &[&str]) -> Self {
        self.unreachable = Arc::new(ids.iter().map(|id| StudentId(id.to_string())).collect());
        self
    }

    pub(crate) fn outbox(&self) -> Vec<OutboundEmail> {
        guard(&self.outbox).map(|mail| mail.clone()).unwrap_or_default()
    }

    fn with_student<R>(
        &self,
        student_id: &StudentId,
        apply: impl FnOnce(&mut StudentRecord) -> R,
    ) -> Result<R, DirectoryError> {
        let mut students = guard(&self.students).map_err(DirectoryError::Unavailable)?;
        let record = students
            .iter_mut()
            .find(|record| &record.id == student_id)
            .ok_or_else(|| DirectoryError::NotFound(student_id.clone()))?;
        Ok(apply(record))
    }

    fn ensure_reachable(&self, student_id: &StudentId) -> Result<(), DirectoryError> {
        if self.unreachable.contains(student_id) {
            return Err(DirectoryError::Unavailable(format!(
                "profile service timed out for {student_id}"
            )));
        }
        Ok(())
    }
}

impl StudentDirectory for InMemoryBackOffice {
    fn list_students(&self) -> Result<Vec<StudentRecord>, DirectoryError> {
        Ok(guard(&self.students)
            .map_err(DirectoryError::Unavailable)?
            .clone())
    }

    fn fetch_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<StudentRecord>, DirectoryError> {
        let students = guard(&self.students).map_err(DirectoryError::Unavailable)?;
        Ok(students.iter().find(|record| &record.id == student_id).cloned())
    }

    fn update_student_status(
        &self,
        student_id: &StudentId,
        status: StudentStatus,
    ) -> Result<(), DirectoryError> {
        self.ensure_reachable(student_id)?;
        self.with_student(student_id, |record| record.status = status)
    }

    fn add_tag(&self, student_id: &StudentId, tag: Tag) -> Result<bool, DirectoryError> {
        self.ensure_reachable(student_id)?;
        self.with_student(student_id, |record| record.apply_tag(tag))
    }

    fn list_profiles_by_ids(
        &self,
        ids: &[StudentId],
    ) -> Result<Vec<StudentProfile>, DirectoryError> {
        let students = guard(&self.students).map_err(DirectoryError::Unavailable)?;
        Ok(students
            .iter()
            .filter(|record| ids.contains(&record.id))
            .map(StudentRecord::profile)
            .collect())
    }
}

impl EnrollmentGateway for InMemoryBackOffice {
    fn enroll_student_in_course(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<(), EnrollmentError> {
        let title = self
            .courses
            .get(course_id)
            .cloned()
            .ok_or_else(|| EnrollmentError::CourseNotFound(course_id.clone()))?;
        let mut students = guard(&self.students).map_err(EnrollmentError::Unavailable)?;
        let record = students
            .iter_mut()
            .find(|record| &record.id == student_id)
            .ok_or_else(|| EnrollmentError::StudentNotFound(student_id.clone()))?;
        if record.is_enrolled_in(course_id) {
            return Err(EnrollmentError::Rejected(format!(
                "{student_id} is already enrolled in {course_id}"
            )));
        }
        record.enrollments.push(Enrollment {
            course_id: course_id.clone(),
            course_title: title,
            status: EnrollmentStatus::Pending,
            formation_type: FormationType::Online,
            enrolled_on: Local::now().date_naive(),
        });
        Ok(())
    }

    fn unenroll_student_from_course(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<(), EnrollmentError> {
        let mut students = guard(&self.students).map_err(EnrollmentError::Unavailable)?;
        let record = students
            .iter_mut()
            .find(|record| &record.id == student_id)
            .ok_or_else(|| EnrollmentError::StudentNotFound(student_id.clone()))?;
        let before = record.enrollments.len();
        record
            .enrollments
            .retain(|enrollment| &enrollment.course_id != course_id);
        if record.enrollments.len() == before {
            return Err(EnrollmentError::CourseNotFound(course_id.clone()));
        }
        Ok(())
    }
}

impl Mailer for InMemoryBackOffice {
    fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        if !to.contains('@') {
            return Err(MailError::Rejected(to.to_string()));
        }
        let mut outbox = guard(&self.outbox).map_err(MailError::Transport)?;
        outbox.push(OutboundEmail {
            to: to.to_string(),
            subject: subject.to_string(),
        });
        info!(to, subject, "email queued");
        Ok(())
    }
}

impl BillingLedger for InMemoryBackOffice {
    fn list_all_payments(&self) -> Result<Vec<PaymentRecord>, LedgerError> {
        Ok(guard(&self.payments)
            .map_err(LedgerError::Unavailable)?
            .clone())
    }

    fn list_payments_for(&self, student_id: &StudentId) -> Result<Vec<PaymentRecord>, LedgerError> {
        let payments = guard(&self.payments).map_err(LedgerError::Unavailable)?;
        Ok(payments
            .iter()
            .filter(|payment| &payment.student_id == student_id)
            .cloned()
            .collect())
    }

    fn list_invoices_for(&self, student_id: &StudentId) -> Result<Vec<InvoiceRecord>, LedgerError> {
        let invoices = guard(&self.invoices).map_err(LedgerError::Unavailable)?;
        Ok(invoices
            .values()
            .filter(|invoice| &invoice.student_id == student_id)
            .cloned()
            .collect())
    }

    fn list_all_invoices(&self) -> Result<Vec<InvoiceRecord>, LedgerError> {
        let invoices = guard(&self.invoices).map_err(LedgerError::Unavailable)?;
        Ok(invoices.values().cloned().collect())
    }

    fn record_payment(&self, payment: PaymentRecord) -> Result<PaymentRecord, LedgerError> {
        let mut payments = guard(&self.payments).map_err(LedgerError::Unavailable)?;
        if payments.iter().any(|existing| existing.id == payment.id) {
            return Err(LedgerError::DuplicatePayment(payment.id));
        }
        payments.push(payment.clone());
        Ok(payment)
    }

    fn create_invoice(&self, invoice: InvoiceRecord) -> Result<InvoiceRecord, LedgerError> {
        let mut invoices = guard(&self.invoices).map_err(LedgerError::Unavailable)?;
        if invoices
            .values()
            .any(|existing| existing.transaction_id == invoice.transaction_id)
        {
            return Err(LedgerError::TransactionAlreadyInvoiced(invoice.transaction_id));
        }
        if invoices.contains_key(&invoice.number) {
            return Err(LedgerError::InvoiceNumberCollision(invoice.number));
        }
        invoices.insert(invoice.number.clone(), invoice.clone());
        Ok(invoice)
    }

    fn fetch_invoice(&self, number: &InvoiceNumber) -> Result<Option<InvoiceRecord>, LedgerError> {
        let invoices = guard(&self.invoices).map_err(LedgerError::Unavailable)?;
        Ok(invoices.get(number).cloned())
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

struct SeedStudent {
    id: &'static str,
    name: &'static str,
    phone: Option<&'static str>,
    address: Option<&'static str>,
    status: StudentStatus,
    registered: (u32, u32),
    courses: &'static [(&'static str, EnrollmentStatus, FormationType)],
}

const COURSES: [(&str, &str); 4] = [
    ("rust-101", "Systems Programming with Rust"),
    ("ux-200", "Product Design Fundamentals"),
    ("data-150", "Applied Data Analysis"),
    ("cloud-300", "Cloud Infrastructure Operations"),
];

const STUDENTS: [SeedStudent; 8] = [
    SeedStudent {
        id: "stu-001",
        name: "Ana Souza",
        phone: Some("+351 910 000 001"),
        address: Some("Rua Augusta 45\n1100-048 Lisboa"),
        status: StudentStatus::Active,
        registered: (1, 8),
        courses: &[("rust-101", EnrollmentStatus::Active, FormationType::Online)],
    },
    SeedStudent {
        id: "stu-002",
        name: "Bruno Lima",
        phone: None,
        address: None,
        status: StudentStatus::OnHold,
        registered: (1, 19),
        courses: &[("ux-200", EnrollmentStatus::Pending, FormationType::InPerson)],
    },
    SeedStudent {
        id: "stu-003",
        name: "Carla Dias",
        phone: Some("+351 910 000 003"),
        address: None,
        status: StudentStatus::Active,
        registered: (2, 2),
        courses: &[
            ("rust-101", EnrollmentStatus::Completed, FormationType::Hybrid),
            ("cloud-300", EnrollmentStatus::Active, FormationType::Online),
        ],
    },
    SeedStudent {
        id: "stu-004",
        name: "Diego Alves",
        phone: None,
        address: Some("Avenida da Boavista 900\n4100-112 Porto"),
        status: StudentStatus::Graduated,
        registered: (2, 14),
        courses: &[("data-150", EnrollmentStatus::Completed, FormationType::InPerson)],
    },
    SeedStudent {
        id: "stu-005",
        name: "Eva Costa",
        phone: Some("+351 910 000 005"),
        address: None,
        status: StudentStatus::Active,
        registered: (3, 1),
        courses: &[("data-150", EnrollmentStatus::Active, FormationType::Hybrid)],
    },
    SeedStudent {
        id: "stu-006",
        name: "Filipe Rocha",
        phone: None,
        address: None,
        status: StudentStatus::Active,
        registered: (3, 9),
        courses: &[],
    },
    SeedStudent {
        id: "stu-007",
        name: "Gabriela Nunes",
        phone: Some("+351 910 000 007"),
        address: None,
        status: StudentStatus::Suspended,
        registered: (3, 20),
        courses: &[("ux-200", EnrollmentStatus::Dropped, FormationType::Online)],
    },
    SeedStudent {
        id: "stu-008",
        name: "Hugo Martins",
        phone: None,
        address: None,
        status: StudentStatus::Inactive,
        registered: (4, 2),
        courses: &[],
    },
];

const PAYMENTS: [(&str, &str, i64, PaymentMethod, PaymentStatus, (u32, u32)); 10] = [
    ("pay-1001", "stu-001", 45_000, PaymentMethod::Card, PaymentStatus::Completed, (1, 10)),
    ("pay-1002", "stu-001", 45_000, PaymentMethod::Card, PaymentStatus::Completed, (2, 10)),
    ("pay-1003", "stu-001", 45_000, PaymentMethod::Card, PaymentStatus::Pending, (3, 10)),
    ("pay-1004", "stu-002", 32_000, PaymentMethod::BankTransfer, PaymentStatus::Failed, (1, 21)),
    ("pay-1005", "stu-003", 60_000, PaymentMethod::BankTransfer, PaymentStatus::Completed, (2, 3)),
    ("pay-1006", "stu-003", 52_500, PaymentMethod::Card, PaymentStatus::Completed, (3, 3)),
    ("pay-1007", "stu-004", 98_000, PaymentMethod::Cash, PaymentStatus::Completed, (2, 15)),
    ("pay-1008", "stu-005", 27_500, PaymentMethod::Card, PaymentStatus::Refunded, (3, 2)),
    ("pay-1009", "stu-005", 27_500, PaymentMethod::Card, PaymentStatus::Completed, (3, 4)),
    ("pay-1010", "stu-007", 15_000, PaymentMethod::Other, PaymentStatus::Completed, (3, 22)),
];

/// Back office preloaded with eight students across every lifecycle status and a ledger
/// where some completed payments are already invoiced and some are not.
pub(crate) fn seeded_back_office() -> InMemoryBackOffice {
    let courses: HashMap<CourseId, String> = COURSES
        .iter()
        .map(|(id, title)| (CourseId(id.to_string()), title.to_string()))
        .collect();

    let students: Vec<StudentRecord> = STUDENTS
        .iter()
        .map(|seed| {
            let email = format!(
                "{}@students.example",
                seed.name.to_lowercase().replace(' ', ".")
            );
            let registered_on = date(2026, seed.registered.0, seed.registered.1);
            StudentRecord {
                id: StudentId(seed.id.to_string()),
                email,
                full_name: seed.name.to_string(),
                phone: seed.phone.map(str::to_string),
                address: seed.address.map(str::to_string),
                status: seed.status,
                registered_on,
                enrollments: seed
                    .courses
                    .iter()
                    .map(|(course, status, formation)| Enrollment {
                        course_id: CourseId(course.to_string()),
                        course_title: courses
                            .get(&CourseId(course.to_string()))
                            .cloned()
                            .unwrap_or_else(|| course.to_string()),
                        status: *status,
                        formation_type: *formation,
                        enrolled_on: registered_on,
                    })
                    .collect(),
                tags: Vec::new(),
            }
        })
        .collect();

    let payments: Vec<PaymentRecord> = PAYMENTS
        .iter()
        .map(|(id, student, amount, method, status, (month, day))| PaymentRecord {
            id: PaymentId(id.to_string()),
            student_id: StudentId(student.to_string()),
            amount: *amount,
            currency: "EUR".to_string(),
            method: *method,
            status: *status,
            created_at: Utc
                .with_ymd_and_hms(2026, *month, *day, 9, 30, 0)
                .single()
                .unwrap_or_default(),
        })
        .collect();

    let mut invoices = BTreeMap::new();
    if let Some(first) = payments.first() {
        let number = InvoiceNumber("INV-2026-00001".to_string());
        invoices.insert(
            number.clone(),
            InvoiceRecord {
                number,
                student_id: first.student_id.clone(),
                transaction_id: first.id.clone(),
                issued_on: first.created_at.date_naive(),
                amount: first.amount,
                tax_amount: 0,
                total: first.amount,
                currency: first.currency.clone(),
                status: edu_console::billing::InvoiceStatus::Paid,
            },
        );
    }

    InMemoryBackOffice {
        students: Arc::new(Mutex::new(students)),
        courses: Arc::new(courses),
        payments: Arc::new(Mutex::new(payments)),
        invoices: Arc::new(Mutex::new(invoices)),
        outbox: Arc::new(Mutex::new(Vec::new())),
        unreachable: Arc::new(HashSet::new()),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
