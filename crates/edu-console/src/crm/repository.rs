use super::domain::{CourseId, StudentId, StudentProfile, StudentRecord, StudentStatus, Tag};

/// Roster store abstraction so the CRM layer can be exercised in isolation.
pub trait StudentDirectory: Send + Sync {
    fn list_students(&self) -> Result<Vec<StudentRecord>, DirectoryError>;
    fn fetch_student(&self, id: &StudentId) -> Result<Option<StudentRecord>, DirectoryError>;
    fn update_student_status(
        &self,
        id: &StudentId,
        status: StudentStatus,
    ) -> Result<(), DirectoryError>;
    /// Attach `tag` to the student. Returns `false` when a tag with that name already exists.
    fn add_tag(&self, id: &StudentId, tag: Tag) -> Result<bool, DirectoryError>;
    /// Bulk lookup; ids without a record are simply absent from the result.
    fn list_profiles_by_ids(
        &self,
        ids: &[StudentId],
    ) -> Result<Vec<StudentProfile>, DirectoryError>;
}

/// Error enumeration for roster store failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("student {0} not found")]
    NotFound(StudentId),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Course enrollment hooks owned by the course administration module.
pub trait EnrollmentGateway: Send + Sync {
    fn enroll_student_in_course(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<(), EnrollmentError>;
    fn unenroll_student_from_course(
        &self,
        student_id: &StudentId,
        course_id: &CourseId,
    ) -> Result<(), EnrollmentError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrollmentError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("enrollment rejected: {0}")]
    Rejected(String),
    #[error("enrollment service unavailable: {0}")]
    Unavailable(String),
}

/// Outbound e-mail transport. Delivery is owned by the notification service.
pub trait Mailer: Send + Sync {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}
