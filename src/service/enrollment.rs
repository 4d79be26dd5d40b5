use crate::error::AppError;
use crate::error::server_message::first_message;
use crate::models::course::Course;
use crate::models::enrollment::Enrollment;
use crate::models::user::Role;
use crate::service::auth::SessionContext;
use crate::service::in_flight::InFlight;
use crate::service::service_util::fetch_json;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Result of an enroll attempt, as shown in the confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Enrolled,
    AlreadyEnrolled,
    Restricted(String),
    Failed(String),
    NetworkError,
    /// An enrollment for this course is already running; no request was sent.
    Busy,
}

impl EnrollmentOutcome {
    pub fn title(&self) -> &'static str {
        match self {
            EnrollmentOutcome::Enrolled => "Enrollment Successful!",
            EnrollmentOutcome::AlreadyEnrolled => "Already Enrolled",
            EnrollmentOutcome::Restricted(_) => "Enrollment Restricted",
            EnrollmentOutcome::Failed(_) => "Enrollment Failed",
            EnrollmentOutcome::NetworkError => "Network Error",
            EnrollmentOutcome::Busy => "Enrollment In Progress",
        }
    }

    pub fn message(&self, course: &Course) -> String {
        match self {
            EnrollmentOutcome::Enrolled => format!(
                "You have been successfully enrolled in \"{}\". You can now access all course materials and lessons.",
                course.title
            ),
            EnrollmentOutcome::AlreadyEnrolled => format!(
                "You are already enrolled in \"{}\". You can access the course from your enrolled courses.",
                course.title
            ),
            EnrollmentOutcome::Restricted(message) | EnrollmentOutcome::Failed(message) => message.clone(),
            EnrollmentOutcome::NetworkError => {
                "Unable to connect to the server. Please check your internet connection and try again.".to_string()
            }
            EnrollmentOutcome::Busy => format!("Enrollment in \"{}\" is already in progress.", course.title),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EnrollmentOutcome::Enrolled)
    }
}

pub struct EnrollmentService<'a> {
    session: &'a SessionContext,
    enrolling: InFlight<i64>,
}

impl<'a> EnrollmentService<'a> {
    pub fn new(session: &'a SessionContext) -> Self {
        EnrollmentService {
            session,
            enrolling: InFlight::new(),
        }
    }

    pub async fn enroll(&self, course: &Course) -> EnrollmentOutcome {
        let Some(_permit) = self.enrolling.try_acquire(course.id) else {
            debug!(course_id = course.id, "enrollment already in flight");
            return EnrollmentOutcome::Busy;
        };

        let outcome = match self.session.client().enroll(course.id).await {
            Ok(response) if response.is_success() => EnrollmentOutcome::Enrolled,
            Ok(response) => classify_rejection(response.status, &response.json_value()),
            Err(e) => {
                warn!(course_id = course.id, error = ?e, "enroll request failed");
                EnrollmentOutcome::NetworkError
            }
        };

        info!(course_id = course.id, outcome = ?outcome, "enrollment attempted");
        outcome
    }

    /// Only students may enroll; the backend answers 403 for everyone else.
    pub fn can_enroll(&self) -> bool {
        self.session.has_role(Role::Student)
    }

    pub fn is_enrolling(&self, course_id: i64) -> bool {
        self.enrolling.is_held(&course_id)
    }

    pub async fn my_enrollments(&self) -> Result<Vec<Enrollment>, AppError> {
        let user = self.session.require_user()?;
        let response = self.session.client().student_enrollments(user.id).await?;
        fetch_json(response, "Failed to fetch your enrolled courses")
    }
}

fn classify_rejection(status: u16, body: &Value) -> EnrollmentOutcome {
    let error = first_message(body, &["error"]);

    if status == 400 && error.as_deref().is_some_and(|e| e.contains("already enrolled")) {
        return EnrollmentOutcome::AlreadyEnrolled;
    }
    if status == 403 {
        return EnrollmentOutcome::Restricted(
            error.unwrap_or_else(|| "You do not have permission to enroll in this course.".to_string()),
        );
    }
    EnrollmentOutcome::Failed(
        first_message(body, &["error", "message"]).unwrap_or_else(|| "Unable to enroll in this course. Please try again.".to_string()),
    )
}
