use crate::models::course::Course;
use crate::models::not_blank;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// The logged-in user as known to the client.
///
/// Built from the decoded access-token claims and the username typed at login.
/// Role checks made against this record only drive what the interface offers;
/// the backend re-validates authorization on every request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Admins can edit every course; instructors can edit courses whose instructor
    /// label contains their username.
    ///
    /// The label match is a substring test, so an instructor named "Al" also
    /// matches a course taught by "Alice". It stays this way until the backend
    /// exposes an owner id on courses.
    pub fn can_edit_course(&self, course: &Course) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Instructor => course.instructor.contains(&self.username),
            Role::Student => false,
        }
    }

    pub fn can_create_course(&self) -> bool {
        matches!(self.role, Role::Instructor | Role::Admin)
    }
}

#[derive(Serialize, Deserialize, Clone, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(custom(function = "not_blank"))]
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize, Deserialize, Clone, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(custom(function = "self_service_role"))]
    pub role: Role,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Admin accounts are never created through self-service registration.
fn self_service_role(role: &Role) -> Result<(), ValidationError> {
    if *role == Role::Admin {
        return Err(ValidationError::new("role").with_message(Cow::Borrowed("Choose either student or instructor")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_course;

    fn user(username: &str, role: Role) -> User {
        User {
            id: 1,
            username: username.to_string(),
            role,
        }
    }

    #[test]
    fn role_round_trips_through_lowercase_names() {
        assert_eq!("Instructor".parse::<Role>(), Ok(Role::Instructor));
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn has_role_is_an_exact_match() {
        assert!(user("bob", Role::Student).has_role(Role::Student));
        assert!(!user("bob", Role::Student).has_role(Role::Admin));
        assert!(!user("root", Role::Admin).has_role(Role::Instructor));
    }

    #[test]
    fn admin_can_edit_any_course() {
        let course = sample_course(1, "Jane Doe");
        assert!(user("root", Role::Admin).can_edit_course(&course));
    }

    #[test]
    fn instructor_edits_courses_labelled_with_username() {
        let course = sample_course(1, "alice (Alice Smith)");
        assert!(user("alice", Role::Instructor).can_edit_course(&course));
        assert!(!user("bob", Role::Instructor).can_edit_course(&course));
        assert!(!user("alice", Role::Student).can_edit_course(&course));
    }

    #[test]
    fn instructor_label_match_is_a_substring_test() {
        let course = sample_course(1, "Alice");
        assert!(user("Al", Role::Instructor).can_edit_course(&course));
    }

    #[test]
    fn register_request_validation() {
        let mut request = RegisterRequest {
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password: "secret1".to_string(),
            role: Role::Student,
        };
        assert!(request.validate().is_ok());

        request.password = "short".to_string();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        request.password = "secret1".to_string();
        request.role = Role::Admin;
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("role"));
    }

    #[test]
    fn login_request_rejects_blank_fields_and_hides_password() {
        let request = LoginRequest::new("  ", "hunter2");
        assert!(request.validate().is_err());
        assert!(!format!("{:?}", request).contains("hunter2"));
    }
}
