pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod session;
pub mod user;

use std::borrow::Cow;
use validator::ValidationError;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields";

/// Rejects empty and whitespace-only input.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED_FIELDS_MESSAGE)));
    }
    Ok(())
}
