use crate::models::not_blank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Display label of the teaching instructor, as rendered by the backend.
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub enrolled_count: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
pub struct CourseRequest {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"), length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: String,
}

impl CourseRequest {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl From<&Course> for CourseRequest {
    fn from(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
        }
    }
}
