use crate::models::course::Course;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A related record as the backend chose to render it: nested object, bare id,
/// or display string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Related<T> {
    Expanded(T),
    Id(i64),
    Label(String),
}

pub trait Identified {
    fn id(&self) -> i64;
    fn label(&self) -> String;
}

impl Identified for Course {
    fn id(&self) -> i64 {
        self.id
    }

    fn label(&self) -> String {
        self.title.clone()
    }
}

impl<T: Identified> Related<T> {
    pub fn id(&self) -> Option<i64> {
        match self {
            Related::Expanded(value) => Some(value.id()),
            Related::Id(id) => Some(*id),
            Related::Label(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Related::Expanded(value) => value.label(),
            Related::Id(id) => format!("#{}", id),
            Related::Label(label) => label.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StudentSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identified for StudentSummary {
    fn id(&self) -> i64 {
        self.id
    }

    fn label(&self) -> String {
        self.username.clone()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub id: i64,
    pub student: Related<StudentSummary>,
    pub course: Related<Course>,
    pub enrolled_at: DateTime<Utc>,
}
