use crate::models::not_blank;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub video_link: Option<String>,
    /// Minutes.
    pub duration: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
pub struct LessonRequest {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Enter a valid video URL"))]
    pub video_link: Option<String>,
    #[validate(range(min = 1, max = 600, message = "Duration must be between 1 and 600 minutes"))]
    pub duration: i32,
}

impl LessonRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>, video_link: Option<String>, duration: i32) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            video_link: video_link.filter(|link| !link.trim().is_empty()),
            duration,
        }
    }
}

impl From<&Lesson> for LessonRequest {
    fn from(lesson: &Lesson) -> Self {
        Self::new(lesson.title.clone(), lesson.content.clone(), lesson.video_link.clone(), lesson.duration)
    }
}

pub fn total_duration(lessons: &[Lesson]) -> i64 {
    lessons.iter().map(|lesson| i64::from(lesson.duration)).sum()
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|link| !link.trim().is_empty()))
}
