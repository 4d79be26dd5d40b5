use crate::error::AppError;
use crate::models::lesson::{Lesson, LessonRequest};
use crate::service::auth::SessionContext;
use crate::service::service_util::{expect_success, fetch_json};
use tracing::info;
use validator::Validate;

pub struct LessonService<'a> {
    session: &'a SessionContext,
}

impl<'a> LessonService<'a> {
    pub fn new(session: &'a SessionContext) -> Self {
        LessonService { session }
    }

    pub async fn get(&self, lesson_id: i64) -> Result<Lesson, AppError> {
        let response = self.session.client().get_lesson(lesson_id).await?;
        fetch_json(response, "Failed to fetch lesson")
    }

    /// Adds a lesson to `course_id`, or updates `existing` when given.
    pub async fn save(&self, course_id: i64, existing: Option<&Lesson>, request: &LessonRequest) -> Result<(), AppError> {
        request.validate()?;

        let client = self.session.client();
        let response = match existing {
            Some(lesson) => client.update_lesson(lesson.id, request).await?,
            None => client.create_lesson(course_id, request).await?,
        };
        expect_success(response, &["detail", "message"], "Failed to save lesson")?;

        info!(course_id, lesson_id = ?existing.map(|l| l.id), duration = request.duration, "lesson saved");
        Ok(())
    }

    pub async fn delete(&self, lesson_id: i64) -> Result<(), AppError> {
        let response = self.session.client().delete_lesson(lesson_id).await?;
        expect_success(response, &["message", "detail"], "Failed to delete lesson")?;
        info!(lesson_id, "lesson deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoint::HttpMethod;
    use crate::models::user::Role;
    use crate::test_utils::{logged_in, sample_lesson};
    use serde_json::json;

    #[tokio::test]
    async fn create_posts_under_course() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_json(201, json!({"id": 5}));

        let request = LessonRequest::new("Intro", "Welcome", Some(" ".to_string()), 20);
        LessonService::new(&h.session).save(4, None, &request).await.unwrap();

        let sent = h.mock.requests();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].path, "/courses/4/lessons/create/");
        assert_eq!(sent[0].body, Some(json!({"title": "Intro", "content": "Welcome", "duration": 20})));
    }

    #[tokio::test]
    async fn update_targets_lesson_edit_endpoint() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_json(200, json!({"id": 5}));
        let lesson = sample_lesson(5, 30);

        LessonService::new(&h.session)
            .save(4, Some(&lesson), &LessonRequest::from(&lesson))
            .await
            .unwrap();

        let sent = h.mock.requests();
        assert_eq!(sent[0].method, HttpMethod::Put);
        assert_eq!(sent[0].path, "/lessons/5/edit/");
    }

    #[tokio::test]
    async fn out_of_range_duration_is_rejected_locally() {
        let h = logged_in(Role::Instructor).await;
        let request = LessonRequest::new("Intro", "Welcome", None, 0);
        let err = LessonService::new(&h.session).save(4, None, &request).await.unwrap_err();
        assert_eq!(err.user_message(), "Duration must be between 1 and 600 minutes");
        assert!(h.mock.requests().is_empty());
    }

    #[tokio::test]
    async fn save_failure_falls_back_to_generic_message() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_status(500, "");
        let request = LessonRequest::new("Intro", "Welcome", None, 10);
        let err = LessonService::new(&h.session).save(4, None, &request).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to save lesson");
    }

    #[tokio::test]
    async fn delete_and_get() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_json(200, json!({"id": 5, "title": "Intro", "content": "", "duration": 12}));
        h.mock.push_status(204, "");

        let service = LessonService::new(&h.session);
        let lesson = service.get(5).await.unwrap();
        assert_eq!(lesson.duration, 12);
        service.delete(5).await.unwrap();

        assert_eq!(h.mock.paths(), vec!["/lessons/5/".to_string(), "/lessons/5/edit/".to_string()]);
    }
}
