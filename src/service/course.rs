use crate::error::AppError;
use crate::models::course::{Course, CourseRequest};
use crate::models::lesson::{Lesson, total_duration};
use crate::service::auth::SessionContext;
use crate::service::in_flight::InFlight;
use crate::service::service_util::{expect_success, fetch_json};
use tracing::{info, warn};
use validator::Validate;

/// A course together with its lessons, in backend order.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDetail {
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

impl CourseDetail {
    pub fn total_duration(&self) -> i64 {
        total_duration(&self.lessons)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CourseWrite {
    Create,
    Update(i64),
    Delete(i64),
}

pub struct CourseService<'a> {
    session: &'a SessionContext,
    writes: InFlight<CourseWrite>,
}

impl<'a> CourseService<'a> {
    pub fn new(session: &'a SessionContext) -> Self {
        CourseService {
            session,
            writes: InFlight::new(),
        }
    }

    pub async fn list(&self) -> Result<Vec<Course>, AppError> {
        let response = self.session.client().list_courses().await?;
        fetch_json(response, "Failed to fetch courses")
    }

    /// Course and lesson list are fetched concurrently; either failing fails the whole screen.
    pub async fn detail(&self, course_id: i64) -> Result<CourseDetail, AppError> {
        let client = self.session.client();
        let (course, lessons) = tokio::join!(client.get_course(course_id), client.list_lessons(course_id));
        let (course, lessons) = (course?, lessons?);

        const FAILED: &str = "Failed to fetch course details";
        let course: Course = fetch_json(course, FAILED)?;
        let lessons: Vec<Lesson> = fetch_json(lessons, FAILED)?;
        Ok(CourseDetail { course, lessons })
    }

    /// Creates a course, or updates `existing` when given.
    pub async fn save(&self, existing: Option<&Course>, request: &CourseRequest) -> Result<(), AppError> {
        request.validate()?;

        let key = existing.map_or(CourseWrite::Create, |course| CourseWrite::Update(course.id));
        let _permit = self.writes.acquire(key)?;

        let client = self.session.client();
        let response = match existing {
            Some(course) => client.update_course(course.id, request).await?,
            None => client.create_course(request).await?,
        };
        expect_success(response, &["detail", "message"], "Failed to save course")
            .inspect_err(|e| warn!(course_id = ?existing.map(|c| c.id), error = %e, "course save rejected"))?;

        info!(course_id = ?existing.map(|c| c.id), title = %request.title, "course saved");
        Ok(())
    }

    pub async fn delete(&self, course_id: i64) -> Result<(), AppError> {
        let _permit = self.writes.acquire(CourseWrite::Delete(course_id))?;
        let response = self.session.client().delete_course(course_id).await?;
        expect_success(response, &["message", "detail"], "Failed to delete course")?;
        info!(course_id, "course deleted");
        Ok(())
    }

    pub fn can_create(&self) -> bool {
        self.session.user().is_some_and(|user| user.can_create_course())
    }

    pub fn can_edit(&self, course: &Course) -> bool {
        self.session.can_edit_course(course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoint::HttpMethod;
    use crate::models::user::Role;
    use crate::test_utils::{harness, logged_in, sample_course, sample_course_json};
    use serde_json::json;

    #[tokio::test]
    async fn list_courses_is_public() {
        let h = harness();
        h.mock.push_json(200, json!([sample_course_json(1, "alice"), sample_course_json(2, "bob")]));

        let courses = CourseService::new(&h.session).list().await.unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[1].instructor, "bob");
        assert_eq!(h.mock.requests()[0].bearer, None);
    }

    #[tokio::test]
    async fn list_failure_has_fixed_message() {
        let h = harness();
        h.mock.push_json(500, json!({"detail": "boom"}));
        let err = CourseService::new(&h.session).list().await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to fetch courses");
    }

    #[tokio::test]
    async fn detail_fetches_course_and_lessons() {
        let h = logged_in(Role::Student).await;
        h.mock.push_json(200, sample_course_json(4, "alice"));
        h.mock.push_json(
            200,
            json!([
                {"id": 1, "title": "Intro", "content": "Hello", "video_link": "", "duration": 15},
                {"id": 2, "title": "Setup", "content": "Install", "video_link": "https://example.com/v", "duration": 30}
            ]),
        );

        let detail = CourseService::new(&h.session).detail(4).await.unwrap();
        assert_eq!(detail.course.id, 4);
        assert_eq!(detail.lessons[0].video_link, None);
        assert_eq!(detail.total_duration(), 45);

        let mut paths = h.mock.paths();
        paths.sort();
        assert_eq!(paths, vec!["/courses/4/".to_string(), "/courses/4/lessons/".to_string()]);
    }

    #[tokio::test]
    async fn detail_fails_when_lessons_fail() {
        let h = harness();
        h.mock.push_json(200, sample_course_json(4, "alice"));
        h.mock.push_json(404, json!({"detail": "Not found."}));

        let err = CourseService::new(&h.session).detail(4).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to fetch course details");
    }

    #[tokio::test]
    async fn create_posts_to_create_endpoint() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_json(201, sample_course_json(9, "alice"));

        let service = CourseService::new(&h.session);
        assert!(service.can_create());
        service.save(None, &CourseRequest::new("Rust", "Ownership and borrowing")).await.unwrap();

        let sent = h.mock.requests();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].path, "/courses/create/");
        assert_eq!(sent[0].body, Some(json!({"title": "Rust", "description": "Ownership and borrowing"})));
        assert!(sent[0].bearer.is_some());
    }

    #[tokio::test]
    async fn update_puts_to_edit_endpoint() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_json(200, sample_course_json(3, "alice"));
        let course = sample_course(3, "alice");

        CourseService::new(&h.session)
            .save(Some(&course), &CourseRequest::from(&course))
            .await
            .unwrap();

        let sent = h.mock.requests();
        assert_eq!(sent[0].method, HttpMethod::Put);
        assert_eq!(sent[0].path, "/courses/3/edit/");
    }

    #[tokio::test]
    async fn save_surfaces_server_detail() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_json(403, json!({"detail": "You do not have permission to perform this action."}));

        let err = CourseService::new(&h.session)
            .save(None, &CourseRequest::new("Rust", "Ownership"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.user_message(), "You do not have permission to perform this action.");
    }

    #[tokio::test]
    async fn save_with_blank_title_never_reaches_backend() {
        let h = logged_in(Role::Instructor).await;
        let err = CourseService::new(&h.session)
            .save(None, &CourseRequest::new("  ", "Ownership"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(h.mock.requests().is_empty());
    }

    #[tokio::test]
    async fn concurrent_saves_of_same_course_are_refused() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_json(200, sample_course_json(3, "alice"));
        let course = sample_course(3, "alice");
        let request = CourseRequest::from(&course);
        let service = CourseService::new(&h.session);

        let (first, second) = tokio::join!(service.save(Some(&course), &request), service.save(Some(&course), &request));
        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::InProgress)));
        assert_eq!(h.mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn delete_uses_message_key() {
        let h = logged_in(Role::Instructor).await;
        h.mock.push_json(400, json!({"message": "Course has enrollments"}));
        let err = CourseService::new(&h.session).delete(3).await.unwrap_err();
        assert_eq!(err.user_message(), "Course has enrollments");

        h.mock.push_status(204, "");
        CourseService::new(&h.session).delete(3).await.unwrap();
        assert_eq!(h.mock.requests()[1].method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn students_cannot_create_or_edit() {
        let h = logged_in(Role::Student).await;
        let service = CourseService::new(&h.session);
        assert!(!service.can_create());
        assert!(!service.can_edit(&sample_course(1, "alice")));
    }
}
