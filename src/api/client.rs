use crate::api::endpoint::Endpoint;
use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::AppError;
use crate::models::course::CourseRequest;
use crate::models::lesson::LessonRequest;
use crate::models::session::RefreshRequest;
use crate::models::user::{LoginRequest, RegisterRequest};
use crate::storage::PersistedSession;
use serde::Serialize;
use std::sync::Arc;

/// Gateway to the REST backend.
///
/// Each method maps one logical operation to its endpoint and returns the raw
/// response. The bearer token is read from the persisted session on every call.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: PersistedSession,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, tokens: PersistedSession) -> Self {
        Self { transport, tokens }
    }

    pub async fn send(&self, endpoint: Endpoint, body: Option<serde_json::Value>) -> Result<ApiResponse, AppError> {
        let mut request = ApiRequest::new(endpoint.method(), endpoint.path());
        request.body = body;
        if endpoint.attaches_token() {
            request.bearer = self.tokens.access_token();
        }
        self.transport.send(request).await
    }

    async fn send_json<B: Serialize>(&self, endpoint: Endpoint, body: &B) -> Result<ApiResponse, AppError> {
        let body = serde_json::to_value(body)?;
        self.send(endpoint, Some(body)).await
    }

    // Auth

    pub async fn register(&self, request: &RegisterRequest) -> Result<ApiResponse, AppError> {
        self.send_json(Endpoint::Register, request).await
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<ApiResponse, AppError> {
        self.send_json(Endpoint::Login, credentials).await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<ApiResponse, AppError> {
        self.send_json(
            Endpoint::Logout,
            &RefreshRequest {
                refresh: refresh_token.to_string(),
            },
        )
        .await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<ApiResponse, AppError> {
        self.send_json(
            Endpoint::TokenRefresh,
            &RefreshRequest {
                refresh: refresh_token.to_string(),
            },
        )
        .await
    }

    // Courses

    pub async fn list_courses(&self) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::Courses, None).await
    }

    pub async fn get_course(&self, id: i64) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::CourseDetail(id), None).await
    }

    pub async fn create_course(&self, request: &CourseRequest) -> Result<ApiResponse, AppError> {
        self.send_json(Endpoint::CourseCreate, request).await
    }

    pub async fn update_course(&self, id: i64, request: &CourseRequest) -> Result<ApiResponse, AppError> {
        self.send_json(Endpoint::CourseUpdate(id), request).await
    }

    pub async fn delete_course(&self, id: i64) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::CourseDelete(id), None).await
    }

    // Lessons

    pub async fn list_lessons(&self, course_id: i64) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::Lessons(course_id), None).await
    }

    pub async fn get_lesson(&self, id: i64) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::LessonDetail(id), None).await
    }

    pub async fn create_lesson(&self, course_id: i64, request: &LessonRequest) -> Result<ApiResponse, AppError> {
        self.send_json(Endpoint::LessonCreate(course_id), request).await
    }

    pub async fn update_lesson(&self, id: i64, request: &LessonRequest) -> Result<ApiResponse, AppError> {
        self.send_json(Endpoint::LessonUpdate(id), request).await
    }

    pub async fn delete_lesson(&self, id: i64) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::LessonDelete(id), None).await
    }

    // Enrollment

    pub async fn enroll(&self, course_id: i64) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::Enroll(course_id), None).await
    }

    pub async fn student_enrollments(&self, student_id: i64) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::StudentEnrollments(student_id), None).await
    }

    // Instructor

    pub async fn instructor_courses(&self) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::InstructorCourses, None).await
    }

    pub async fn course_students(&self, course_id: i64) -> Result<ApiResponse, AppError> {
        self.send(Endpoint::CourseStudents(course_id), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoint::HttpMethod;
    use crate::storage::{ACCESS_TOKEN_KEY, KeyValueStore, MemoryStore};
    use crate::test_utils::MockTransport;
    use serde_json::json;

    fn client() -> (ApiClient, Arc<MockTransport>, Arc<MemoryStore>) {
        let mock = Arc::new(MockTransport::new());
        let store = Arc::new(MemoryStore::new());
        let client = ApiClient::new(mock.clone(), PersistedSession::new(store.clone()));
        (client, mock, store)
    }

    #[tokio::test]
    async fn token_is_read_at_call_time() {
        let (client, mock, store) = client();
        mock.push_status(200, "[]");
        mock.push_status(200, "[]");

        client.list_courses().await.unwrap();
        store.set(ACCESS_TOKEN_KEY, "a.b.c").unwrap();
        client.list_courses().await.unwrap();

        let sent = mock.requests();
        assert_eq!(sent[0].bearer, None);
        assert_eq!(sent[1].bearer.as_deref(), Some("a.b.c"));
    }

    #[tokio::test]
    async fn login_never_sends_stored_token() {
        let (client, mock, store) = client();
        store.set(ACCESS_TOKEN_KEY, "stale.token.value").unwrap();
        mock.push_status(401, r#"{"detail": "No active account"}"#);

        let response = client.login(&LoginRequest::new("alice", "secret1")).await.unwrap();
        assert_eq!(response.status, 401);

        let sent = mock.requests();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].path, "/login/");
        assert_eq!(sent[0].bearer, None);
        assert_eq!(sent[0].body, Some(json!({"username": "alice", "password": "secret1"})));
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let (client, mock, _) = client();
        mock.push_status(403, r#"{"detail": "Forbidden"}"#);
        let response = client.delete_course(3).await.unwrap();
        assert_eq!(response.status, 403);
        assert_eq!(mock.requests()[0].method, HttpMethod::Delete);
        assert_eq!(mock.requests()[0].path, "/courses/3/edit/");
    }

    #[tokio::test]
    async fn logout_posts_refresh_token() {
        let (client, mock, _) = client();
        mock.push_status(205, "");
        client.logout("refresh-token").await.unwrap();
        assert_eq!(mock.requests()[0].body, Some(json!({"refresh": "refresh-token"})));
    }
}
