use crate::api::client::ApiClient;
use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::AppError;
use crate::models::course::Course;
use crate::models::lesson::Lesson;
use crate::models::user::{Role, User};
use crate::service::auth::SessionContext;
use crate::storage::{MemoryStore, PersistedSession};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

pub enum MockReply {
    Response(ApiResponse),
    NetworkFailure,
}

/// Transport that replays scripted replies in order and records what was sent.
///
/// A reply is taken when the request is issued, then the send yields to the
/// runtime once so concurrent callers interleave the way they would against a
/// real server.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, status: u16, body: &str) {
        self.push(MockReply::Response(ApiResponse::new(status, body.as_bytes().to_vec())));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(MockReply::Response(ApiResponse::new(status, body.to_string().into_bytes())));
    }

    pub fn push_network_failure(&self) {
        self.push(MockReply::NetworkFailure);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn reset_requests(&self) {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    fn push(&self, reply: MockReply) {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner).push_back(reply);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AppError> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        let reply = self.replies.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        tokio::task::yield_now().await;

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::NetworkFailure) => Err(AppError::network("connection refused")),
            None => Err(AppError::network("no scripted reply")),
        }
    }
}

/// Unsigned token carrying `claims` as its payload segment.
pub fn make_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn login_body(user_id: i64, role: &str) -> Value {
    json!({
        "access": make_token(&json!({"user_id": user_id, "role": role})),
        "refresh": "refresh-token",
    })
}

pub fn sample_user(role: Role) -> User {
    User {
        id: 7,
        username: "alice".to_string(),
        role,
    }
}

pub fn sample_course(id: i64, instructor: &str) -> Course {
    Course {
        id,
        title: format!("Course {}", id),
        description: "An introductory course".to_string(),
        instructor: instructor.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        enrolled_count: 0,
    }
}

pub fn sample_course_json(id: i64, instructor: &str) -> Value {
    serde_json::to_value(sample_course(id, instructor)).unwrap()
}

pub fn sample_lesson(id: i64, duration: i32) -> Lesson {
    Lesson {
        id,
        title: format!("Lesson {}", id),
        content: "Read chapter one".to_string(),
        video_link: None,
        duration,
    }
}

pub struct Harness {
    pub session: SessionContext,
    pub mock: Arc<MockTransport>,
    pub store: Arc<MemoryStore>,
}

pub fn harness() -> Harness {
    let mock = Arc::new(MockTransport::new());
    let store = Arc::new(MemoryStore::new());
    let persisted = PersistedSession::new(store.clone());
    let client = ApiClient::new(mock.clone(), persisted.clone());
    let session = SessionContext::new(client, persisted);
    session.initialize();
    Harness { session, mock, store }
}

/// Harness already logged in as `alice` with the given role.
pub async fn logged_in(role: Role) -> Harness {
    let harness = harness();
    harness.mock.push_json(200, login_body(7, role.as_str()));
    let outcome = harness.session.login(&crate::models::user::LoginRequest::new("alice", "secret1")).await;
    assert!(outcome.is_success(), "login failed: {:?}", outcome);
    harness.mock.reset_requests();
    harness
}
