use crate::api::client::ApiClient;
use crate::auth::decode_claims;
use crate::error::app_error::first_validation_message;
use crate::error::server_message::message_or;
use crate::error::{AppError, NETWORK_ERROR_MESSAGE, ServerError};
use crate::models::REQUIRED_FIELDS_MESSAGE;
use crate::models::course::Course;
use crate::models::session::{RefreshResponse, Session, SessionState, TokenPair};
use crate::models::user::{LoginRequest, RegisterRequest, Role, User};
use crate::storage::{PersistedSession, StoredSession};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};
use validator::Validate;

const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// What happened during a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Tokens stored and the session is authenticated.
    Success(User),
    /// Nothing was stored; `message` is what the sign-in form shows.
    Failure { message: String },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success(_))
    }
}

/// What happened during a registration attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Registered,
    /// The error payload, as the server sent it when the server rejected the request.
    Rejected(ServerError),
}

/// Who is logged in and what they can do, for the lifetime of the process.
///
/// The in-memory state and the persisted session are updated together by
/// every mutating operation. Handed to the router and the screen services by
/// reference, so tests can build one over an in-memory store and a scripted
/// transport.
pub struct SessionContext {
    client: ApiClient,
    store: PersistedSession,
    state: RwLock<SessionState>,
}

impl SessionContext {
    pub fn new(client: ApiClient, store: PersistedSession) -> Self {
        Self {
            client,
            store,
            state: RwLock::new(SessionState::Uninitialized),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Restores the session from storage. Anything short of a complete session
    /// is discarded and the context starts anonymous.
    pub fn initialize(&self) -> SessionState {
        self.set_state(SessionState::Loading);

        let next = match self.store.load() {
            StoredSession::Complete(session) => {
                info!(user_id = session.user.id, role = %session.user.role, "restored persisted session");
                SessionState::Authenticated(session.user)
            }
            StoredSession::Empty => SessionState::Anonymous,
            StoredSession::Corrupt => {
                warn!("persisted session is incomplete or corrupt, clearing it");
                if let Err(e) = self.store.clear() {
                    warn!(error = ?e, "failed to clear corrupt session");
                }
                SessionState::Anonymous
            }
        };

        self.set_state(next.clone());
        next
    }

    pub fn state(&self) -> SessionState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user().cloned()
    }

    pub fn require_user(&self) -> Result<User, AppError> {
        self.user().ok_or(AppError::Unauthorized)
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// A user is loaded and an access token is still stored.
    pub fn is_authenticated(&self) -> bool {
        self.user().is_some() && self.store.access_token().is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.state().user().is_some_and(|user| user.has_role(role))
    }

    pub fn can_edit_course(&self, course: &Course) -> bool {
        self.state().user().is_some_and(|user| user.can_edit_course(course))
    }

    pub async fn login(&self, credentials: &LoginRequest) -> LoginOutcome {
        if let Err(errors) = credentials.validate() {
            return LoginOutcome::Failure {
                message: first_validation_message(&errors).unwrap_or_else(|| REQUIRED_FIELDS_MESSAGE.to_string()),
            };
        }

        let response = match self.client.login(credentials).await {
            Ok(response) => response,
            Err(e) => {
                warn!(username = %credentials.username, error = ?e, "login request failed");
                return failure(NETWORK_ERROR_MESSAGE);
            }
        };

        if !response.is_success() {
            let message = message_or(&response.body, &["detail", "non_field_errors"], LOGIN_FAILED_MESSAGE);
            info!(username = %credentials.username, status = response.status, "login rejected");
            return LoginOutcome::Failure { message };
        }

        let tokens: TokenPair = match response.json() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = ?e, "login response did not contain tokens");
                return failure(LOGIN_FAILED_MESSAGE);
            }
        };

        let claims = match decode_claims(&tokens.access) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = ?e, "login returned an unreadable access token");
                return failure(LOGIN_FAILED_MESSAGE);
            }
        };

        let user = User {
            id: claims.user_id,
            username: credentials.username.clone(),
            role: claims.role(),
        };
        let session = Session {
            access_token: tokens.access,
            refresh_token: tokens.refresh,
            user: user.clone(),
        };

        if let Err(e) = self.store.save(&session) {
            warn!(error = ?e, "failed to persist session after login");
            return failure("Could not save your session. Please try again.");
        }

        self.set_state(SessionState::Authenticated(user.clone()));
        info!(user_id = user.id, role = %user.role, "logged in");
        LoginOutcome::Success(user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> RegisterOutcome {
        if let Err(errors) = request.validate() {
            return RegisterOutcome::Rejected(ServerError::from_validation(&errors));
        }

        match self.client.register(request).await {
            Ok(response) if response.is_success() => {
                info!(username = %request.username, role = %request.role, "account registered");
                RegisterOutcome::Registered
            }
            Ok(response) => {
                info!(username = %request.username, status = response.status, "registration rejected");
                RegisterOutcome::Rejected(ServerError::from_body(&response.body))
            }
            Err(e) => {
                warn!(username = %request.username, error = ?e, "registration request failed");
                RegisterOutcome::Rejected(ServerError::Message(NETWORK_ERROR_MESSAGE.to_string()))
            }
        }
    }

    /// Asks the backend to revoke the refresh token, then clears the local
    /// session whatever the backend answered.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.refresh_token() {
            match self.client.logout(&refresh_token).await {
                Ok(response) if !response.is_success() => {
                    debug!(status = response.status, "remote logout rejected");
                }
                Ok(_) => {}
                Err(e) => warn!(error = ?e, "remote logout failed"),
            }
        }

        let user_id = self.user().map(|u| u.id);
        self.clear_local();
        info!(user_id = ?user_id, "logged out");
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// A 401 means the refresh token is no longer accepted and ends the session.
    pub async fn refresh_access_token(&self) -> Result<(), AppError> {
        let refresh_token = self.store.refresh_token().ok_or(AppError::Unauthorized)?;
        let response = self.client.refresh_token(&refresh_token).await?;

        if response.status == 401 {
            info!("refresh token rejected, ending session");
            self.clear_local();
            return Err(AppError::Unauthorized);
        }
        if !response.is_success() {
            let message = message_or(&response.body, &["detail"], "Failed to refresh session");
            return Err(AppError::api(response.status, message));
        }

        let tokens: RefreshResponse = response.json()?;
        let claims = decode_claims(&tokens.access)?;
        if let Some(user) = self.user()
            && claims.user_id != user.id
        {
            warn!(expected = user.id, received = claims.user_id, "refreshed token belongs to another user");
            self.clear_local();
            return Err(AppError::InvalidToken("refreshed token belongs to another user".to_string()));
        }

        self.store.set_access_token(&tokens.access)?;
        if let Some(rotated) = &tokens.refresh {
            self.store.set_refresh_token(rotated)?;
        }
        debug!(user_id = claims.user_id, "access token refreshed");
        Ok(())
    }

    fn clear_local(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = ?e, "failed to clear persisted session");
        }
        self.set_state(SessionState::Anonymous);
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

fn failure(message: &str) -> LoginOutcome {
    LoginOutcome::Failure { message: message.to_string() }
}
