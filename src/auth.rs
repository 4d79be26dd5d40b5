use crate::error::AppError;
use crate::models::user::Role;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Claims read from the payload segment of an access token.
///
/// The signature is not checked: the client cannot verify it and does not need
/// to. These claims only decide what the interface shows; every request is
/// authorized again by the backend from the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(deserialize_with = "numeric_id")]
    pub user_id: i64,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Missing roles default to student. Unrecognised roles are also treated as
    /// student so that an unexpected claim never widens what the user can do.
    pub fn role(&self) -> Role {
        match self.role.as_deref() {
            None => Role::Student,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(role = %raw, user_id = self.user_id, "unrecognised role claim, treating as student");
                Role::Student
            }),
        }
    }
}

pub(crate) fn payload_segment(token: &str) -> Option<&str> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    if payload.is_empty() { None } else { Some(payload) }
}

pub fn decode_claims(access_token: &str) -> Result<TokenClaims, AppError> {
    let payload = payload_segment(access_token).ok_or_else(|| AppError::InvalidToken("missing payload segment".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AppError::InvalidToken(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice::<TokenClaims>(&bytes).map_err(|e| AppError::InvalidToken(format!("payload is not valid claims JSON: {}", e)))
}

pub fn bearer_header(access_token: &str) -> String {
    format!("Bearer {}", access_token)
}

fn numeric_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(id) => Ok(id),
        NumberOrString::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_token;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn decode_claims_valid() {
        let token = make_token(&json!({"user_id": 7, "role": "instructor", "exp": 1_900_000_000}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role(), Role::Instructor);
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn decode_claims_defaults_role_to_student() {
        let token = make_token(&json!({"user_id": 3}));
        assert_eq!(decode_claims(&token).unwrap().role(), Role::Student);
    }

    #[test]
    fn decode_claims_unknown_role_is_student() {
        let token = make_token(&json!({"user_id": 3, "role": "superuser"}));
        assert_eq!(decode_claims(&token).unwrap().role(), Role::Student);
    }

    #[test]
    fn decode_claims_accepts_string_user_id() {
        let token = make_token(&json!({"user_id": "42", "role": "admin"}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role(), Role::Admin);
    }

    #[test]
    fn decode_claims_tolerates_padding() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(br#"{"user_id":1}"#);
        let token = format!("h.{}.s", payload);
        assert_eq!(decode_claims(&token).unwrap().user_id, 1);
    }

    #[test]
    fn decode_claims_missing_delimiter() {
        assert!(matches!(decode_claims("no-delimiter"), Err(AppError::InvalidToken(_))));
        assert!(matches!(decode_claims("header."), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn decode_claims_missing_user_id() {
        let token = make_token(&json!({"role": "admin"}));
        assert!(matches!(decode_claims(&token), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn bearer_header_format() {
        assert_eq!(bearer_header("abc"), "Bearer abc");
    }

    proptest! {
        #[test]
        fn decode_claims_never_panics(token in ".{0,64}") {
            let _ = decode_claims(&token);
        }

        #[test]
        fn decode_claims_round_trips_user_id(user_id in any::<i64>()) {
            let token = make_token(&json!({"user_id": user_id}));
            prop_assert_eq!(decode_claims(&token).unwrap().user_id, user_id);
        }
    }
}
