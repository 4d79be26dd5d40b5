use crate::api::transport::ApiResponse;
use crate::error::AppError;
use crate::error::server_message::message_or;
use serde::de::DeserializeOwned;

/// Parses a successful response body. Any other status becomes an
/// `AppError::Api` carrying the fixed message shown for this screen.
pub fn fetch_json<T: DeserializeOwned>(response: ApiResponse, failure_message: &str) -> Result<T, AppError> {
    if !response.is_success() {
        return Err(AppError::api(response.status, failure_message));
    }
    response.json()
}

/// Passes a successful response through. A rejection carries the server's
/// message from the first of `keys` present, or `fallback`.
pub fn expect_success(response: ApiResponse, keys: &[&str], fallback: &str) -> Result<ApiResponse, AppError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(AppError::api(response.status, message_or(&response.body, keys, fallback)))
    }
}
