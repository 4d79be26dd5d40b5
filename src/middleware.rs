use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::AppError;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Request ID that is attached to every outgoing request for tracking
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport wrapper that tags each request with an ID and logs request/response information
pub struct RequestLogger<T> {
    inner: T,
}

impl<T> RequestLogger<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for RequestLogger<T> {
    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, AppError> {
        let request_id = request.request_id.clone().unwrap_or_else(|| RequestId::new().0);
        request.request_id = Some(request_id.clone());

        let method = request.method;
        let path = request.path.clone();
        let started = Instant::now();

        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            authenticated = request.bearer.is_some(),
            "outgoing request"
        );

        let result = self.inner.send(request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        // Log response with appropriate level based on status
        match &result {
            Ok(response) if response.is_success() => {
                info!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status = response.status,
                    elapsed_ms,
                    "request completed"
                );
            }
            Ok(response) => {
                warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status = response.status,
                    elapsed_ms,
                    "request completed with error"
                );
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    error = ?e,
                    elapsed_ms,
                    "request failed"
                );
            }
        }

        result
    }
}
