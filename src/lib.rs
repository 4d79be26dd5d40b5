pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod router;
pub mod service;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::api::client::ApiClient;
use crate::api::transport::HttpTransport;
use crate::error::AppError;
use crate::middleware::RequestLogger;
use crate::service::auth::SessionContext;
use crate::storage::{FileStore, PersistedSession};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG overrides the configured level, e.g.
    //   RUST_LOG=learnhub::api=debug
    //   RUST_LOG=info,learnhub::service=trace
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // stdout carries command output, so logs go to stderr.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    if json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Wires the HTTP transport, request logging and the file-backed session
/// store into an initialized [`SessionContext`].
pub fn build_session(config: &Config) -> Result<SessionContext, AppError> {
    let transport = RequestLogger::new(HttpTransport::new(&config.api)?);
    let store = PersistedSession::new(Arc::new(FileStore::new(&config.storage.path)));
    let client = ApiClient::new(Arc::new(transport), store.clone());

    let session = SessionContext::new(client, store);
    let state = session.initialize();
    info!(
        base_url = %config.api.base_url,
        session_file = %config.storage.path,
        authenticated = state.user().is_some(),
        "session initialized"
    );
    Ok(session)
}
