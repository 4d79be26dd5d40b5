pub mod client;
pub mod endpoint;
pub mod transport;

pub use client::ApiClient;
pub use endpoint::{Endpoint, HttpMethod};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
