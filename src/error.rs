pub mod app_error;
pub mod server_message;

pub use app_error::{AppError, NETWORK_ERROR_MESSAGE};
pub use server_message::ServerError;
