pub mod auth;
pub mod course;
pub mod enrollment;
pub mod in_flight;
pub mod instructor;
pub mod lesson;
pub mod service_util;
