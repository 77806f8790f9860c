// API-facing error types
pub mod admin;

pub use admin::AdminError;
