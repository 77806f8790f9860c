// API request/response models
pub mod allowlist;
pub mod audit;
pub mod common;
pub mod csrf;
