pub mod audit;
pub mod audit_filter;
pub mod auth;
pub mod context;
