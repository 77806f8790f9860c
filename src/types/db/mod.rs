// Database entities - SeaORM models
pub mod audit_event;
pub mod csrf_token;
pub mod ip_allowlist;
pub mod password_history;
