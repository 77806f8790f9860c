// Services layer - Guards and policy
pub mod csrf_service;
pub mod ip_allowlist_service;
pub mod password_history_service;
pub mod permissions;

pub use csrf_service::{CsrfService, IssuedCsrfToken};
pub use ip_allowlist_service::{ErrorPolicy, IpAllowlistService};
pub use password_history_service::PasswordHistoryService;
pub use permissions::{Permission, PermissionOracle, StaticRoleTable};
