pub mod audit_query;
pub mod audit_recorder;
pub mod export;
pub mod investigation;

pub use audit_query::{AuditPage, AuditQueryService, AuditStatistics, BucketSize, TimeBucket};
pub use audit_recorder::AuditRecorder;
pub use export::{ExportFile, ExportFormat};
pub use investigation::{InvestigationContext, InvestigationService};
