use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to write audit log: {0}")]
    LogWriteFailed(String),

    #[error("Failed to export audit log: {0}")]
    ExportFailed(String),

    #[error("Stored audit event {id} is corrupt: {reason}")]
    CorruptEvent { id: i64, reason: String },
}
