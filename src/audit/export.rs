use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use std::str::FromStr;

use crate::errors::InternalError;
use crate::errors::internal::AuditError;
use crate::types::internal::audit::AuditEvent;

const UTF8_BOM: &str = "\u{feff}";

const CSV_HEADER: [&str; 9] = [
    "ID",
    "Timestamp",
    "Actor",
    "Action",
    "Entity Type",
    "Entity ID",
    "IP Address",
    "User Agent",
    "Changes",
];

/// Output format of an audit export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(InternalError::validation(
                "format",
                format!("unsupported export format '{}', expected csv or json", other),
            )),
        }
    }
}

/// A rendered export ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub row_count: usize,
}

/// Render events in `format`
pub fn render(events: &[AuditEvent], format: ExportFormat, now: DateTime<Utc>) -> Result<ExportFile, InternalError> {
    let body = match format {
        ExportFormat::Csv => render_csv(events).into_bytes(),
        ExportFormat::Json => serde_json::to_vec(events)
            .map_err(|e| AuditError::ExportFailed(format!("Failed to serialize events: {}", e)))?,
    };

    Ok(ExportFile {
        filename: export_filename(format, now),
        content_type: format.content_type(),
        body,
        row_count: events.len(),
    })
}

/// BOM-prefixed CSV with one header row and one row per event
pub fn render_csv(events: &[AuditEvent]) -> String {
    let mut out = String::from(UTF8_BOM);
    out.push_str(&CSV_HEADER.join(","));
    out.push_str("\r\n");

    for event in events {
        let changes = event.changes.as_ref().map(|c| c.to_string());
        let fields = [
            Some(event.id.to_string()),
            Some(format_timestamp(event.created_at)),
            Some(event.actor_user_id.clone()),
            Some(event.action.as_str().to_string()),
            Some(event.entity_type.as_str().to_string()),
            event.entity_id.clone(),
            event.ip_address.clone(),
            event.user_agent.clone(),
            changes,
        ];

        let row: Vec<String> = fields
            .iter()
            .map(|field| escape_csv_field(field.as_deref()))
            .collect();
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }

    out
}

/// Quote a field when it contains a delimiter, quote or line break
///
/// Absent values render as an empty field.
pub fn escape_csv_field(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `audit-log-<date>-<time>-<millis>-<random>.<ext>`
pub fn export_filename(format: ExportFormat, now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::rng().random();
    format!(
        "audit-log-{}-{:08x}.{}",
        now.format("%Y%m%d-%H%M%S-%3f"),
        suffix,
        format.extension()
    )
}
