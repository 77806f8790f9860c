use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

use crate::errors::InternalError;
use crate::types::internal::audit::{AuditAction, EntityType};

/// Named relative time window usable instead of explicit bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickRange {
    LastHour,
    Last24Hours,
    Last7Days,
    Last30Days,
    Last90Days,
}

impl QuickRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastHour => "1h",
            Self::Last24Hours => "24h",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::Last90Days => "90d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::LastHour => Duration::hours(1),
            Self::Last24Hours => Duration::hours(24),
            Self::Last7Days => Duration::days(7),
            Self::Last30Days => Duration::days(30),
            Self::Last90Days => Duration::days(90),
        }
    }
}

impl fmt::Display for QuickRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuickRange {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1h" | "last-1h" => Ok(Self::LastHour),
            "24h" | "1d" | "last-24h" => Ok(Self::Last24Hours),
            "7d" | "last-7d" => Ok(Self::Last7Days),
            "30d" | "last-30d" => Ok(Self::Last30Days),
            "90d" | "last-90d" => Ok(Self::Last90Days),
            _ => Err(InternalError::validation(
                "range",
                format!("unknown quick range '{}', expected one of 1h, 24h, 7d, 30d, 90d", s),
            )),
        }
    }
}

/// Time constraint on an audit query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    Unbounded,
    Between {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    Quick(QuickRange),
}

impl TimeWindow {
    /// Build a window from the raw query inputs
    ///
    /// A quick range wins over explicit bounds when both are supplied.
    pub fn resolve(
        quick: Option<QuickRange>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, InternalError> {
        if let Some(range) = quick {
            return Ok(Self::Quick(range));
        }
        match (start, end) {
            (None, None) => Ok(Self::Unbounded),
            (Some(s), Some(e)) if s > e => Err(InternalError::validation(
                "start",
                "start must not be after end",
            )),
            (start, end) => Ok(Self::Between { start, end }),
        }
    }

    /// Inclusive lower and upper bounds relative to `now`
    pub fn bounds(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            Self::Unbounded => (None, None),
            Self::Between { start, end } => (*start, *end),
            Self::Quick(range) => (Some(now - range.duration()), Some(now)),
        }
    }
}

/// One-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u64 = 20;
    pub const MAX_PAGE_SIZE: u64 = 100;
    /// Row cap applied to exports instead of the interactive page size
    pub const EXPORT_LIMIT: u64 = 10_000;

    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Result<Self, InternalError> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(Self::DEFAULT_PAGE_SIZE);

        if page < 1 {
            return Err(InternalError::validation("page", "must be at least 1"));
        }
        if !(1..=Self::MAX_PAGE_SIZE).contains(&page_size) {
            return Err(InternalError::validation(
                "page_size",
                format!("must be between 1 and {}", Self::MAX_PAGE_SIZE),
            ));
        }

        // SQL offsets are signed 64-bit
        let offset = (page - 1).checked_mul(page_size);
        if offset.is_none_or(|offset| offset > i64::MAX as u64) {
            return Err(InternalError::validation("page", "is beyond the last addressable row"));
        }

        Ok(Self { page, page_size })
    }

    /// First page sized to hold a full export
    pub fn export() -> Self {
        Self {
            page: 1,
            page_size: Self::EXPORT_LIMIT,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Validated audit query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilters {
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<EntityType>,
    pub ip_address: Option<String>,
    /// Substring matched against the action and the changes payload
    pub text: Option<String>,
    pub window: TimeWindow,
    pub page: PageRequest,
}

impl AuditFilters {
    /// Same filters, widened to the export row cap
    pub fn for_export(&self) -> Self {
        Self {
            page: PageRequest::export(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_quick_range_takes_precedence_over_explicit_bounds() {
        let window = TimeWindow::resolve(Some(QuickRange::Last7Days), Some(at(1)), Some(at(2))).unwrap();
        assert_eq!(window, TimeWindow::Quick(QuickRange::Last7Days));
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let err = TimeWindow::resolve(None, Some(at(5)), Some(at(2))).unwrap_err();
        assert!(matches!(err, InternalError::Validation { ref field, .. } if field == "start"));
    }

    #[test]
    fn test_open_ended_bounds_are_allowed() {
        let window = TimeWindow::resolve(None, Some(at(5)), None).unwrap();
        assert_eq!(window.bounds(at(10)), (Some(at(5)), None));
    }

    #[test]
    fn test_quick_range_bounds_are_relative_to_now() {
        let window = TimeWindow::Quick(QuickRange::Last24Hours);
        let now = at(12);
        assert_eq!(window.bounds(now), (Some(now - Duration::hours(24)), Some(now)));
    }

    #[test]
    fn test_quick_range_parses_known_names() {
        assert_eq!("24h".parse::<QuickRange>().unwrap(), QuickRange::Last24Hours);
        assert_eq!("last-30d".parse::<QuickRange>().unwrap(), QuickRange::Last30Days);
        assert!("fortnight".parse::<QuickRange>().is_err());
    }

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::new(None, None).unwrap();
        assert_eq!(page.page(), 1);
        assert_eq!(page.page_size(), 20);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(101)).is_err());
        assert_eq!(PageRequest::new(Some(3), Some(100)).unwrap().offset(), 200);
    }

    #[test]
    fn test_export_widens_page_size() {
        let filters = AuditFilters {
            actor_id: Some("admin-1".to_string()),
            ..Default::default()
        };
        let export = filters.for_export();
        assert_eq!(export.page.page_size(), PageRequest::EXPORT_LIMIT);
        assert_eq!(export.actor_id.as_deref(), Some("admin-1"));
    }

    #[test]
    fn test_page_with_unaddressable_offset_is_rejected() {
        let err = PageRequest::new(Some(u64::MAX / 50), Some(100)).unwrap_err();
        assert!(matches!(err, InternalError::Validation { ref field, .. } if field == "page"));

        assert!(PageRequest::new(Some(u64::MAX), Some(1)).is_err());

        let last = i64::MAX as u64 / 100 + 1;
        let page = PageRequest::new(Some(last), Some(100)).unwrap();
        assert!(page.offset() <= i64::MAX as u64);
    }
}
