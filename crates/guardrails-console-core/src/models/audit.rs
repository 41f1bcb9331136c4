//! Audit log entries and pages.

use super::confidence;
use crate::error::ConsoleError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latency above which an entry is flagged as slow.
pub const SLOW_LATENCY_MS: f64 = 200.0;

/// Server-assigned entry id. Numeric on current gateways, string on others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuditEntryId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for AuditEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One historical scan decision. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub is_safe: bool,
    pub latency_ms: f64,
    #[serde(default)]
    pub reason: Option<String>,
    /// UTC, without a zone suffix.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl AuditEntry {
    pub fn is_slow(&self) -> bool {
        self.latency_ms > SLOW_LATENCY_MS
    }

    pub fn confidence(&self) -> Option<f64> {
        confidence::resolve(self.confidence, self.reason.as_deref())
    }

    pub fn display_reason(&self) -> Option<String> {
        self.reason.as_deref().map(confidence::strip)
    }

    /// Parse the timestamp. Zone-less values are taken as UTC.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            })
    }
}

/// `GET /audit/logs` answers with either a bare array or `{logs: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AuditLogResponse {
    Bare(Vec<AuditEntry>),
    Wrapped {
        #[serde(default)]
        logs: Vec<AuditEntry>,
    },
}

impl AuditLogResponse {
    pub(crate) fn into_entries(self) -> Vec<AuditEntry> {
        match self {
            Self::Bare(entries) => entries,
            Self::Wrapped { logs } => logs,
        }
    }
}

/// A bounded, offset-addressed slice of the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPage {
    /// Zero-based page index.
    pub page: usize,
    pub entries: Vec<AuditEntry>,
    /// A full page means a next page may exist.
    pub has_more: bool,
}

impl AuditPage {
    pub fn new(page: usize, page_size: usize, entries: Vec<AuditEntry>) -> Self {
        let has_more = entries.len() == page_size;
        Self {
            page,
            entries,
            has_more,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-based label for display.
    pub fn number(&self) -> usize {
        self.page + 1
    }
}

/// Row offset of `page`: `page * page_size`.
pub fn page_offset(page: usize, page_size: usize) -> Result<usize, ConsoleError> {
    if page_size == 0 {
        return Err(ConsoleError::InvalidArgument(
            "page_size must be > 0".to_string(),
        ));
    }
    page.checked_mul(page_size).ok_or_else(|| {
        ConsoleError::InvalidArgument(format!("page {} overflows offset", page))
    })
}
