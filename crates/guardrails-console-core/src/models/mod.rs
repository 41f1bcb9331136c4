//! Wire and view models for the gateway API.

pub mod audit;
pub mod auth;
pub mod confidence;
pub mod scan;
pub mod stats;

pub use audit::{page_offset, AuditEntry, AuditEntryId, AuditPage};
pub use auth::{AccountCredentials, AuthMode};
pub use confidence::RiskBand;
pub use scan::{ScanConfiguration, ScanResult};
pub use stats::AggregateStats;
