//! # Guardrails Console Core
//!
//! Client-side state synchronization for the AI Guardrails console.
//!
//! ## Overview
//!
//! Three independently refreshing views share one server-held, append-only
//! audit log and one API key:
//!
//! - **Credential gating**: every gateway call checks the stored key first and
//!   fails with [`ConsoleError::AuthMissing`] without touching the network
//! - **Change notifications**: a successful scan publishes on the
//!   [`EventBus`]; the audit stream reloads page 0 when it is showing it
//! - **Pagination**: the audit stream only moves its page pointer on a
//!   successful fetch and only auto-refreshes on page 0
//! - **Polling**: the stats view polls on its own timer and keeps the last
//!   snapshot through transient failures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use guardrails_console_core::{ConsoleConfig, ScanConfiguration, Session, Submission};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::open(ConsoleConfig::load(None)?)?;
//!     session.login("ops@example.com", "hunter2").await?;
//!
//!     let dashboard = session.start_dashboard()?;
//!     let config = ScanConfiguration::default().with_topics_csv("politics");
//!
//!     match dashboard.scanner.submit("My phone is 555-1234", config).await {
//!         Submission::Completed(result) => println!("safe: {}", result.safe),
//!         Submission::Failed(failure) => println!("{}", failure.message),
//!         Submission::Ignored(_) => {}
//!     }
//!
//!     dashboard.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Gateway
//!
//! Views depend on the [`GatewayApi`] trait, not on HTTP:
//!
//! ```rust,ignore
//! use guardrails_console_core::{ConsoleError, GatewayApi};
//! use async_trait::async_trait;
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl GatewayApi for Offline {
//!     async fn fetch_stats(&self) -> Result<AggregateStats, ConsoleError> {
//!         Err(ConsoleError::Transport("offline".to_string()))
//!     }
//!     // ...
//! }
//! ```

pub mod config;
pub mod credential;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod session;
pub mod views;

// Primary exports
pub use config::ConsoleConfig;
pub use credential::{ApiKey, CredentialBackend, CredentialStore, FileBackend, MemoryBackend};
pub use error::{ConsoleError, FailureKind};
pub use events::{EventBus, Subscription, AUDIT_LOG_CHANGED};
pub use gateway::{GatewayApi, GatewayClient, GatewayClientBuilder, API_KEY_HEADER};
pub use session::{Dashboard, Session};

// Models and views
pub use models::{
    AccountCredentials, AggregateStats, AuditEntry, AuditEntryId, AuditPage, RiskBand,
    ScanConfiguration, ScanResult,
};
pub use views::{
    AuditStream, AuditStreamHandle, AuditStreamState, ScanConsole, ScanFailureKind, ScanState,
    StatsHandle, StatsPanel, Submission,
};
