//! The three dashboard views.
//!
//! - `audit`: paginated live audit stream, refreshed on change notifications
//!   and on a timer while on page 0
//! - `stats`: aggregate statistics poller, independent of the event bus
//! - `scan`: interactive scan console, publishes on success

pub mod audit;
pub mod scan;
pub mod stats;

pub use audit::{
    AuditCommand, AuditStream, AuditStreamHandle, AuditStreamOptions, AuditStreamState,
    AuditStreamView, PageRequest,
};
pub use scan::{IgnoreReason, ScanConsole, ScanFailure, ScanFailureKind, ScanState, Submission};
pub use stats::{StatsHandle, StatsPanel, StatsView};

use tokio::sync::watch;

/// Fires when the owner of a set of views tears them down, e.g. on logout.
///
/// Built from a `watch::Receiver<u64>` whose value is bumped once per
/// teardown. A signal whose sender is gone never fires.
#[derive(Debug, Clone)]
pub struct Teardown(watch::Receiver<u64>);

impl Teardown {
    pub fn new(rx: watch::Receiver<u64>) -> Self {
        Self(rx)
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(0);
        Self(rx)
    }

    /// Resolve on the next teardown after this signal was created.
    pub async fn fired(&mut self) {
        if self.0.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
