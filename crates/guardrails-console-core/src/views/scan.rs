//! Scan console: submits one prompt at a time and keeps the latest verdict.
//!
//! A successful scan publishes on the event bus so the audit stream picks up
//! the new entry. Failed scans never publish.

use crate::error::{ConsoleError, FailureKind};
use crate::events::EventBus;
use crate::gateway::GatewayApi;
use crate::models::{ScanConfiguration, ScanResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Why a failed scan failed, as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFailureKind {
    /// Missing or rejected key. Offer login/registration.
    Auth,
    /// Gateway unreachable or misbehaving.
    Connection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub kind: ScanFailureKind,
    pub message: String,
}

impl ScanFailure {
    fn from_error(err: &ConsoleError) -> Self {
        match err.kind() {
            FailureKind::Auth => Self {
                kind: ScanFailureKind::Auth,
                message: "Authentication failed. Please log in to continue.".to_string(),
            },
            FailureKind::Connection | FailureKind::Usage => Self {
                kind: ScanFailureKind::Connection,
                message: "Failed to connect to API. Please check the gateway.".to_string(),
            },
        }
    }

    /// Whether the UI should offer a log in / register action.
    pub fn offers_login(&self) -> bool {
        self.kind == ScanFailureKind::Auth
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Submitting,
    Succeeded(ScanResult),
    Failed(ScanFailure),
}

impl ScanState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    pub fn result(&self) -> Option<&ScanResult> {
        match self {
            Self::Succeeded(result) => Some(result),
            _ => None,
        }
    }
}

/// Why a submission was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyPrompt,
    AlreadySubmitting,
}

/// What a call to [`ScanConsole::submit`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Completed(ScanResult),
    Failed(ScanFailure),
    /// Nothing was sent.
    Ignored(IgnoreReason),
}

/// Interactive scan console. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ScanConsole {
    client: Arc<dyn GatewayApi>,
    bus: EventBus,
    state: Arc<Mutex<ScanState>>,
}

impl ScanConsole {
    pub fn new(client: Arc<dyn GatewayApi>, bus: EventBus) -> Self {
        Self {
            client,
            bus,
            state: Arc::new(Mutex::new(ScanState::Idle)),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state.lock().clone()
    }

    /// Submit is enabled for a non-blank prompt with no scan in flight.
    pub fn can_submit(&self, prompt: &str) -> bool {
        !prompt.trim().is_empty() && !self.state.lock().is_submitting()
    }

    /// Scan `prompt`. At most one scan is in flight; extra calls are ignored.
    pub async fn submit(&self, prompt: &str, config: ScanConfiguration) -> Submission {
        if prompt.trim().is_empty() {
            return Submission::Ignored(IgnoreReason::EmptyPrompt);
        }

        let guard = {
            let mut state = self.state.lock();
            if state.is_submitting() {
                tracing::debug!("scan already in flight; submission ignored");
                return Submission::Ignored(IgnoreReason::AlreadySubmitting);
            }
            *state = ScanState::Submitting;
            InFlight {
                state: self.state.clone(),
            }
        };

        match self.client.scan(prompt, &config).await {
            Ok(result) => {
                guard.finish(ScanState::Succeeded(result.clone()));
                self.bus.publish();
                Submission::Completed(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "scan failed");
                let failure = ScanFailure::from_error(&e);
                guard.finish(ScanState::Failed(failure.clone()));
                Submission::Failed(failure)
            }
        }
    }

    /// Forget the last verdict or failure.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if !state.is_submitting() {
            *state = ScanState::Idle;
        }
    }
}

/// Returns the console to `Idle` if a submit future is dropped mid-flight.
struct InFlight {
    state: Arc<Mutex<ScanState>>,
}

impl InFlight {
    fn finish(self, next: ScanState) {
        *self.state.lock() = next;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.is_submitting() {
            *state = ScanState::Idle;
        }
    }
}
