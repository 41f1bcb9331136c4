//! Error types for the guardrails console.

/// Coarse classification every [`ConsoleError`] maps to.
///
/// Views branch on this rather than on individual variants so that
/// "not logged in" and "service unavailable" are told apart the same way
/// for every gateway operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No credential, or the gateway refused it. Prompt the user to log in.
    Auth,
    /// Network failure, unexpected status, or a malformed response.
    Connection,
    /// The caller passed something invalid; nothing was sent.
    Usage,
}

/// Errors that can occur in the guardrails console.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// No API credential is stored. Never reaches the network.
    #[error("No API key available; log in or register first")]
    AuthMissing,

    /// The gateway answered 401 or 403.
    #[error("API key rejected by gateway (HTTP {status})")]
    AuthRejected { status: u16 },

    /// Any other failure talking to the gateway.
    #[error("Gateway unreachable: {0}")]
    Transport(String),

    /// Invalid input supplied by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Login or registration refused, carrying the server's `detail`.
    #[error("Authentication failed: {0}")]
    AuthExchange(String),

    /// Reading or writing the persisted credential failed.
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Stable classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AuthMissing | Self::AuthRejected { .. } | Self::AuthExchange(_) => {
                FailureKind::Auth
            }
            Self::Transport(_) | Self::Storage(_) => FailureKind::Connection,
            Self::InvalidArgument(_) | Self::Config(_) => FailureKind::Usage,
        }
    }

    /// Whether the user should be sent back through login.
    pub fn needs_reauth(&self) -> bool {
        self.kind() == FailureKind::Auth
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<config::ConfigError> for ConsoleError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
