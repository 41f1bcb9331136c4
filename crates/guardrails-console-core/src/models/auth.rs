//! Login / registration exchange bodies.

use crate::error::ConsoleError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of `POST /auth/register` and `POST /auth/login`.
#[derive(Clone, Serialize, Validate)]
pub struct AccountCredentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

impl AccountCredentials {
    /// Build and validate. Nothing is sent when this fails.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConsoleError> {
        let creds = Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        };
        creds
            .validate()
            .map_err(|e| ConsoleError::InvalidArgument(e.to_string()))?;
        Ok(creds)
    }
}

impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful exchange: the newly issued key.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub api_key: String,
}

/// Error body `{detail}` returned by the auth endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorDetail {
    /// `detail` is a string on most errors and a list on validation errors.
    pub(crate) fn message(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

/// Which auth endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Register,
    Login,
}

impl AuthMode {
    pub(crate) fn path(self) -> &'static str {
        match self {
            Self::Register => "/auth/register",
            Self::Login => "/auth/login",
        }
    }
}
