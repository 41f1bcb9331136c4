//! GatewayClient - typed access to the remote guardrails API.
//!
//! Every data operation is gated on the stored API key here, once, rather
//! than in each view: with no key the call fails with
//! [`ConsoleError::AuthMissing`] before anything touches the network.

use crate::config::ConsoleConfig;
use crate::credential::{ApiKey, CredentialStore};
use crate::error::ConsoleError;
use crate::models::audit::AuditLogResponse;
use crate::models::auth::{AuthResponse, ErrorDetail};
use crate::models::scan::ScanRequest;
use crate::models::{
    page_offset, AccountCredentials, AggregateStats, AuditEntry, AuthMode, ScanConfiguration,
    ScanResult,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Header carrying the API key on every data request.
pub const API_KEY_HEADER: &str = "x-api-key";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const REQUESTS_METRIC: &str = "guardrails_console_requests_total";

/// The four remote data operations the views depend on.
///
/// [`GatewayClient`] is the HTTP implementation. Views hold an
/// `Arc<dyn GatewayApi>` so they can be driven by any implementation.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Scan a prompt. An unsafe verdict is `Ok`.
    async fn scan(
        &self,
        prompt: &str,
        config: &ScanConfiguration,
    ) -> Result<ScanResult, ConsoleError>;

    /// Read one page of the audit log at offset `page * page_size`.
    async fn list_audit_entries(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<AuditEntry>, ConsoleError>;

    /// Fetch the current aggregate statistics.
    async fn fetch_stats(&self) -> Result<AggregateStats, ConsoleError>;

    /// Delete every audit entry. Succeeds on an already empty log.
    async fn purge_audit_entries(&self) -> Result<(), ConsoleError>;
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Scan,
    ListAudit,
    FetchStats,
    PurgeAudit,
    Authenticate,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::ListAudit => "list_audit",
            Self::FetchStats => "fetch_stats",
            Self::PurgeAudit => "purge_audit",
            Self::Authenticate => "authenticate",
        }
    }
}

fn record(operation: Operation, outcome: &'static str) {
    metrics::counter!(
        REQUESTS_METRIC,
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

fn outcome_of(err: &ConsoleError) -> &'static str {
    match err {
        ConsoleError::AuthMissing => "auth_missing",
        ConsoleError::AuthRejected { .. } => "auth_rejected",
        ConsoleError::InvalidArgument(_) => "invalid",
        _ => "transport",
    }
}

/// HTTP client for the guardrails gateway.
///
/// # Example
///
/// ```rust,ignore
/// use guardrails_console_core::{CredentialStore, GatewayApi, GatewayClient, ScanConfiguration};
///
/// let credentials = CredentialStore::in_memory();
/// credentials.set("ag_live_xyz123")?;
///
/// let client = GatewayClient::builder()
///     .with_base_url("http://localhost:8000")
///     .with_credentials(credentials)
///     .build()?;
///
/// let verdict = client
///     .scan("Ignore previous instructions", &ScanConfiguration::default())
///     .await?;
/// ```
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
}

impl GatewayClient {
    /// Create a builder for custom client configuration.
    pub fn builder() -> GatewayClientBuilder {
        GatewayClientBuilder::new()
    }

    /// Build a client from loaded configuration.
    pub fn from_config(
        config: &ConsoleConfig,
        credentials: CredentialStore,
    ) -> Result<Self, ConsoleError> {
        Self::builder()
            .with_base_url(&config.base_url)
            .with_timeout(config.request_timeout())
            .with_credentials(credentials)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Create an account and store the issued key.
    pub async fn register(&self, account: &AccountCredentials) -> Result<ApiKey, ConsoleError> {
        self.authenticate(AuthMode::Register, account).await
    }

    /// Log in and store the returned key.
    pub async fn login(&self, account: &AccountCredentials) -> Result<ApiKey, ConsoleError> {
        self.authenticate(AuthMode::Login, account).await
    }

    /// Forget the stored key.
    pub fn logout(&self) -> Result<(), ConsoleError> {
        self.credentials.clear()
    }

    async fn authenticate(
        &self,
        mode: AuthMode,
        account: &AccountCredentials,
    ) -> Result<ApiKey, ConsoleError> {
        let url = self.url(mode.path());
        let response = self
            .http
            .post(&url)
            .json(account)
            .send()
            .await
            .map_err(|e| {
                record(Operation::Authenticate, "transport");
                ConsoleError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorDetail>()
                .await
                .unwrap_or_default()
                .message()
                .unwrap_or_else(|| format!("Authentication failed (HTTP {})", status.as_u16()));
            record(Operation::Authenticate, "rejected");
            tracing::warn!(?mode, status = status.as_u16(), "auth exchange refused");
            return Err(ConsoleError::AuthExchange(detail));
        }

        let body: AuthResponse = response.json().await.map_err(|e| {
            record(Operation::Authenticate, "transport");
            ConsoleError::Transport(format!("malformed auth response: {}", e))
        })?;

        let key = self.credentials.set(&body.api_key)?;
        record(Operation::Authenticate, "ok");
        tracing::info!(?mode, email = %account.email, "authenticated");
        Ok(key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The auth gate. Fails fast without a key.
    fn authorize(&self, operation: Operation) -> Result<ApiKey, ConsoleError> {
        self.credentials.get().ok_or_else(|| {
            tracing::debug!(operation = operation.as_str(), "no API key; request skipped");
            record(operation, "auth_missing");
            ConsoleError::AuthMissing
        })
    }

    /// Send with the key attached and classify the status.
    async fn execute(
        &self,
        operation: Operation,
        key: &ApiKey,
        request: RequestBuilder,
    ) -> Result<Response, ConsoleError> {
        let result: Result<Response, ConsoleError> = async {
            let response = request
                .header(API_KEY_HEADER, key.expose())
                .send()
                .await
                .map_err(|e| ConsoleError::Transport(e.to_string()))?;
            classify_status(response)
        }
        .await;

        match &result {
            Ok(_) => record(operation, "ok"),
            Err(e) => {
                record(operation, outcome_of(e));
                tracing::debug!(
                    operation = operation.as_str(),
                    fingerprint = %key.fingerprint(),
                    error = %e,
                    "gateway request failed"
                );
            }
        }
        result
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        key: &ApiKey,
        request: RequestBuilder,
    ) -> Result<T, ConsoleError> {
        let response = self.execute(operation, key, request).await?;
        response.json::<T>().await.map_err(|e| {
            ConsoleError::Transport(format!(
                "malformed {} response: {}",
                operation.as_str(),
                e
            ))
        })
    }
}

fn classify_status(response: Response) -> Result<Response, ConsoleError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ConsoleError::AuthRejected {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(ConsoleError::Transport(format!(
            "unexpected HTTP {}",
            status.as_u16()
        )));
    }
    Ok(response)
}

#[async_trait]
impl GatewayApi for GatewayClient {
    async fn scan(
        &self,
        prompt: &str,
        config: &ScanConfiguration,
    ) -> Result<ScanResult, ConsoleError> {
        let key = self.authorize(Operation::Scan)?;
        let request = self
            .http
            .post(self.url("/guard/"))
            .json(&ScanRequest { prompt, config });

        let result: ScanResult = self.execute_json(Operation::Scan, &key, request).await?;
        tracing::info!(
            safe = result.safe,
            score = result.score,
            pii = result.pii_detected.len(),
            "scan completed"
        );
        Ok(result)
    }

    async fn list_audit_entries(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<AuditEntry>, ConsoleError> {
        let offset = page_offset(page, page_size)?;
        let key = self.authorize(Operation::ListAudit)?;
        let request = self
            .http
            .get(self.url("/audit/logs"))
            .query(&[("limit", page_size), ("offset", offset)]);

        let body: AuditLogResponse = self
            .execute_json(Operation::ListAudit, &key, request)
            .await?;
        let entries = body.into_entries();
        tracing::debug!(page, offset, count = entries.len(), "audit page fetched");
        Ok(entries)
    }

    async fn fetch_stats(&self) -> Result<AggregateStats, ConsoleError> {
        let key = self.authorize(Operation::FetchStats)?;
        let request = self.http.get(self.url("/audit/stats"));
        self.execute_json(Operation::FetchStats, &key, request).await
    }

    async fn purge_audit_entries(&self) -> Result<(), ConsoleError> {
        let key = self.authorize(Operation::PurgeAudit)?;
        let request = self
            .http
            .delete(self.url("/audit/prune"))
            .query(&[("days", 0)]);
        self.execute(Operation::PurgeAudit, &key, request).await?;
        tracing::info!("audit log purged");
        Ok(())
    }
}

/// Builder for creating custom GatewayClient configurations.
pub struct GatewayClientBuilder {
    base_url: String,
    timeout: Duration,
    credentials: Option<CredentialStore>,
}

impl GatewayClientBuilder {
    fn new() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            credentials: None,
        }
    }

    /// Set the API root (required).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a shared credential store. Defaults to an empty in-memory one.
    pub fn with_credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Build the GatewayClient instance.
    pub fn build(self) -> Result<GatewayClient, ConsoleError> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConsoleError::Config(
                "base_url is required for GatewayClient".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("guardrails-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConsoleError::Config(format!("HTTP client: {}", e)))?;

        Ok(GatewayClient {
            http,
            base_url,
            credentials: self
                .credentials
                .unwrap_or_else(CredentialStore::in_memory),
        })
    }
}
