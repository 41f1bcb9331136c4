//! Session - owns the credential, the client, and the event bus, and starts
//! the dashboard views against them.

use crate::config::ConsoleConfig;
use crate::credential::{ApiKey, CredentialStore};
use crate::error::ConsoleError;
use crate::events::EventBus;
use crate::gateway::{GatewayApi, GatewayClient};
use crate::models::AccountCredentials;
use crate::views::{
    AuditStreamHandle, AuditStreamOptions, AuditStreamView, ScanConsole, StatsHandle, StatsView,
    Teardown,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Entry point for a console process.
///
/// Dashboards started from a session are torn down by [`Session::logout`].
pub struct Session {
    config: ConsoleConfig,
    client: Arc<GatewayClient>,
    bus: EventBus,
    scanner: ScanConsole,
    /// Bumped on every logout; running views stop when it changes.
    teardown: watch::Sender<u64>,
}

impl Session {
    /// Session with a file-backed key at the configured location.
    pub fn open(config: ConsoleConfig) -> Result<Self, ConsoleError> {
        let credentials = CredentialStore::file(config.credential_file()?);
        Self::new(config, credentials)
    }

    pub fn new(config: ConsoleConfig, credentials: CredentialStore) -> Result<Self, ConsoleError> {
        let config = config.validated()?;
        let client = Arc::new(GatewayClient::from_config(&config, credentials)?);
        let bus = EventBus::new();
        let scanner = ScanConsole::new(client.clone(), bus.clone());
        let (teardown, _) = watch::channel(0);
        Ok(Self {
            config,
            client,
            bus,
            scanner,
            teardown,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn client(&self) -> Arc<GatewayClient> {
        self.client.clone()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.credentials().is_present()
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<ApiKey, ConsoleError> {
        let account = AccountCredentials::new(email, password)?;
        self.client.register(&account).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<ApiKey, ConsoleError> {
        let account = AccountCredentials::new(email, password)?;
        self.client.login(&account).await
    }

    /// Clear the key and stop every dashboard this session started. Their
    /// audit pages, stats and the last scan verdict are discarded.
    pub fn logout(&self) -> Result<(), ConsoleError> {
        let cleared = self.client.logout();
        self.teardown.send_modify(|generation| *generation += 1);
        self.scanner.reset();
        tracing::info!("logged out; dashboards torn down");
        cleared
    }

    /// The session's scan console, publishing on its bus. Clones share state.
    pub fn scan_console(&self) -> ScanConsole {
        self.scanner.clone()
    }

    /// Start the stats and audit views. Requires a stored key.
    pub fn start_dashboard(&self) -> Result<Dashboard, ConsoleError> {
        if !self.is_authenticated() {
            return Err(ConsoleError::AuthMissing);
        }

        let audit = AuditStreamView::spawn_until(
            self.api(),
            &self.bus,
            AuditStreamOptions {
                page_size: self.config.page_size,
                refresh_interval: self.config.audit_refresh_interval(),
            },
            self.teardown_signal(),
        );
        let stats = StatsView::spawn_until(
            self.api(),
            self.config.stats_poll_interval(),
            self.teardown_signal(),
        );
        tracing::info!(
            page_size = self.config.page_size,
            stats_poll_secs = self.config.stats_poll_secs,
            audit_refresh_secs = self.config.audit_refresh_secs,
            "dashboard started"
        );

        Ok(Dashboard {
            audit,
            stats,
            scanner: self.scan_console(),
        })
    }

    fn api(&self) -> Arc<dyn GatewayApi> {
        self.client.clone()
    }

    fn teardown_signal(&self) -> Teardown {
        Teardown::new(self.teardown.subscribe())
    }
}

/// The running views of one dashboard.
pub struct Dashboard {
    pub audit: AuditStreamHandle,
    pub stats: StatsHandle,
    pub scanner: ScanConsole,
}

impl Dashboard {
    /// Stop every view, discarding their state.
    pub async fn close(self) {
        self.scanner.reset();
        self.audit.shutdown().await;
        self.stats.shutdown().await;
        tracing::info!("dashboard closed");
    }

    /// Log out and tear the dashboard down.
    pub async fn logout(self, session: &Session) -> Result<(), ConsoleError> {
        let cleared = session.logout();
        self.close().await;
        cleared
    }
}
