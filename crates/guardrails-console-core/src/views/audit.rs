//! Live audit stream: paginated, auto-refreshing reader of the audit log.
//!
//! [`AuditStream`] is the pagination state machine; it never performs I/O.
//! [`AuditStreamView`] drives it from a tokio task: mount fetch, change
//! notifications, the page-0 refresh timer, and user commands.
//!
//! ## Invariants
//! - The displayed page only changes when a fetch for that page succeeds.
//! - Background refreshes (timer, change notification) only run while the
//!   displayed page is 0, so browsing older pages is never reset.
//! - Fetches are not coalesced; each completion carries its own target page
//!   and the last one to complete wins.

use crate::error::ConsoleError;
use crate::events::EventBus;
use crate::gateway::GatewayApi;
use crate::models::{AuditEntry, AuditPage};
use crate::views::Teardown;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

const COMMAND_BUFFER: usize = 16;

/// Where the stream is in its fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditStreamState {
    /// Nothing requested yet (or derived state was discarded).
    Idle { page: usize },
    /// A fetch for `page` is outstanding.
    Loading { page: usize },
    /// Last fetch succeeded.
    Loaded(AuditPage),
    /// A fetch failed and no page was ever loaded.
    Error { page: usize },
}

/// A fetch the driver should perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

/// Pagination state machine for the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditStream {
    page_size: usize,
    state: AuditStreamState,
    current: Option<AuditPage>,
}

impl AuditStream {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            state: AuditStreamState::Idle { page: 0 },
            current: None,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn state(&self) -> &AuditStreamState {
        &self.state
    }

    /// Page pointer: the last page that loaded successfully.
    pub fn current_page(&self) -> usize {
        self.current.as_ref().map_or(0, |p| p.page)
    }

    /// Last successfully loaded page, kept across failed fetches.
    pub fn loaded(&self) -> Option<&AuditPage> {
        self.current.as_ref()
    }

    pub fn entries(&self) -> &[AuditEntry] {
        self.current.as_ref().map_or(&[], |p| p.entries.as_slice())
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuditStreamState::Loading { .. })
    }

    /// "Next" is enabled only on a loaded, full page.
    pub fn can_go_next(&self) -> bool {
        matches!(&self.state, AuditStreamState::Loaded(page) if page.has_more)
    }

    pub fn can_go_previous(&self) -> bool {
        self.current_page() > 0
    }

    /// Initial fetch when the view appears.
    pub fn mount(&mut self) -> PageRequest {
        self.begin(0)
    }

    /// Explicit user refresh; always page 0.
    pub fn refresh(&mut self) -> PageRequest {
        self.begin(0)
    }

    /// Audit log changed elsewhere. Only refetches while on page 0.
    pub fn on_change_notification(&mut self) -> Option<PageRequest> {
        self.background_refresh()
    }

    /// Refresh timer fired. Only refetches while on page 0.
    pub fn on_tick(&mut self) -> Option<PageRequest> {
        self.background_refresh()
    }

    pub fn next(&mut self) -> Option<PageRequest> {
        if !self.can_go_next() {
            return None;
        }
        let page = self.current_page() + 1;
        Some(self.begin(page))
    }

    pub fn previous(&mut self) -> Option<PageRequest> {
        if !self.can_go_previous() {
            return None;
        }
        let page = self.current_page() - 1;
        Some(self.begin(page))
    }

    /// After a purge, page 0 is refetched no matter where we were.
    pub fn after_purge(&mut self) -> PageRequest {
        self.begin(0)
    }

    /// Apply the outcome of `request`.
    pub fn complete(
        &mut self,
        request: PageRequest,
        result: Result<Vec<AuditEntry>, ConsoleError>,
    ) {
        match result {
            Ok(entries) => {
                let page = AuditPage::new(request.page, request.page_size, entries);
                self.current = Some(page.clone());
                self.state = AuditStreamState::Loaded(page);
            }
            Err(ConsoleError::AuthMissing) => {
                tracing::debug!(page = request.page, "no API key; audit stream cleared");
                self.discard();
            }
            Err(e) => {
                tracing::warn!(page = request.page, error = %e, "failed to fetch audit logs");
                self.state = match &self.current {
                    Some(page) => AuditStreamState::Loaded(page.clone()),
                    None => AuditStreamState::Error { page: 0 },
                };
            }
        }
    }

    /// Drop all derived state, e.g. after logout.
    pub fn discard(&mut self) {
        self.current = None;
        self.state = AuditStreamState::Idle { page: 0 };
    }

    fn background_refresh(&mut self) -> Option<PageRequest> {
        if self.current_page() == 0 {
            Some(self.begin(0))
        } else {
            None
        }
    }

    fn begin(&mut self, page: usize) -> PageRequest {
        self.state = AuditStreamState::Loading { page };
        PageRequest {
            page,
            page_size: self.page_size,
        }
    }
}

/// User actions accepted by a running [`AuditStreamView`].
#[derive(Debug)]
pub enum AuditCommand {
    Next,
    Previous,
    Refresh,
    /// Purge the log, then reload page 0. The purge outcome is reported back.
    Clear(oneshot::Sender<Result<(), ConsoleError>>),
}

/// Settings for [`AuditStreamView::spawn`].
#[derive(Debug, Clone)]
pub struct AuditStreamOptions {
    pub page_size: usize,
    pub refresh_interval: Duration,
}

impl Default for AuditStreamOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            refresh_interval: Duration::from_secs(10),
        }
    }
}

type FetchOutcome = (PageRequest, Result<Vec<AuditEntry>, ConsoleError>);

/// Background driver for an [`AuditStream`].
pub struct AuditStreamView {
    client: Arc<dyn GatewayApi>,
    stream: AuditStream,
    commands: mpsc::Receiver<AuditCommand>,
    snapshots: watch::Sender<AuditStream>,
    notified: Arc<Notify>,
    refresh_interval: Duration,
    inflight: JoinSet<FetchOutcome>,
    teardown: Teardown,
}

impl AuditStreamView {
    /// Start the view. It subscribes to `bus` for its whole lifetime.
    pub fn spawn(
        client: Arc<dyn GatewayApi>,
        bus: &EventBus,
        options: AuditStreamOptions,
    ) -> AuditStreamHandle {
        Self::spawn_until(client, bus, options, Teardown::never())
    }

    /// Like [`AuditStreamView::spawn`], but when `teardown` fires the view
    /// discards its pages, unsubscribes and stops.
    pub fn spawn_until(
        client: Arc<dyn GatewayApi>,
        bus: &EventBus,
        options: AuditStreamOptions,
        teardown: Teardown,
    ) -> AuditStreamHandle {
        let stream = AuditStream::new(options.page_size);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(stream.clone());

        let notified = Arc::new(Notify::new());
        let waker = notified.clone();
        let subscription = bus.subscribe(move || waker.notify_one());

        let view = Self {
            client,
            stream,
            commands: command_rx,
            snapshots: snapshot_tx,
            notified,
            refresh_interval: options.refresh_interval,
            inflight: JoinSet::new(),
            teardown,
        };

        let task = tokio::spawn(async move {
            // Unsubscribes when the task ends or is aborted.
            let _subscription = subscription;
            view.run().await;
        });

        AuditStreamHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            task: Some(task),
        }
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick is immediate; the mount fetch covers it.
        ticker.tick().await;

        let request = self.stream.mount();
        self.start_fetch(request);
        self.publish();

        loop {
            tokio::select! {
                _ = self.teardown.fired() => {
                    self.stream.discard();
                    self.publish();
                    break;
                }
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                _ = self.notified.notified() => {
                    if let Some(request) = self.stream.on_change_notification() {
                        self.start_fetch(request);
                    }
                }
                _ = ticker.tick() => {
                    if let Some(request) = self.stream.on_tick() {
                        self.start_fetch(request);
                    }
                }
                Some(joined) = self.inflight.join_next() => {
                    match joined {
                        Ok((request, result)) => self.stream.complete(request, result),
                        Err(e) => tracing::warn!(error = %e, "audit fetch task failed"),
                    }
                }
            }
            self.publish();
        }

        // Outstanding fetches must not touch state after teardown.
        self.inflight.abort_all();
        tracing::debug!("audit stream view stopped");
    }

    async fn handle_command(&mut self, command: AuditCommand) {
        match command {
            AuditCommand::Next => {
                if let Some(request) = self.stream.next() {
                    self.start_fetch(request);
                }
            }
            AuditCommand::Previous => {
                if let Some(request) = self.stream.previous() {
                    self.start_fetch(request);
                }
            }
            AuditCommand::Refresh => {
                let request = self.stream.refresh();
                self.start_fetch(request);
            }
            AuditCommand::Clear(reply) => {
                let outcome = self.client.purge_audit_entries().await;
                if let Err(e) = &outcome {
                    tracing::error!(error = %e, "failed to clear audit logs");
                }

                let request = self.stream.after_purge();
                self.publish();
                let result = self
                    .client
                    .list_audit_entries(request.page, request.page_size)
                    .await;
                self.stream.complete(request, result);
                self.publish();

                // Caller may have gone away; nothing to do then.
                let _ = reply.send(outcome);
            }
        }
    }

    fn start_fetch(&mut self, request: PageRequest) {
        let client = self.client.clone();
        self.inflight.spawn(async move {
            let result = client
                .list_audit_entries(request.page, request.page_size)
                .await;
            (request, result)
        });
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.stream.clone());
    }
}

/// Control handle for a running [`AuditStreamView`].
///
/// Dropping the handle stops the view.
pub struct AuditStreamHandle {
    commands: mpsc::Sender<AuditCommand>,
    snapshots: watch::Receiver<AuditStream>,
    task: Option<JoinHandle<()>>,
}

impl AuditStreamHandle {
    /// Latest state of the stream.
    pub fn snapshot(&self) -> AuditStream {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every state change.
    pub fn watch(&self) -> watch::Receiver<AuditStream> {
        self.snapshots.clone()
    }

    pub async fn next(&self) -> Result<(), ConsoleError> {
        self.send(AuditCommand::Next).await
    }

    pub async fn previous(&self) -> Result<(), ConsoleError> {
        self.send(AuditCommand::Previous).await
    }

    pub async fn refresh(&self) -> Result<(), ConsoleError> {
        self.send(AuditCommand::Refresh).await
    }

    /// Purge the audit log and wait until page 0 has been reloaded.
    pub async fn clear(&self) -> Result<(), ConsoleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(AuditCommand::Clear(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| ConsoleError::Transport("audit view stopped".to_string()))?
    }

    /// Stop the view and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    async fn send(&self, command: AuditCommand) -> Result<(), ConsoleError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ConsoleError::Transport("audit view stopped".to_string()))
    }
}

impl Drop for AuditStreamHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
