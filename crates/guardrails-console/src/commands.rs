//! Subcommand implementations.

use crate::cli::{AccountArgs, OutputFormat, ScanArgs};
use crate::render;
use anyhow::{bail, Context, Result};
use guardrails_console_core::{
    AggregateStats, AuditPage, AuditStreamState, ConsoleError, GatewayApi, Session, Submission,
};
use serde::Serialize;
use tracing::info;

const LOGIN_HINT: &str = "run `guardrails login --email <EMAIL>` or `guardrails register` first";

pub async fn register(session: &Session, args: &AccountArgs) -> Result<()> {
    let key = session
        .register(&args.email, &args.password)
        .await
        .context("registration failed")?;
    println!("registered {}; API key {} stored", args.email, key.fingerprint());
    Ok(())
}

pub async fn login(session: &Session, args: &AccountArgs) -> Result<()> {
    let key = session
        .login(&args.email, &args.password)
        .await
        .context("login failed")?;
    println!("logged in as {}; API key {} stored", args.email, key.fingerprint());
    Ok(())
}

pub fn logout(session: &Session) -> Result<()> {
    session.logout()?;
    println!("logged out");
    Ok(())
}

pub async fn scan(session: &Session, args: &ScanArgs, output: OutputFormat) -> Result<()> {
    let console = session.scan_console();
    match console.submit(&args.prompt, args.configuration()).await {
        Submission::Completed(result) => {
            emit(output, &result, || render::verdict(&result))?;
            Ok(())
        }
        Submission::Failed(failure) if failure.offers_login() => {
            bail!("{} ({})", failure.message, LOGIN_HINT)
        }
        Submission::Failed(failure) => bail!("{}", failure.message),
        Submission::Ignored(_) => bail!("prompt is empty; nothing to scan"),
    }
}

pub async fn audit(session: &Session, page: usize, output: OutputFormat) -> Result<()> {
    let page_size = session.config().page_size;
    let entries = session
        .client()
        .list_audit_entries(page, page_size)
        .await
        .map_err(with_hint)?;
    let page = AuditPage::new(page, page_size, entries);
    emit(output, &page.entries, || render::audit_page(&page))
}

pub async fn stats(session: &Session, output: OutputFormat) -> Result<()> {
    let stats = session
        .client()
        .fetch_stats()
        .await
        .map_err(with_hint)?;
    emit(output, &stats, || render::stats(&stats))
}

pub async fn clear(session: &Session) -> Result<()> {
    session
        .client()
        .purge_audit_entries()
        .await
        .map_err(with_hint)?;
    println!("audit log cleared");
    Ok(())
}

/// Run the dashboard views and print every new snapshot until shutdown.
pub async fn watch(session: &Session, output: OutputFormat) -> Result<()> {
    let dashboard = session.start_dashboard().map_err(with_hint)?;
    let mut audit_rx = dashboard.audit.watch();
    let mut stats_rx = dashboard.stats.watch();
    let mut last_page: Option<AuditPage> = None;
    let mut last_stats: Option<AggregateStats> = None;

    let shutdown = crate::shutdown_signal();
    tokio::pin!(shutdown);

    info!("watching; press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = stats_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let panel = stats_rx.borrow_and_update().clone();
                if let Some(snapshot) = panel.snapshot() {
                    if replace_if_new(&mut last_stats, snapshot) {
                        emit(output, snapshot, || render::stats(snapshot))?;
                    }
                }
            }
            changed = audit_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let stream = audit_rx.borrow_and_update().clone();
                if let AuditStreamState::Loaded(page) = stream.state() {
                    if replace_if_new(&mut last_page, page) {
                        emit(output, &page.entries, || render::audit_page(page))?;
                    }
                }
            }
        }
    }

    dashboard.close().await;
    Ok(())
}

/// Store `current` and return true unless it equals what was last printed.
fn replace_if_new<T: PartialEq + Clone>(last: &mut Option<T>, current: &T) -> bool {
    if last.as_ref() == Some(current) {
        return false;
    }
    *last = Some(current.clone());
    true
}

fn emit<T, F>(output: OutputFormat, value: &T, text: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => print!("{}", text()),
    }
    Ok(())
}

fn with_hint(err: ConsoleError) -> anyhow::Error {
    if err.needs_reauth() {
        anyhow::Error::new(err).context(LOGIN_HINT)
    } else {
        anyhow::Error::new(err)
    }
}
