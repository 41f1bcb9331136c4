//! Plain-text rendering of verdicts, audit pages and statistics.

use guardrails_console_core::models::confidence::as_percent;
use guardrails_console_core::{AggregateStats, AuditEntry, AuditPage, ScanResult};
use std::fmt::Write;

pub fn verdict(result: &ScanResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  risk {} ({:.2})",
        result.verdict_label(),
        result.risk_band().label(),
        result.score
    );
    if let Some(reason) = result.display_reason().filter(|r| !r.is_empty()) {
        let _ = writeln!(out, "reason:     {}", reason);
    }
    if let Some(confidence) = result.confidence() {
        let _ = writeln!(out, "confidence: {}", as_percent(confidence));
    }
    if let Some(sanitized) = &result.sanitized_prompt {
        let _ = writeln!(out, "sanitized:  {}", sanitized);
    }
    if !result.pii_detected.is_empty() {
        let _ = writeln!(out, "pii:        {}", result.pii_detected.join(", "));
    }
    out
}

pub fn audit_page(page: &AuditPage) -> String {
    let mut out = String::new();
    if page.is_empty() {
        let _ = writeln!(out, "page {}: no audit entries", page.number());
        return out;
    }

    let _ = writeln!(out, "page {} ({} entries)", page.number(), page.entries.len());
    for entry in &page.entries {
        let _ = writeln!(out, "{}", audit_row(entry));
    }
    if page.has_more {
        let _ = writeln!(out, "more: --page {}", page.page + 1);
    }
    out
}

fn audit_row(entry: &AuditEntry) -> String {
    let status = if entry.is_safe { "ALLOWED" } else { "BLOCKED" };
    let when = entry
        .recorded_at()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| entry.timestamp.clone());
    let slow = if entry.is_slow() { " SLOW" } else { "" };

    let mut row = format!(
        "#{:<6} {} {:<7} {:>7.1}ms{}",
        entry.id, when, status, entry.latency_ms, slow
    );
    if let Some(reason) = entry.display_reason().filter(|r| !r.is_empty()) {
        let _ = write!(row, "  {}", reason);
    }
    if let Some(confidence) = entry.confidence() {
        let _ = write!(row, " [{}]", as_percent(confidence));
    }
    row
}

pub fn stats(stats: &AggregateStats) -> String {
    let flag = if stats.is_elevated() { " (elevated)" } else { "" };
    format!(
        "requests {}  blocked {}  block rate {:.1}%{}  avg latency {:.0}ms\n",
        stats.total_requests, stats.blocked_requests, stats.block_rate, flag, stats.avg_latency
    )
}
