//! Shared test gateways: an HTTP mock served by axum and an in-process fake.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use guardrails_console_core::{
    AggregateStats, AuditEntry, AuditEntryId, ConsoleError, CredentialStore, GatewayApi,
    GatewayClient, ScanConfiguration, ScanResult, API_KEY_HEADER,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const VALID_KEY: &str = "ag_test_5f2c9e";

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{4}\b").unwrap());

/// Guardrails gateway stand-in listening on an ephemeral loopback port.
#[derive(Clone)]
pub struct MockGateway {
    pub base_url: String,
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    requests: AtomicUsize,
    next_id: AtomicI64,
    /// Newest first.
    entries: Mutex<Vec<Value>>,
    log_queries: Mutex<Vec<(usize, usize)>>,
    accounts: Mutex<HashMap<String, String>>,
    wrap_logs: AtomicBool,
}

impl MockGateway {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let gateway = Self {
            base_url: format!("http://{}", addr),
            inner: Arc::new(Inner::default()),
        };

        let app = Router::new()
            .route("/guard/", post(guard))
            .route("/audit/logs", get(audit_logs))
            .route("/audit/stats", get(audit_stats))
            .route("/audit/prune", delete(audit_prune))
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .with_state(gateway.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        gateway
    }

    /// Requests received so far, on any route.
    pub fn requests(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// `(limit, offset)` of every audit page request.
    pub fn log_queries(&self) -> Vec<(usize, usize)> {
        self.inner.log_queries.lock().clone()
    }

    /// Answer audit reads as `{"logs": [...]}` instead of a bare array.
    pub fn wrap_logs(&self, wrap: bool) {
        self.inner.wrap_logs.store(wrap, Ordering::SeqCst);
    }

    pub fn seed_entries(&self, count: usize) {
        for i in 0..count {
            self.record(i % 3 != 0, 15.0 + i as f64, None);
        }
    }

    pub fn entry_count(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Client pointed at this gateway, optionally already holding the key.
    pub fn client(&self, with_key: bool) -> (GatewayClient, CredentialStore) {
        let credentials = CredentialStore::in_memory();
        if with_key {
            credentials.set(VALID_KEY).unwrap();
        }
        let client = GatewayClient::builder()
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(5))
            .with_credentials(credentials.clone())
            .build()
            .unwrap();
        (client, credentials)
    }

    fn hit(&self, headers: &HeaderMap) -> Result<(), Response> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            Some(VALID_KEY) => Ok(()),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "Invalid API Key" })),
            )
                .into_response()),
        }
    }

    fn record(&self, is_safe: bool, latency_ms: f64, reason: Option<&str>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = json!({
            "id": id,
            "is_safe": is_safe,
            "latency_ms": latency_ms,
            "reason": reason,
            "timestamp": "2026-03-01T12:00:00.000000",
        });
        self.inner.entries.lock().insert(0, entry);
    }
}

async fn guard(
    State(gateway): State<MockGateway>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejected) = gateway.hit(&headers) {
        return rejected;
    }

    let prompt = body["prompt"].as_str().unwrap_or_default();
    let config = &body["config"];
    let enabled = |flag: &str| config[flag].as_bool().unwrap_or(false);

    let verdict = if enabled("detect_injection")
        && prompt.to_lowercase().contains("ignore previous instructions")
    {
        json!({
            "safe": false,
            "score": 0.97,
            "reason": "Prompt Injection Detected (Conf: 0.97)",
        })
    } else if enabled("redact_pii") && PHONE.is_match(prompt) {
        json!({
            "safe": true,
            "score": 0.05,
            "sanitized_prompt": PHONE.replace_all(prompt, "<PHONE_NUMBER>"),
            "pii_detected": ["PHONE_NUMBER"],
        })
    } else {
        json!({ "safe": true, "score": 0.02 })
    };

    let safe = verdict["safe"].as_bool().unwrap_or(true);
    gateway.record(safe, 42.0, verdict["reason"].as_str());
    Json(verdict).into_response()
}

async fn audit_logs(
    State(gateway): State<MockGateway>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, usize>>,
) -> Response {
    if let Err(rejected) = gateway.hit(&headers) {
        return rejected;
    }

    let limit = params.get("limit").copied().unwrap_or(10);
    let offset = params.get("offset").copied().unwrap_or(0);
    gateway.inner.log_queries.lock().push((limit, offset));

    let page: Vec<Value> = gateway
        .inner
        .entries
        .lock()
        .iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    if gateway.inner.wrap_logs.load(Ordering::SeqCst) {
        Json(json!({ "logs": page })).into_response()
    } else {
        Json(Value::Array(page)).into_response()
    }
}

async fn audit_stats(State(gateway): State<MockGateway>, headers: HeaderMap) -> Response {
    if let Err(rejected) = gateway.hit(&headers) {
        return rejected;
    }

    let entries = gateway.inner.entries.lock();
    let total = entries.len();
    let blocked = entries
        .iter()
        .filter(|e| e["is_safe"] == json!(false))
        .count();
    let latency: f64 = entries
        .iter()
        .filter_map(|e| e["latency_ms"].as_f64())
        .sum();
    let (block_rate, avg_latency) = if total == 0 {
        (0.0, 0.0)
    } else {
        (
            blocked as f64 * 100.0 / total as f64,
            latency / total as f64,
        )
    };

    Json(json!({
        "total_requests": total,
        "blocked_requests": blocked,
        "block_rate": block_rate,
        "avg_latency": avg_latency,
    }))
    .into_response()
}

async fn audit_prune(
    State(gateway): State<MockGateway>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, u32>>,
) -> Response {
    if let Err(rejected) = gateway.hit(&headers) {
        return rejected;
    }
    if params.get("days") == Some(&0) {
        gateway.inner.entries.lock().clear();
    }
    Json(json!({ "status": "ok" })).into_response()
}

async fn register(State(gateway): State<MockGateway>, Json(body): Json<Value>) -> Response {
    gateway.inner.requests.fetch_add(1, Ordering::SeqCst);
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    let mut accounts = gateway.inner.accounts.lock();
    if accounts.contains_key(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Email already registered" })),
        )
            .into_response();
    }
    accounts.insert(email, password);
    Json(json!({ "api_key": VALID_KEY })).into_response()
}

async fn login(State(gateway): State<MockGateway>, Json(body): Json<Value>) -> Response {
    gateway.inner.requests.fetch_add(1, Ordering::SeqCst);
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let accounts = gateway.inner.accounts.lock();
    match accounts.get(email) {
        Some(stored) if stored == password => {
            Json(json!({ "api_key": VALID_KEY })).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid credentials" })),
        )
            .into_response(),
    }
}

/// In-process gateway that serves `total_entries` synthetic audit rows and
/// records every call. Only awaits when told to hang, so paused-clock tests
/// stay deterministic.
pub struct FakeGateway {
    total_entries: Mutex<usize>,
    list_calls: Mutex<Vec<(usize, usize)>>,
    stats_calls: AtomicUsize,
    purge_calls: AtomicUsize,
    fail_stats: AtomicBool,
    hang_stats: AtomicBool,
    signed_out: AtomicBool,
}

impl FakeGateway {
    pub fn new(total_entries: usize) -> Arc<Self> {
        Arc::new(Self {
            total_entries: Mutex::new(total_entries),
            list_calls: Mutex::new(Vec::new()),
            stats_calls: AtomicUsize::new(0),
            purge_calls: AtomicUsize::new(0),
            fail_stats: AtomicBool::new(false),
            hang_stats: AtomicBool::new(false),
            signed_out: AtomicBool::new(false),
        })
    }

    pub fn list_calls(&self) -> Vec<(usize, usize)> {
        self.list_calls.lock().clone()
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }

    pub fn purge_calls(&self) -> usize {
        self.purge_calls.load(Ordering::SeqCst)
    }

    pub fn fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    /// Make every later `fetch_stats` wait forever.
    pub fn hang_stats(&self) {
        self.hang_stats.store(true, Ordering::SeqCst);
    }

    /// Behave as if the stored key was cleared: every call is `AuthMissing`.
    pub fn sign_out(&self) {
        self.signed_out.store(true, Ordering::SeqCst);
    }

    fn check_key(&self) -> Result<(), ConsoleError> {
        if self.signed_out.load(Ordering::SeqCst) {
            Err(ConsoleError::AuthMissing)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GatewayApi for FakeGateway {
    async fn scan(&self, _: &str, _: &ScanConfiguration) -> Result<ScanResult, ConsoleError> {
        self.check_key()?;
        *self.total_entries.lock() += 1;
        Ok(ScanResult {
            safe: true,
            score: 0.02,
            reason: None,
            sanitized_prompt: None,
            pii_detected: vec![],
            confidence: None,
        })
    }

    async fn list_audit_entries(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<AuditEntry>, ConsoleError> {
        self.check_key()?;
        self.list_calls.lock().push((page, page_size));
        let total = *self.total_entries.lock();
        let start = page * page_size;
        let end = total.min(start + page_size);
        Ok((start..end)
            .map(|i| AuditEntry {
                id: AuditEntryId::Numeric((total - i) as i64),
                is_safe: true,
                latency_ms: 20.0,
                reason: None,
                timestamp: "2026-03-01T12:00:00".to_string(),
                confidence: None,
            })
            .collect())
    }

    async fn fetch_stats(&self) -> Result<AggregateStats, ConsoleError> {
        self.check_key()?;
        let call = self.stats_calls.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        if self.hang_stats.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(ConsoleError::Transport("connection refused".to_string()));
        }
        Ok(AggregateStats {
            total_requests: call * 10,
            blocked_requests: call,
            block_rate: 10.0,
            avg_latency: 25.0,
        })
    }

    async fn purge_audit_entries(&self) -> Result<(), ConsoleError> {
        self.check_key()?;
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        *self.total_entries.lock() = 0;
        Ok(())
    }
}
