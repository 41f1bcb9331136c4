//! Aggregate statistics snapshot.

use serde::{Deserialize, Serialize};

/// Block rate (percent) above which the dashboard flags the gateway.
pub const ELEVATED_BLOCK_RATE: f64 = 10.0;

/// Server-computed aggregates. Each fetch replaces the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateStats {
    pub total_requests: u64,
    pub blocked_requests: u64,
    /// Percentage, `0..=100`.
    pub block_rate: f64,
    /// Milliseconds.
    pub avg_latency: f64,
}

impl AggregateStats {
    pub fn is_elevated(&self) -> bool {
        self.block_rate > ELEVATED_BLOCK_RATE
    }

    pub fn allowed_requests(&self) -> u64 {
        self.total_requests.saturating_sub(self.blocked_requests)
    }
}
