//! Scan request and verdict types.

use super::confidence::{self, RiskBand};
use serde::{Deserialize, Serialize};

/// Capability toggles sent with each scan. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfiguration {
    pub detect_injection: bool,
    pub detect_toxicity: bool,
    pub redact_pii: bool,
    /// Topics to block. `None` means no topic filter; never `Some(empty)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_topics: Option<Vec<String>>,
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        Self {
            detect_injection: true,
            detect_toxicity: true,
            redact_pii: true,
            block_topics: None,
        }
    }
}

impl ScanConfiguration {
    /// Every detector off; enable what you need.
    pub fn none() -> Self {
        Self {
            detect_injection: false,
            detect_toxicity: false,
            redact_pii: false,
            block_topics: None,
        }
    }

    pub fn with_injection(mut self, enabled: bool) -> Self {
        self.detect_injection = enabled;
        self
    }

    pub fn with_toxicity(mut self, enabled: bool) -> Self {
        self.detect_toxicity = enabled;
        self
    }

    pub fn with_pii_redaction(mut self, enabled: bool) -> Self {
        self.redact_pii = enabled;
        self
    }

    /// Set blocked topics, keeping order, dropping blanks and duplicates.
    pub fn with_block_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for topic in topics {
            let topic = topic.as_ref().trim();
            if !topic.is_empty() && !cleaned.iter().any(|t| t == topic) {
                cleaned.push(topic.to_string());
            }
        }
        self.block_topics = if cleaned.is_empty() { None } else { Some(cleaned) };
        self
    }

    /// Parse a comma separated topic list such as `"politics, cooking"`.
    pub fn with_topics_csv(self, csv: &str) -> Self {
        self.with_block_topics(csv.split(','))
    }
}

/// Verdict returned by `POST /guard/`.
///
/// An unsafe verdict is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub safe: bool,
    /// Risk score in `[0, 1]`.
    pub score: f64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub sanitized_prompt: Option<String>,
    #[serde(default)]
    pub pii_detected: Vec<String>,
    /// Structured confidence, when the gateway sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ScanResult {
    pub fn risk_band(&self) -> RiskBand {
        RiskBand::from_score(self.score)
    }

    pub fn confidence(&self) -> Option<f64> {
        confidence::resolve(self.confidence, self.reason.as_deref())
    }

    /// Reason with the embedded confidence fragment removed.
    pub fn display_reason(&self) -> Option<String> {
        self.reason.as_deref().map(confidence::strip)
    }

    pub fn verdict_label(&self) -> &'static str {
        if self.safe {
            "ALLOWED"
        } else {
            "BLOCKED"
        }
    }
}

/// Wire body of `POST /guard/`.
#[derive(Debug, Serialize)]
pub(crate) struct ScanRequest<'a> {
    pub prompt: &'a str,
    pub config: &'a ScanConfiguration,
}
