//! Confidence values embedded in free-text verdict reasons.
//!
//! The gateway appends `(Conf: 0.87)` to some reasons instead of sending a
//! structured field. Both forms are accepted; the structured one wins.

use once_cell::sync::Lazy;
use regex::Regex;

static CONFIDENCE_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(Conf:\s*([0-9]*\.?[0-9]+)\)").expect("confidence pattern is valid")
});

static CONFIDENCE_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(Conf:.*?\)").expect("confidence strip pattern is valid"));

/// Score above which a verdict is shown as high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;
/// Score above which a verdict is shown as suspicious.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.3;

/// Display band for a score or confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_RISK_THRESHOLD {
            Self::High
        } else if score > MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "SAFE",
            Self::Medium => "SUSPICIOUS",
            Self::High => "TOXIC/ATTACK",
        }
    }
}

/// Resolve a confidence value from a structured field or the reason text.
///
/// Returns `None` when neither carries a fraction in `[0, 1]`; that means
/// "no quantified confidence", not a malformed response.
pub fn resolve(structured: Option<f64>, reason: Option<&str>) -> Option<f64> {
    structured
        .filter(|c| is_fraction(*c))
        .or_else(|| reason.and_then(extract))
}

/// Pull the `(Conf: x)` fraction out of a reason string.
pub fn extract(reason: &str) -> Option<f64> {
    CONFIDENCE_FRAGMENT
        .captures(reason)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|c| is_fraction(*c))
}

/// The reason with any `(Conf: ...)` fragment removed.
pub fn strip(reason: &str) -> String {
    CONFIDENCE_STRIP.replace(reason, "").trim().to_string()
}

/// Render a fraction as a whole percentage, e.g. `0.874` -> `87%`.
pub fn as_percent(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}

fn is_fraction(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
