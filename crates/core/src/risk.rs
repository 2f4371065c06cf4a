//! Overflow-risk classification.
//!
//! Risk is the ratio of estimated translated length to frame capacity.
//! Values at or above 1.0 mean overflow is expected. Bucket boundaries are
//! configuration, not constants baked into call sites, so they can be tuned
//! per project.

use serde::{Deserialize, Serialize};

use crate::char_len;

/// Safety margin reserved inside every frame: targets are 90% of capacity.
pub const SAFETY_MARGIN: f64 = 0.9;

/// Discrete risk classification for one (text, frame) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBucket {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBucket::Low => "low",
            RiskBucket::Medium => "medium",
            RiskBucket::High => "high",
            RiskBucket::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bucket boundaries over the risk ratio.
///
/// The low/medium/high bands partition the sub-capacity region; any risk at
/// or above 1.0 is uniformly critical. The source material was ambiguous
/// about the 1.0 boundary, reporting it sometimes as high and sometimes as
/// critical; this implementation picks one rule and applies it everywhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        RiskThresholds {
            low: 0.75,
            medium: 0.90,
            high: 1.0,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, risk: f64) -> RiskBucket {
        if risk < self.low {
            RiskBucket::Low
        } else if risk < self.medium {
            RiskBucket::Medium
        } else if risk < self.high {
            RiskBucket::High
        } else {
            RiskBucket::Critical
        }
    }
}

/// Estimated character length of the translation of `text`.
pub fn estimate_translated_len(text: &str, expansion_factor: f64) -> usize {
    (char_len(text) as f64 * expansion_factor).floor() as usize
}

/// Overflow risk: estimated translated length over capacity. The capacity
/// is floored at 1 so the ratio is always finite.
pub fn overflow_risk(estimated_len: usize, capacity: usize) -> f64 {
    estimated_len as f64 / capacity.max(1) as f64
}

/// The length budget handed to compression: 90% of the frame capacity.
pub fn recommended_max_length(capacity: usize) -> usize {
    (capacity as f64 * SAFETY_MARGIN).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        let t = RiskThresholds::default();
        assert_eq!(t.classify(0.0), RiskBucket::Low);
        assert_eq!(t.classify(0.74), RiskBucket::Low);
        assert_eq!(t.classify(0.75), RiskBucket::Medium);
        assert_eq!(t.classify(0.89), RiskBucket::Medium);
        assert_eq!(t.classify(0.90), RiskBucket::High);
        assert_eq!(t.classify(0.999), RiskBucket::High);
        // At or above capacity is always critical.
        assert_eq!(t.classify(1.0), RiskBucket::Critical);
        assert_eq!(t.classify(3.5), RiskBucket::Critical);
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        // 10 characters with umlauts, factor 1.30 => floor(13.0) = 13.
        assert_eq!(estimate_translated_len("überprüfen", 1.30), 13);
        assert_eq!(estimate_translated_len("", 1.30), 0);
    }

    #[test]
    fn test_risk_monotonicity() {
        // Increasing estimated length never decreases risk.
        assert!(overflow_risk(100, 150) < overflow_risk(120, 150));
        // Increasing capacity never increases risk.
        assert!(overflow_risk(100, 200) < overflow_risk(100, 150));
        // Zero capacity is guarded.
        assert_eq!(overflow_risk(50, 0), 50.0);
    }

    #[test]
    fn test_recommended_max_length() {
        assert_eq!(recommended_max_length(150), 135);
        assert_eq!(recommended_max_length(156), 140);
        assert_eq!(recommended_max_length(0), 0);
    }
}
