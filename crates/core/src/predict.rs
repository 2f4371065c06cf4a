//! Batch overflow prediction.
//!
//! One [`OverflowPrediction`] is produced per input text, in input order.
//! The extraction step does not track an exact segment-to-frame mapping, so
//! when frame metrics exist the first frame in iteration order stands in for
//! the whole batch, and when none exist a synthesized standard frame is used.
//! Both fallbacks are deliberate approximations, surfaced only as
//! lower-confidence predictions, never as errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::char_len;
use crate::geometry::TextFrameMetrics;
use crate::language::{ExpansionFactors, TargetLanguage};
use crate::risk::{
    estimate_translated_len, overflow_risk, recommended_max_length, RiskBucket, RiskThresholds,
};

/// Projected fit of one text segment within one frame.
///
/// `overflow_risk <= 1.0` means the translation is expected to fit;
/// anything above means overflow is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverflowPrediction {
    pub original_text: String,
    pub estimated_translated_length: usize,
    pub available_space_chars: usize,
    pub overflow_risk: f64,
    pub recommended_max_length: usize,
    pub frame_id: String,
    pub suggestions: Vec<String>,
}

/// Produces overflow predictions for batches of texts against a frame table.
#[derive(Debug, Clone, Default)]
pub struct OverflowPredictor {
    expansion: ExpansionFactors,
    thresholds: RiskThresholds,
}

impl OverflowPredictor {
    pub fn new(expansion: ExpansionFactors, thresholds: RiskThresholds) -> Self {
        OverflowPredictor {
            expansion,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> RiskThresholds {
        self.thresholds
    }

    pub fn expansion_factor(&self, language: TargetLanguage) -> f64 {
        self.expansion.factor(language)
    }

    /// One prediction per input text, same order.
    ///
    /// An empty text list yields an empty result, not an error.
    pub fn predict(
        &self,
        texts: &[String],
        language: TargetLanguage,
        frame_metrics: &BTreeMap<String, TextFrameMetrics>,
    ) -> Vec<OverflowPrediction> {
        let factor = self.expansion.factor(language);
        // Without a per-segment mapping, one representative frame serves the
        // whole batch; with no frames at all, a standard frame is synthesized.
        let representative = frame_metrics.values().next().cloned();

        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let frame = representative
                    .clone()
                    .unwrap_or_else(|| TextFrameMetrics::standard(format!("frame_{i}"), char_len(text)));
                self.predict_single(text, factor, &frame)
            })
            .collect()
    }

    fn predict_single(
        &self,
        text: &str,
        factor: f64,
        frame: &TextFrameMetrics,
    ) -> OverflowPrediction {
        let estimated_length = estimate_translated_len(text, factor);
        let available = frame.character_capacity();
        let risk = overflow_risk(estimated_length, available);
        let suggestions = self.suggestions(text, estimated_length, available, risk);

        OverflowPrediction {
            original_text: text.to_string(),
            estimated_translated_length: estimated_length,
            available_space_chars: available,
            overflow_risk: risk,
            recommended_max_length: recommended_max_length(available),
            frame_id: frame.frame_id.clone(),
            suggestions,
        }
    }

    /// Deterministic suggestion ladder keyed on the risk bucket, plus an
    /// exact-reduction line whenever the estimate exceeds the space.
    fn suggestions(
        &self,
        text: &str,
        estimated_length: usize,
        available: usize,
        risk: f64,
    ) -> Vec<String> {
        let mut suggestions = Vec::new();

        match self.thresholds.classify(risk) {
            RiskBucket::Low => {
                suggestions.push("No overflow risk - translate normally".to_string());
            }
            RiskBucket::Medium => {
                suggestions.push("Low risk - monitor translation length".to_string());
                suggestions.push("Prefer concise phrasing where possible".to_string());
            }
            RiskBucket::High => {
                suggestions.push("Medium risk - request a compact translation".to_string());
                suggestions.push("Use standard technical abbreviations".to_string());
                suggestions.push("Drop non-essential words".to_string());
            }
            RiskBucket::Critical => {
                suggestions.push("Critical risk - action required".to_string());
                suggestions.push("Request an ultra-concise translation".to_string());
                suggestions.push("Use abbreviations and acronyms".to_string());
                suggestions.push("Consider reducing the font size".to_string());
                if char_len(text) > 100 {
                    suggestions.push("Split the text into smaller segments".to_string());
                }
            }
        }

        if estimated_length > available {
            let reduction = estimated_length - available;
            let percentage = reduction as f64 / estimated_length as f64 * 100.0;
            suggestions.push(format!(
                "Reduce length by ~{reduction} characters ({percentage:.1}%)"
            ));
        }

        suggestions
    }
}
