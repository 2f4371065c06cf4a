//! Aggregate reports over predictions, resolutions, and diagram detections.
//!
//! Field names and nesting are a stable contract: the CLI serializes these
//! structs straight to JSON next to the translated document, and downstream
//! tooling reads them. Pure aggregation; inputs are never mutated.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::char_len;
use crate::compress::OverflowResolution;
use crate::diagram::DiagramFrameInfo;
use crate::language::TargetLanguage;
use crate::predict::OverflowPrediction;
use crate::risk::{RiskBucket, RiskThresholds};

const PREVIEW_LEN: usize = 100;
const MAX_HIGH_RISK_EXAMPLES: usize = 10;
const MAX_FAILED_EXAMPLES: usize = 5;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn preview(text: &str) -> String {
    if char_len(text) > PREVIEW_LEN {
        let head: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Builds the three run reports. Carries the thresholds so bucket counting
/// matches the classifier used for the predictions themselves.
#[derive(Debug, Clone, Default)]
pub struct OverflowReportBuilder {
    thresholds: RiskThresholds,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OverflowReport {
    /// Explicit nothing-to-analyze result; avoids dividing by zero anywhere.
    Empty { error: String },
    Full(Box<OverflowAnalysis>),
}

#[derive(Debug, Clone, Serialize)]
pub struct OverflowAnalysis {
    pub summary: OverflowSummary,
    pub risk_distribution: RiskCounts,
    pub risk_percentages: RiskPercentages,
    pub high_risk_texts: Vec<HighRiskText>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverflowSummary {
    pub total_texts: usize,
    pub target_language: TargetLanguage,
    pub expansion_factor: f64,
    pub average_overflow_risk: f64,
    pub total_original_chars: usize,
    pub total_estimated_chars: usize,
    /// Overall expansion across the document, in percent.
    pub estimated_expansion: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl RiskCounts {
    fn add(&mut self, bucket: RiskBucket) {
        match bucket {
            RiskBucket::Low => self.low += 1,
            RiskBucket::Medium => self.medium += 1,
            RiskBucket::High => self.high += 1,
            RiskBucket::Critical => self.critical += 1,
        }
    }

    fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskPercentages {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HighRiskText {
    pub text_preview: String,
    pub overflow_risk: f64,
    pub estimated_length: usize,
    pub available_space: usize,
    pub recommended_max: usize,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CompressionReport {
    Empty { error: String },
    Full(Box<CompressionAnalysis>),
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressionAnalysis {
    pub summary: CompressionSummary,
    pub method_usage: BTreeMap<String, usize>,
    pub failed_resolutions: usize,
    pub failed_examples: Vec<FailedExample>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompressionSummary {
    pub total_texts: usize,
    pub successful_resolutions: usize,
    pub success_rate: f64,
    pub total_space_saved: usize,
    pub average_space_saved: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedExample {
    pub original_length: usize,
    pub final_length: usize,
    pub text_preview: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DiagramReport {
    Empty { error: String },
    Full(Box<DiagramAnalysis>),
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagramAnalysis {
    pub summary: DiagramSummary,
    pub critical_frames: Vec<CriticalFrame>,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagramSummary {
    pub total_diagrams: usize,
    pub average_diagram_score: f64,
    pub priority_distribution: BTreeMap<String, usize>,
    pub critical_frames_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriticalFrame {
    pub frame_id: String,
    pub diagram_score: f64,
    pub overflow_risk: f64,
    pub risk_factors: Vec<String>,
}

impl OverflowReportBuilder {
    pub fn new(thresholds: RiskThresholds) -> Self {
        OverflowReportBuilder { thresholds }
    }

    /// Summarizes a prediction batch: bucket distribution, averages, the
    /// worst offenders with their top suggestions, and global guidance.
    pub fn overflow(
        &self,
        predictions: &[OverflowPrediction],
        language: TargetLanguage,
        expansion_factor: f64,
    ) -> OverflowReport {
        if predictions.is_empty() {
            return OverflowReport::Empty {
                error: "No texts to analyze".to_string(),
            };
        }

        let total = predictions.len();
        let mut counts = RiskCounts::default();
        let mut high_risk = Vec::new();

        for pred in predictions {
            let bucket = self.thresholds.classify(pred.overflow_risk);
            counts.add(bucket);
            if bucket >= RiskBucket::High && high_risk.len() < MAX_HIGH_RISK_EXAMPLES {
                high_risk.push(HighRiskText {
                    text_preview: preview(&pred.original_text),
                    overflow_risk: round3(pred.overflow_risk),
                    estimated_length: pred.estimated_translated_length,
                    available_space: pred.available_space_chars,
                    recommended_max: pred.recommended_max_length,
                    suggestions: pred.suggestions.iter().take(3).cloned().collect(),
                });
            }
        }

        let average_risk =
            predictions.iter().map(|p| p.overflow_risk).sum::<f64>() / total as f64;
        let total_original: usize = predictions
            .iter()
            .map(|p| char_len(&p.original_text))
            .sum();
        let total_estimated: usize = predictions
            .iter()
            .map(|p| p.estimated_translated_length)
            .sum();
        let expansion_pct =
            (total_estimated as f64 / total_original.max(1) as f64 - 1.0) * 100.0;

        let pct = |count: usize| round1(count as f64 / total as f64 * 100.0);

        OverflowReport::Full(Box::new(OverflowAnalysis {
            summary: OverflowSummary {
                total_texts: total,
                target_language: language,
                expansion_factor,
                average_overflow_risk: round3(average_risk),
                total_original_chars: total_original,
                total_estimated_chars: total_estimated,
                estimated_expansion: round1(expansion_pct),
            },
            risk_distribution: counts.clone(),
            risk_percentages: RiskPercentages {
                low: pct(counts.low),
                medium: pct(counts.medium),
                high: pct(counts.high),
                critical: pct(counts.critical),
            },
            high_risk_texts: high_risk,
            recommendations: overflow_recommendations(&counts, average_risk),
        }))
    }

    /// Summarizes compression outcomes: success rate, strategy usage, and
    /// the texts that still exceed their budget.
    pub fn compression(&self, resolutions: &[OverflowResolution]) -> CompressionReport {
        if resolutions.is_empty() {
            return CompressionReport::Empty {
                error: "No resolutions to analyze".to_string(),
            };
        }

        let total = resolutions.len();
        let successful = resolutions.iter().filter(|r| r.success).count();
        let total_saved: usize = resolutions.iter().map(|r| r.space_saved).sum();

        let mut method_usage: BTreeMap<String, usize> = BTreeMap::new();
        for resolution in resolutions {
            for method in &resolution.methods_applied {
                *method_usage.entry(method.to_string()).or_insert(0) += 1;
            }
        }

        let failed: Vec<&OverflowResolution> = resolutions
            .iter()
            .filter(|r| !r.success && !r.methods_applied.is_empty())
            .collect();
        let failed_examples = failed
            .iter()
            .take(MAX_FAILED_EXAMPLES)
            .map(|r| FailedExample {
                original_length: char_len(&r.original_text),
                final_length: char_len(&r.resolved_text),
                text_preview: preview(&r.original_text),
                notes: r.notes.clone(),
            })
            .collect();

        let success_rate = successful as f64 / total as f64;

        CompressionReport::Full(Box::new(CompressionAnalysis {
            summary: CompressionSummary {
                total_texts: total,
                successful_resolutions: successful,
                success_rate: round1(success_rate * 100.0),
                total_space_saved: total_saved,
                average_space_saved: round1(total_saved as f64 / total as f64),
            },
            method_usage: method_usage.clone(),
            failed_resolutions: resolutions.iter().filter(|r| !r.success).count(),
            failed_examples,
            recommendations: compression_recommendations(resolutions, &method_usage),
        }))
    }

    /// Summarizes diagram detection: priority distribution and the critical
    /// frames that need attention before insertion.
    pub fn diagrams(
        &self,
        detections: &BTreeMap<String, DiagramFrameInfo>,
    ) -> DiagramReport {
        if detections.is_empty() {
            return DiagramReport::Empty {
                error: "No diagram frames detected".to_string(),
            };
        }

        let total = detections.len();
        let average_score =
            detections.values().map(|d| d.diagram_score).sum::<f64>() / total as f64;

        let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
        for info in detections.values() {
            *distribution
                .entry(info.compression_priority.to_string())
                .or_insert(0) += 1;
        }

        let critical: Vec<CriticalFrame> = detections
            .iter()
            .filter(|(_, info)| {
                info.compression_priority == crate::diagram::CompressionPriority::Critical
            })
            .map(|(frame_id, info)| CriticalFrame {
                frame_id: frame_id.clone(),
                diagram_score: round3(info.diagram_score),
                overflow_risk: round3(info.metrics.estimated_overflow_risk),
                risk_factors: info.risk_factors.clone(),
            })
            .collect();

        let mut next_steps = Vec::new();
        if !critical.is_empty() {
            next_steps.push(format!(
                "{} critical diagram frame(s) - compress with the diagram ladder before insertion",
                critical.len()
            ));
        }
        if detections.values().any(|d| !d.font_reduction_viable) {
            next_steps.push(
                "Some frames already use minimal font sizes - font reduction is not a remedy there"
                    .to_string(),
            );
        }
        next_steps.push(
            "Review detected frames after insertion for clipped decision labels".to_string(),
        );

        DiagramReport::Full(Box::new(DiagramAnalysis {
            summary: DiagramSummary {
                total_diagrams: total,
                average_diagram_score: round3(average_score),
                priority_distribution: distribution,
                critical_frames_count: critical.len(),
            },
            critical_frames: critical,
            next_steps,
        }))
    }
}

fn overflow_recommendations(counts: &RiskCounts, average_risk: f64) -> Vec<String> {
    let mut recommendations = Vec::new();

    if average_risk < 0.7 {
        recommendations
            .push("Low overall overflow risk - proceed with standard translation".to_string());
    } else if average_risk < 0.9 {
        recommendations.push("Moderate risk - use compact translation mode".to_string());
        recommendations.push("Monitor the longest texts closely".to_string());
    } else {
        recommendations
            .push("High overflow risk - a preventive strategy is required".to_string());
        recommendations.push("Use ultra-concise translation for all texts".to_string());
    }

    let total = counts.total().max(1);
    let high_risk_pct = (counts.high + counts.critical) as f64 / total as f64 * 100.0;
    if high_risk_pct > 20.0 {
        recommendations.push(format!(
            "{:.1}% of texts are high risk - consider manual review of problem translations",
            high_risk_pct
        ));
    }
    if counts.critical > 0 {
        recommendations.push(format!(
            "{} text(s) at critical risk - manual intervention required",
            counts.critical
        ));
    }

    recommendations
}

fn compression_recommendations(
    resolutions: &[OverflowResolution],
    method_usage: &BTreeMap<String, usize>,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let total = resolutions.len().max(1);
    let success_rate = resolutions.iter().filter(|r| r.success).count() as f64 / total as f64;
    if success_rate > 0.9 {
        recommendations.push("Excellent compression success rate".to_string());
    } else if success_rate > 0.7 {
        recommendations.push("Good compression success rate, with room to improve".to_string());
    } else {
        recommendations
            .push("Low compression success rate - review the strategy tables".to_string());
    }

    if let Some((method, uses)) = method_usage.iter().max_by_key(|(_, uses)| **uses) {
        recommendations.push(format!("Most effective method: {method} (used {uses} times)"));
    }

    let failed = resolutions.iter().filter(|r| !r.success).count();
    if failed > 0 {
        recommendations.push(format!("{failed} text(s) require manual intervention"));
        recommendations.push(
            "Consider font-size or frame adjustments for the critical cases".to_string(),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::Strategy;

    fn prediction(text: &str, risk: f64) -> OverflowPrediction {
        OverflowPrediction {
            original_text: text.to_string(),
            estimated_translated_length: (char_len(text) as f64 * 1.3) as usize,
            available_space_chars: 150,
            overflow_risk: risk,
            recommended_max_length: 135,
            frame_id: "u1".to_string(),
            suggestions: vec![
                "first".to_string(),
                "second".to_string(),
                "third".to_string(),
                "fourth".to_string(),
            ],
        }
    }

    fn resolution(success: bool, saved: usize, methods: Vec<Strategy>) -> OverflowResolution {
        OverflowResolution {
            original_text: "original".to_string(),
            resolved_text: "resolved".to_string(),
            methods_applied: methods,
            space_saved: saved,
            success,
            notes: "note".to_string(),
        }
    }

    #[test]
    fn test_empty_overflow_report() {
        let builder = OverflowReportBuilder::default();
        let report = builder.overflow(&[], TargetLanguage::German, 1.3);
        assert!(matches!(report, OverflowReport::Empty { .. }));
    }

    #[test]
    fn test_overflow_report_distribution() {
        let builder = OverflowReportBuilder::default();
        let predictions = vec![
            prediction("short text", 0.4),
            prediction("medium text", 0.8),
            prediction("long text", 0.95),
            prediction("too long", 1.5),
        ];
        let report = builder.overflow(&predictions, TargetLanguage::German, 1.3);
        let OverflowReport::Full(analysis) = report else {
            panic!("expected full report");
        };
        assert_eq!(analysis.summary.total_texts, 4);
        assert_eq!(analysis.risk_distribution.low, 1);
        assert_eq!(analysis.risk_distribution.medium, 1);
        assert_eq!(analysis.risk_distribution.high, 1);
        assert_eq!(analysis.risk_distribution.critical, 1);
        assert_eq!(analysis.risk_percentages.low, 25.0);
        // High and critical texts both appear as examples, capped suggestions.
        assert_eq!(analysis.high_risk_texts.len(), 2);
        assert_eq!(analysis.high_risk_texts[0].suggestions.len(), 3);
        // 50% high risk plus a critical text triggers both call-outs.
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("manual review")));
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("manual intervention")));
    }

    #[test]
    fn test_overflow_preview_truncated() {
        let builder = OverflowReportBuilder::default();
        let long_text = "y".repeat(150);
        let predictions = vec![prediction(&long_text, 1.2)];
        let OverflowReport::Full(analysis) =
            builder.overflow(&predictions, TargetLanguage::German, 1.3)
        else {
            panic!("expected full report");
        };
        let preview = &analysis.high_risk_texts[0].text_preview;
        assert_eq!(char_len(preview), 103);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_empty_compression_report() {
        let builder = OverflowReportBuilder::default();
        assert!(matches!(
            builder.compression(&[]),
            CompressionReport::Empty { .. }
        ));
    }

    #[test]
    fn test_compression_report_counts_methods() {
        let builder = OverflowReportBuilder::default();
        let resolutions = vec![
            resolution(true, 20, vec![Strategy::RemoveRedundancy, Strategy::ApplyAbbreviations]),
            resolution(true, 10, vec![Strategy::ApplyAbbreviations]),
            resolution(false, 0, vec![]),
        ];
        let CompressionReport::Full(analysis) = builder.compression(&resolutions) else {
            panic!("expected full report");
        };
        assert_eq!(analysis.summary.total_texts, 3);
        assert_eq!(analysis.summary.successful_resolutions, 2);
        assert_eq!(analysis.summary.total_space_saved, 30);
        assert_eq!(analysis.method_usage["apply_abbreviations"], 2);
        assert_eq!(analysis.method_usage["remove_redundancy"], 1);
        assert_eq!(analysis.failed_resolutions, 1);
        // The failure applied no methods, so it is not an example.
        assert!(analysis.failed_examples.is_empty());
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("apply_abbreviations")));
    }

    #[test]
    fn test_empty_diagram_report() {
        let builder = OverflowReportBuilder::default();
        assert!(matches!(
            builder.diagrams(&BTreeMap::new()),
            DiagramReport::Empty { .. }
        ));
    }
}
