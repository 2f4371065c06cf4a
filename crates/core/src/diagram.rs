//! Heuristic diagram/flowchart frame detection.
//!
//! Flowchart frames hold short decision labels in tight boxes, so translated
//! text overflows them far more readily than prose frames. The detector
//! scores each frame from its geometry (squareness, character density) and
//! from lexical cues in the associated text (operational vocabulary,
//! decision words, flowchart punctuation), then routes detected frames to a
//! more aggressive compression ladder.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::compress::Strategy;
use crate::geometry::TextFrameMetrics;

/// Frames scoring at or above this value are treated as diagrams.
pub const DETECTION_THRESHOLD: f64 = 0.6;

/// How urgently a detected frame needs compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for CompressionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompressionPriority::Low => "low",
            CompressionPriority::Medium => "medium",
            CompressionPriority::High => "high",
            CompressionPriority::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Classification result for one frame suspected to hold a diagram.
#[derive(Debug, Clone, Serialize)]
pub struct DiagramFrameInfo {
    pub metrics: TextFrameMetrics,
    /// Diagram likelihood in [0, 1].
    pub diagram_score: f64,
    pub risk_factors: Vec<String>,
    pub compression_priority: CompressionPriority,
    pub recommended_strategies: Vec<Strategy>,
    /// False once the font is already at or below 9pt: shrinking it further
    /// is not a remedy worth suggesting.
    pub font_reduction_viable: bool,
}

/// Keyword and pattern tables for the lexical sub-score.
///
/// The built-in set covers German and Italian operational, inspection, and
/// decision vocabulary, matching the documents the pipeline handles.
#[derive(Debug, Clone)]
pub struct DiagramKeywords {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

impl Default for DiagramKeywords {
    fn default() -> Self {
        let keywords = [
            // German operational/inspection/maintenance vocabulary.
            "prüfung",
            "prüfen",
            "kontrolle",
            "inspektion",
            "wartung",
            "austausch",
            "ersetzen",
            "messen",
            "reinigen",
            "schmieren",
            "erforderlich",
            "wiederholen",
            "funktionsfähig",
            // German decision words.
            "ja",
            "nein",
            "weiter",
            // Italian counterparts.
            "verificare",
            "controllo",
            "ispezione",
            "manutenzione",
            "sostituire",
            "sì",
            "no",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();

        let patterns = [
            // Arrows between steps.
            r"(?:→|->|=>)",
            // Decision questions.
            r"\?\s*$|\?\s",
            // Step numbering: "Schritt 3", "Step 2", "Passo 1".
            r"(?i)\b(?:schritt|step|passo)\s+\d+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid built-in diagram pattern"))
        .collect();

        DiagramKeywords { keywords, patterns }
    }
}

impl DiagramKeywords {
    pub fn new(keywords: Vec<String>, patterns: Vec<Regex>) -> Self {
        DiagramKeywords { keywords, patterns }
    }

    /// Number of distinct keywords present in the text.
    fn keyword_matches(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| {
                // Whole-word containment; keywords are lowercase already.
                lower
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|w| w == k.as_str())
            })
            .count()
    }

    fn pattern_matches(&self, text: &str) -> usize {
        self.patterns.iter().filter(|p| p.is_match(text)).count()
    }
}

/// Classifies frames as diagram candidates and recommends compression routes.
#[derive(Debug, Clone, Default)]
pub struct DiagramFrameDetector {
    keywords: DiagramKeywords,
}

impl DiagramFrameDetector {
    pub fn new(keywords: DiagramKeywords) -> Self {
        DiagramFrameDetector { keywords }
    }

    /// Scores every frame and returns those at or above the detection
    /// threshold, keyed by frame identifier.
    pub fn detect(
        &self,
        frame_metrics: &BTreeMap<String, TextFrameMetrics>,
        text_by_frame: &BTreeMap<String, String>,
    ) -> BTreeMap<String, DiagramFrameInfo> {
        let mut detected = BTreeMap::new();

        for (frame_id, metrics) in frame_metrics {
            let text = text_by_frame
                .get(frame_id)
                .map(String::as_str)
                .unwrap_or("");
            let score = self.score(metrics, text);
            if score < DETECTION_THRESHOLD {
                continue;
            }

            let priority = priority(score, metrics.estimated_overflow_risk);
            let aggressive = score >= 0.8 || metrics.estimated_overflow_risk >= 1.2;
            detected.insert(
                frame_id.clone(),
                DiagramFrameInfo {
                    metrics: metrics.clone(),
                    diagram_score: score,
                    risk_factors: risk_factors(metrics, text),
                    compression_priority: priority,
                    recommended_strategies: recommended_strategies(aggressive),
                    font_reduction_viable: metrics.font_size > 9.0,
                },
            );
        }

        detected
    }

    /// Additive score in [0, 1]: geometry, density, weighted lexical
    /// content, and small-font bonus.
    pub fn score(&self, metrics: &TextFrameMetrics, text: &str) -> f64 {
        let mut score = 0.0;

        // Squareness: diagrams are boxy, prose columns are tall.
        let aspect = metrics.aspect_ratio();
        if (0.7..=1.4).contains(&aspect) {
            score += 0.2;
        } else if (0.5..=2.0).contains(&aspect) {
            score += 0.1;
        }

        // Sparse text over the frame area; the lower band wins.
        let density = metrics.character_density();
        if density < 0.5 {
            score += 0.3;
        } else if density < 1.0 {
            score += 0.2;
        }

        score += self.lexical_score(text) * 0.4;

        if metrics.font_size <= 10.0 {
            score += 0.1;
        }

        score.min(1.0)
    }

    /// Lexical sub-score before the 0.4 weighting: a base from distinct
    /// keyword matches plus 0.1 per flowchart punctuation pattern.
    fn lexical_score(&self, text: &str) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        let matches = self.keywords.keyword_matches(text);
        let base = if matches >= 3 {
            0.8
        } else if matches >= 2 {
            0.6
        } else if matches >= 1 {
            0.4
        } else {
            0.0
        };
        base + 0.1 * self.keywords.pattern_matches(text) as f64
    }
}

/// Priority from the diagram score and the frame's existing overflow risk.
fn priority(score: f64, overflow_risk: f64) -> CompressionPriority {
    if score >= 0.8 && overflow_risk >= 1.3 {
        CompressionPriority::Critical
    } else if score >= 0.7 && overflow_risk >= 1.1 {
        CompressionPriority::High
    } else if score >= DETECTION_THRESHOLD {
        CompressionPriority::Medium
    } else {
        CompressionPriority::Low
    }
}

/// Diagnostic strings naming why a frame is fragile.
fn risk_factors(metrics: &TextFrameMetrics, text: &str) -> Vec<String> {
    let mut factors = Vec::new();

    if metrics.area() < 30_000.0 && metrics.character_density() > 0.5 {
        factors.push("Small frame area with dense text".to_string());
    }
    if metrics.font_size <= 9.0 {
        factors.push("Font size already minimal".to_string());
    }
    if metrics.inset_spacing.max() < 3.0 {
        factors.push("Tight inset spacing".to_string());
    }
    if average_word_length(text) > 8.0 {
        factors.push("Long average word length (compound-heavy text)".to_string());
    }
    if metrics.estimated_overflow_risk > 1.2 {
        factors.push("Pre-existing high overflow risk".to_string());
    }

    factors
}

fn recommended_strategies(aggressive: bool) -> Vec<Strategy> {
    // Every detected frame gets abbreviation, procedural-language
    // compression, and decision-point simplification.
    let mut strategies = vec![
        Strategy::ApplyAbbreviations,
        Strategy::SimplifyLanguage,
        Strategy::RemoveOptionalWords,
    ];
    if aggressive {
        strategies.push(Strategy::UltraCompact);
        strategies.push(Strategy::RemoveRedundancy);
        strategies.push(Strategy::SubstituteSymbols);
    }
    strategies
}

fn average_word_length(text: &str) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let total: usize = words.iter().map(|w| w.chars().count()).sum();
    total as f64 / words.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{FrameSource, InsetSpacing};

    fn frame(
        id: &str,
        width: f64,
        height: f64,
        font_size: f64,
        char_count: usize,
        risk: f64,
    ) -> TextFrameMetrics {
        let mut metrics = TextFrameMetrics::from_source(&FrameSource {
            frame_id: id.to_string(),
            item_transform: Some(format!("{width} 0 0 {height} 0 0")),
            font_size: Some(font_size.to_string()),
            inset_spacing: Some("3".to_string()),
            char_count,
            ..FrameSource::default()
        });
        metrics.estimated_overflow_risk = risk;
        metrics
    }

    fn detector() -> DiagramFrameDetector {
        DiagramFrameDetector::default()
    }

    const DIAGRAM_TEXT: &str = "Prüfung der Komponenten. Funktionsfähig? \
        Ja → weiter zu Schritt 2. Nein → Inspektion wiederholen";

    #[test]
    fn test_diagram_frame_detected_as_critical() {
        // Square-ish, sparse, small font, keyword-heavy, high risk.
        let metrics = frame("d1", 300.0, 250.0, 9.0, 150, 1.4);
        let mut frames = BTreeMap::new();
        frames.insert("d1".to_string(), metrics);
        let mut texts = BTreeMap::new();
        texts.insert("d1".to_string(), DIAGRAM_TEXT.to_string());

        let detected = detector().detect(&frames, &texts);
        let info = detected.get("d1").expect("frame should be detected");
        assert!(info.diagram_score >= 0.8);
        assert_eq!(info.compression_priority, CompressionPriority::Critical);
        assert!(info
            .recommended_strategies
            .contains(&Strategy::UltraCompact));
        assert!(info
            .recommended_strategies
            .contains(&Strategy::SubstituteSymbols));
        assert!(!info.font_reduction_viable);
    }

    #[test]
    fn test_prose_frame_not_detected() {
        // Tall column, dense text, normal font, no diagram vocabulary.
        let mut metrics = frame("p1", 400.0, 600.0, 12.0, 800, 0.8);
        metrics.inset_spacing = InsetSpacing::uniform(6.0);
        let mut frames = BTreeMap::new();
        frames.insert("p1".to_string(), metrics);
        let mut texts = BTreeMap::new();
        texts.insert(
            "p1".to_string(),
            "Dieses Handbuch beschreibt die Montage des Systems im Detail.".to_string(),
        );

        let detected = detector().detect(&frames, &texts);
        assert!(detected.is_empty());
    }

    #[test]
    fn test_score_monotonic_in_keywords() {
        let metrics = frame("m1", 200.0, 200.0, 10.0, 50, 1.0);
        let d = detector();
        let none = d.score(&metrics, "kein relevanter Inhalt");
        let one = d.score(&metrics, "Kontrolle des Systems");
        let three = d.score(&metrics, "Kontrolle Wartung Inspektion");
        assert!(none <= one);
        assert!(one <= three);
    }

    #[test]
    fn test_score_capped_at_one() {
        let metrics = frame("c1", 100.0, 100.0, 8.0, 10, 1.5);
        let text = "Prüfung Wartung Inspektion Kontrolle? Ja → Schritt 1 → Schritt 2?";
        assert!(detector().score(&metrics, text) <= 1.0);
    }

    #[test]
    fn test_density_bands_are_exclusive() {
        let d = detector();
        // density ~0.3: low band only.
        let sparse = frame("s1", 100.0, 100.0, 12.0, 3000, 0.5);
        // 3000 / 10000 = 0.3
        let score_sparse = d.score(&sparse, "");
        // density ~0.7: middle band only.
        let mid = frame("s2", 100.0, 100.0, 12.0, 7000, 0.5);
        let score_mid = d.score(&mid, "");
        assert!(score_sparse > score_mid);
    }

    #[test]
    fn test_risk_factors_cover_fragile_frame() {
        let metrics = frame("f1", 120.0, 110.0, 8.0, 9000, 1.6);
        let factors = risk_factors(&metrics, "Befestigungselement Tragkonstruktion kontrollieren");
        assert!(factors.iter().any(|f| f.contains("dense text")));
        assert!(factors.iter().any(|f| f.contains("Font size")));
        assert!(factors.iter().any(|f| f.contains("word length")));
        assert!(factors.iter().any(|f| f.contains("overflow risk")));
    }

    #[test]
    fn test_medium_priority_without_high_risk() {
        // Detected but risk below every escalation threshold.
        let metrics = frame("m2", 250.0, 250.0, 10.0, 100, 0.5);
        let mut frames = BTreeMap::new();
        frames.insert("m2".to_string(), metrics);
        let mut texts = BTreeMap::new();
        texts.insert("m2".to_string(), DIAGRAM_TEXT.to_string());

        let detected = detector().detect(&frames, &texts);
        if let Some(info) = detected.get("m2") {
            assert_eq!(info.compression_priority, CompressionPriority::Medium);
        }
    }
}
