//! The layered text-compression engine.
//!
//! Compression is a pipeline of independent text-rewrite strategies applied
//! in a fixed order until a target length is met or the iteration budget is
//! exhausted. Strategies are pure regex/word-level rewrites and are not
//! guaranteed to shorten every input; a strategy with nothing to rewrite is
//! a no-op, never an error. Only [`intelligent_truncate`] gives a hard
//! length guarantee, which is why it stays outside the main loop as a
//! last-resort operation for callers that need one.
//!
//! The built-in rule tables target German, the heaviest-expansion language
//! the pipeline handles; other languages get the language-neutral subset
//! (repeated-word collapse, numeric compaction). The ordering
//! redundancy -> abbreviations -> simplification -> optional words ->
//! numeric compaction is a documented contract: the tables are not
//! commutative and reordering them changes outcomes.

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::char_len;
use crate::language::TargetLanguage;
use crate::predict::OverflowPrediction;

/// One compression strategy, identified for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    RemoveRedundancy,
    ApplyAbbreviations,
    SimplifyLanguage,
    RemoveOptionalWords,
    CompactNumbers,
    SubstituteSymbols,
    UltraCompact,
    Truncate,
}

impl Strategy {
    /// The fixed order of the main compression loop.
    pub const CORE_ORDER: [Strategy; 5] = [
        Strategy::RemoveRedundancy,
        Strategy::ApplyAbbreviations,
        Strategy::SimplifyLanguage,
        Strategy::RemoveOptionalWords,
        Strategy::CompactNumbers,
    ];

    /// Extended order for frames classified as diagrams: the core ladder plus
    /// symbol substitution and, for critical frames, ultra-compact elision.
    pub const DIAGRAM_ORDER: [Strategy; 7] = [
        Strategy::RemoveRedundancy,
        Strategy::ApplyAbbreviations,
        Strategy::SimplifyLanguage,
        Strategy::RemoveOptionalWords,
        Strategy::CompactNumbers,
        Strategy::SubstituteSymbols,
        Strategy::UltraCompact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RemoveRedundancy => "remove_redundancy",
            Strategy::ApplyAbbreviations => "apply_abbreviations",
            Strategy::SimplifyLanguage => "simplify_language",
            Strategy::RemoveOptionalWords => "remove_optional_words",
            Strategy::CompactNumbers => "compact_numbers",
            Strategy::SubstituteSymbols => "substitute_symbols",
            Strategy::UltraCompact => "ultra_compact",
            Strategy::Truncate => "truncate",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of attempting to compress one text to its prediction's target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverflowResolution {
    pub original_text: String,
    pub resolved_text: String,
    pub methods_applied: Vec<Strategy>,
    pub space_saved: usize,
    pub success: bool,
    pub notes: String,
}

/// Compiled rewrite tables for one language.
///
/// Construction compiles every pattern once; applying a strategy is then
/// pure substitution with no allocation beyond the rewritten string.
#[derive(Debug, Clone)]
pub struct CompressionRules {
    redundancy: Vec<(Regex, String)>,
    abbreviations: Vec<(Regex, String)>,
    simplifications: Vec<(Regex, String)>,
    optional_words: Vec<String>,
    numeric: Vec<(Regex, String)>,
    symbols: Vec<(Regex, String)>,
    ultra: Vec<(Regex, String)>,
}

fn compile(table: &[(&str, &str)]) -> Vec<(Regex, String)> {
    table
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("invalid built-in compression pattern"),
                (*replacement).to_string(),
            )
        })
        .collect()
}

/// Compiles a term -> abbreviation dictionary as whole-word, case-insensitive
/// substitutions, longest terms first so multi-word phrases are not corrupted
/// by their own sub-terms.
fn compile_abbreviations(table: &[(&str, &str)]) -> Vec<(Regex, String)> {
    let mut entries: Vec<(&str, &str)> = table.to_vec();
    entries.sort_by(|a, b| char_len(b.0).cmp(&char_len(a.0)).then(a.0.cmp(b.0)));
    entries
        .iter()
        .map(|(term, abbrev)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
            (
                Regex::new(&pattern).expect("invalid abbreviation term"),
                (*abbrev).to_string(),
            )
        })
        .collect()
}

impl CompressionRules {
    /// The built-in rule tables for a target language.
    pub fn builtin(language: TargetLanguage) -> Self {
        match language {
            TargetLanguage::German => Self::german(),
            _ => Self::neutral(),
        }
    }

    /// Language-neutral subset: numeric compaction plus whitespace hygiene.
    fn neutral() -> Self {
        CompressionRules {
            redundancy: Vec::new(),
            abbreviations: Vec::new(),
            simplifications: Vec::new(),
            optional_words: Vec::new(),
            numeric: compile(&[
                (r"(\d+)\s*x\s*(\d+)", "${1}x${2}"),
                (r"(\d+)\s*/\s*(\d+)", "${1}/${2}"),
                (r"(\d+)\s*:\s*(\d+)", "${1}:${2}"),
                (r"(\d+),(\d+)", "${1}.${2}"),
            ]),
            symbols: Vec::new(),
            ultra: Vec::new(),
        }
    }

    fn german() -> Self {
        CompressionRules {
            redundancy: compile(&[
                // Verbose verbal scaffolding.
                (r"(?i)es ist notwendig zu", "zu"),
                (r"(?i)es ist wichtig zu", "zu"),
                (r"(?i)stellen Sie sicher, dass", "sicherstellen:"),
                (r"(?i)achten Sie darauf, dass", "beachten:"),
                // Courtesy phrases dropped in technical register.
                (r"(?i)bitte beachten Sie", "beachten"),
                (r"(?i)wir empfehlen", "empfohlen:"),
                (r"(?i)es wird empfohlen", "empfohlen:"),
                // Multi-word connectives with shorter synonyms.
                (r"(?i)darüber hinaus", "außerdem"),
                (r"(?i)zusätzlich dazu", "zusätzlich"),
                (r"(?i)abgesehen davon", "außerdem"),
                // Doubled articles.
                (r"(?i)\b(der|die|das)\s+(?:der|die|das)\b", "${1}"),
            ]),
            abbreviations: compile_abbreviations(&[
                // Measurement units.
                ("Millimeter", "mm"),
                ("Zentimeter", "cm"),
                ("Kilogramm", "kg"),
                ("Kilonewton", "kN"),
                ("Quadratmeter", "m²"),
                // Technical nouns.
                ("Installation", "Install."),
                ("Montage", "Mont."),
                ("Anweisungen", "Anweis."),
                ("Handbuch", "Handb."),
                ("Dokument", "Dok."),
                ("Abbildung", "Abb."),
                ("Tabelle", "Tab."),
                ("Kapitel", "Kap."),
                ("Abschnitt", "Abschn."),
                ("Absatz", "Abs."),
                ("Zertifizierung", "Zertif."),
                // Procedural and diagram vocabulary.
                ("überprüfen", "prüf."),
                ("kontrollieren", "kontroll."),
                ("sicherstellen", "sicherstell."),
                ("verwenden", "verwend."),
                ("erforderlich", "erf."),
                ("gegebenenfalls", "ggf."),
                ("beziehungsweise", "bzw."),
                ("zum Beispiel", "z.B."),
                ("unter Umständen", "u.U."),
                // Common phrases.
                ("für weitere Informationen", "für Details"),
                ("wie in der Abbildung gezeigt", "siehe Abb."),
                ("gemäß den Anweisungen", "gem. Anweis."),
                ("während der Montage", "bei Mont."),
                // Safety vocabulary.
                ("persönliche Schutzausrüstung", "PSA"),
                ("Absturzsicherung", "Absturzsich."),
                ("Sicherheitssystem", "Sich.syst."),
            ]),
            simplifications: compile(&[
                // Passive forms shortened toward the participle.
                (r"(?i)\bwird\s+(ge\w+t)\b", "${1}"),
                // Relative-clause compaction: ", der defekt ist" -> " (defekt)".
                (r"(?i),\s*(?:der|die|das)\s+(\w+)\s+ist\b", " (${1})"),
                // Prepositional phrases.
                (r"(?i)in\s+der\s+Regel", "normalerweise"),
                (r"(?i)im\s+Falle\s+von", "bei"),
                (r"(?i)mit\s+Hilfe\s+von", "mit"),
                (r"(?i)aufgrund\s+von", "wegen"),
                // Compound conjunctions.
                (r"(?i)sowohl\s+(\w+)\s+als\s+auch\s+(\w+)", "${1} und ${2}"),
                (
                    r"(?i)nicht\s+nur\s+(\w+),?\s+sondern\s+auch\s+(\w+)",
                    "${1} und ${2}",
                ),
            ]),
            optional_words: [
                "auch",
                "noch",
                "bereits",
                "schon",
                "dann",
                "danach",
                "dabei",
                "hierzu",
                "dazu",
                "außerdem",
                "zusätzlich",
                "entsprechend",
                "jeweilig",
                "jeweils",
                "gegebenenfalls",
                "eventuell",
                "möglicherweise",
                "normalerweise",
                "üblicherweise",
                "grundsätzlich",
                "selbstverständlich",
                "natürlich",
                "offensichtlich",
            ]
            .iter()
            .map(|w| w.to_string())
            .collect(),
            numeric: compile(&[
                // Range expressions.
                (r"(?i)von\s+(\d+)\s+bis\s+(\d+)", "${1}-${2}"),
                (r"(?i)zwischen\s+(\d+)\s+und\s+(\d+)", "${1}-${2}"),
                // Spaces around multiplication/division/ratio symbols.
                (r"(\d+)\s*x\s*(\d+)", "${1}x${2}"),
                (r"(\d+)\s*/\s*(\d+)", "${1}/${2}"),
                (r"(\d+)\s*:\s*(\d+)", "${1}:${2}"),
                // Decimal comma to decimal point.
                (r"(\d+),(\d+)", "${1}.${2}"),
                // Spelled-out units and percentages.
                (r"(?i)(\d+)\s*Prozent", "${1}%"),
                (r"(?i)(\d+)\s*Grad\s*Celsius", "${1}°C"),
                // Collapse the space before already-abbreviated units.
                (r"(\d+)\s+(mm|cm|kg|kN|m²)\b", "${1}${2}"),
            ]),
            symbols: compile(&[
                (r"(?i)\bweiter\s+zu\b", "→"),
                (r"(?i)\bführt\s+zu\b", "→"),
                (r"(?i)\bja\b", "✓"),
                (r"(?i)\bnein\b", "✗"),
                (r"(?i)\bin\s+Ordnung\b", "✓"),
                (r"(?i)\b(Achtung|Warnung)\b", "⚠"),
                (r"(?i)\berhöhen\b", "↑"),
                (r"(?i)\bverringern\b", "↓"),
            ]),
            ultra: compile(&[
                // Article and indefinite-article elision.
                (
                    r"(?i)\b(?:der|die|das|den|dem|des|ein|eine|einen|einem|einer|eines)\s+",
                    "",
                ),
                // Contractions.
                (r"(?i)\bzu\s+dem\b", "zum"),
                (r"(?i)\bzu\s+der\b", "zur"),
                (r"(?i)\bin\s+dem\b", "im"),
                (r"(?i)\bvon\s+dem\b", "vom"),
                (r"(?i)\ban\s+dem\b", "am"),
                // Conjunctions to symbols.
                (r"(?i)\bund\b", "+"),
                (r"(?i)\boder\b", "/"),
                // Ordinals to numerals.
                (r"(?i)\berste[rns]?\b", "1."),
                (r"(?i)\bzweite[rns]?\b", "2."),
                (r"(?i)\bdritte[rns]?\b", "3."),
                (r"(?i)\bvierte[rns]?\b", "4."),
                (r"(?i)\bfünfte[rns]?\b", "5."),
            ]),
        }
    }
}

/// Applies compression strategies to texts until they meet a length budget.
#[derive(Debug, Clone)]
pub struct TextCompressionEngine {
    rules: CompressionRules,
}

impl TextCompressionEngine {
    pub fn new(rules: CompressionRules) -> Self {
        TextCompressionEngine { rules }
    }

    pub fn for_language(language: TargetLanguage) -> Self {
        TextCompressionEngine::new(CompressionRules::builtin(language))
    }

    /// Resolves one prediction with the core strategy order.
    ///
    /// Predictions at or below capacity need no action and resolve to the
    /// original text with `success = true`.
    pub fn resolve(&self, prediction: &OverflowPrediction, max_iterations: usize) -> OverflowResolution {
        self.resolve_with(prediction, max_iterations, &Strategy::CORE_ORDER)
    }

    /// Resolves one prediction with an explicit strategy order, e.g. the
    /// diagram ladder recommended by the detector.
    pub fn resolve_with(
        &self,
        prediction: &OverflowPrediction,
        max_iterations: usize,
        strategies: &[Strategy],
    ) -> OverflowResolution {
        if prediction.overflow_risk <= 1.0 {
            return OverflowResolution {
                original_text: prediction.original_text.clone(),
                resolved_text: prediction.original_text.clone(),
                methods_applied: Vec::new(),
                space_saved: 0,
                success: true,
                notes: "No overflow predicted".to_string(),
            };
        }

        let target = prediction.recommended_max_length;
        let (resolved, methods, saved) =
            self.run(&prediction.original_text, target, max_iterations, strategies);

        let final_length = char_len(&resolved);
        let success = final_length <= target;
        let mut notes = format!("Final length {final_length}/{target}. ");
        if methods.is_empty() {
            notes.push_str("No compression applied");
        } else {
            let names: Vec<&str> = methods.iter().map(|m| m.as_str()).collect();
            notes.push_str(&format!("Strategies: {}", names.join(", ")));
        }

        OverflowResolution {
            original_text: prediction.original_text.clone(),
            resolved_text: resolved,
            methods_applied: methods,
            space_saved: saved,
            success,
            notes,
        }
    }

    /// Compresses a text toward an explicit character budget, outside any
    /// prediction. Used for caller-specified maximum-compression targets.
    pub fn compress_to(&self, text: &str, target_length: usize, max_iterations: usize) -> String {
        let (resolved, _, _) = self.run(text, target_length, max_iterations, &Strategy::CORE_ORDER);
        resolved
    }

    fn run(
        &self,
        text: &str,
        target: usize,
        max_iterations: usize,
        strategies: &[Strategy],
    ) -> (String, Vec<Strategy>, usize) {
        let mut current = text.to_string();
        let mut methods = Vec::new();
        let mut total_saved = 0usize;

        for _ in 0..max_iterations {
            if char_len(&current) <= target {
                break;
            }
            for &strategy in strategies {
                let previous = char_len(&current);
                current = self.apply(&current, strategy);
                let saved = previous.saturating_sub(char_len(&current));
                if saved > 0 {
                    debug!("strategy {strategy} saved {saved} characters");
                    if !methods.contains(&strategy) {
                        methods.push(strategy);
                    }
                    total_saved += saved;
                }
                if char_len(&current) <= target {
                    break;
                }
            }
        }

        (current, methods, total_saved)
    }

    /// Applies a single strategy. A strategy with nothing to rewrite returns
    /// the input unchanged; no strategy ever fails.
    pub fn apply(&self, text: &str, strategy: Strategy) -> String {
        match strategy {
            Strategy::RemoveRedundancy => {
                let collapsed = collapse_repeated_words(text);
                let rewritten = substitute_all(&collapsed, &self.rules.redundancy);
                normalize_whitespace(&rewritten)
            }
            Strategy::ApplyAbbreviations => substitute_all(text, &self.rules.abbreviations),
            Strategy::SimplifyLanguage => substitute_all(text, &self.rules.simplifications),
            Strategy::RemoveOptionalWords => {
                remove_optional_words(text, &self.rules.optional_words)
            }
            Strategy::CompactNumbers => substitute_all(text, &self.rules.numeric),
            Strategy::SubstituteSymbols => substitute_all(text, &self.rules.symbols),
            Strategy::UltraCompact => {
                normalize_whitespace(&substitute_all(text, &self.rules.ultra))
            }
            Strategy::Truncate => text.to_string(),
        }
    }
}

fn substitute_all(text: &str, rules: &[(Regex, String)]) -> String {
    let mut result = text.to_string();
    for (pattern, replacement) in rules {
        result = pattern.replace_all(&result, replacement.as_str()).into_owned();
    }
    result
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses immediately repeated words ("der der" -> "der"), comparing
/// case-insensitively on the alphanumeric core of each token.
fn collapse_repeated_words(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        let clean = word_core(word);
        if let Some(last) = out.last() {
            if !clean.is_empty() && word_core(last) == clean {
                continue;
            }
        }
        out.push(word);
    }
    out.join(" ")
}

fn remove_optional_words(text: &str, optional: &[String]) -> String {
    if optional.is_empty() {
        return text.to_string();
    }
    let kept: Vec<&str> = text
        .split_whitespace()
        .filter(|word| {
            let clean = word_core(word);
            clean.is_empty() || !optional.iter().any(|o| *o == clean)
        })
        .collect();
    kept.join(" ")
}

fn word_core(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Last-resort truncation with a hard length guarantee.
///
/// Tries the last full-sentence boundary within the budget, then the last
/// full-word boundary with a three-character ellipsis, then a hard cut.
/// For any `target_length >= 4` the result is at most `target_length`
/// characters.
pub fn intelligent_truncate(text: &str, target_length: usize) -> String {
    if char_len(text) <= target_length {
        return text.to_string();
    }
    if target_length < 4 {
        return text.chars().take(target_length).collect();
    }

    // Sentence boundary: longest prefix ending in .!? that fits the budget.
    let mut best_sentence_len = 0usize;
    for (i, c) in text.chars().enumerate() {
        if matches!(c, '.' | '!' | '?') && i + 1 <= target_length {
            best_sentence_len = i + 1;
        }
    }
    if best_sentence_len > 0 {
        return text.chars().take(best_sentence_len).collect();
    }

    // Word boundary, leaving three characters for the ellipsis.
    let budget = target_length - 3;
    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0usize;
    for word in text.split_whitespace() {
        let word_len = char_len(word);
        let needed = if kept.is_empty() { word_len } else { word_len + 1 };
        if used + needed > budget {
            break;
        }
        kept.push(word);
        used += needed;
    }
    if !kept.is_empty() {
        return format!("{}...", kept.join(" "));
    }

    // Hard cut.
    let prefix: String = text.chars().take(target_length - 3).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::OverflowPrediction;

    fn engine() -> TextCompressionEngine {
        TextCompressionEngine::for_language(TargetLanguage::German)
    }

    fn prediction(text: &str, target: usize) -> OverflowPrediction {
        let len = char_len(text);
        OverflowPrediction {
            original_text: text.to_string(),
            estimated_translated_length: len,
            available_space_chars: target,
            overflow_risk: len as f64 / target.max(1) as f64,
            recommended_max_length: target,
            frame_id: "u1".to_string(),
            suggestions: Vec::new(),
        }
    }

    #[test]
    fn test_redundancy_removes_courtesy_phrase() {
        let out = engine().apply(
            "Bitte beachten Sie die Anweisungen im Handbuch",
            Strategy::RemoveRedundancy,
        );
        assert!(!out.to_lowercase().contains("bitte beachten sie"));
        assert!(out.contains("beachten"));
    }

    #[test]
    fn test_redundancy_collapses_repeated_words() {
        let out = engine().apply("die die Schraube festziehen", Strategy::RemoveRedundancy);
        assert_eq!(out, "die Schraube festziehen");
    }

    #[test]
    fn test_abbreviations_units_and_nouns() {
        let out = engine().apply(
            "Der Abstand beträgt 5 Millimeter laut Handbuch",
            Strategy::ApplyAbbreviations,
        );
        assert!(!out.contains("Millimeter"));
        assert!(out.contains("mm"));
        assert!(out.contains("Handb."));
    }

    #[test]
    fn test_abbreviations_longest_phrase_first() {
        let out = engine().apply(
            "persönliche Schutzausrüstung tragen",
            Strategy::ApplyAbbreviations,
        );
        assert_eq!(out, "PSA tragen");
    }

    #[test]
    fn test_simplify_compound_conjunction() {
        let out = engine().apply(
            "sowohl Schrauben als auch Muttern prüfen",
            Strategy::SimplifyLanguage,
        );
        assert_eq!(out, "Schrauben und Muttern prüfen");
    }

    #[test]
    fn test_optional_word_removal_is_punctuation_aware() {
        let out = engine().apply(
            "Danach, die Schraube auch festziehen",
            Strategy::RemoveOptionalWords,
        );
        assert_eq!(out, "die Schraube festziehen");
    }

    #[test]
    fn test_compact_numbers() {
        let e = engine();
        assert_eq!(
            e.apply("von 5 bis 10 Umdrehungen", Strategy::CompactNumbers),
            "5-10 Umdrehungen"
        );
        assert_eq!(e.apply("30 Prozent", Strategy::CompactNumbers), "30%");
        assert_eq!(e.apply("3,5 kg", Strategy::CompactNumbers), "3.5kg");
        assert_eq!(e.apply("10 x 20", Strategy::CompactNumbers), "10x20");
    }

    #[test]
    fn test_symbols_for_decision_words() {
        let out = engine().apply("Ja weiter zu Schritt 2, Nein", Strategy::SubstituteSymbols);
        assert!(out.contains('✓'));
        assert!(out.contains('→'));
        assert!(out.contains('✗'));
    }

    #[test]
    fn test_ultra_compact_elides_articles() {
        let out = engine().apply("die Schraube und der Bolzen", Strategy::UltraCompact);
        assert_eq!(out, "Schraube + Bolzen");
    }

    #[test]
    fn test_strategy_idempotence_on_clean_text() {
        // Text free of every trigger pattern passes through unchanged.
        let clean = "Schraube festziehen";
        let e = engine();
        for strategy in Strategy::CORE_ORDER {
            let once = e.apply(clean, strategy);
            assert_eq!(once, clean, "{strategy} altered clean text");
            assert_eq!(e.apply(&once, strategy), once);
        }
    }

    #[test]
    fn test_resolve_no_overflow_is_noop() {
        let mut pred = prediction("kurzer Text", 100);
        pred.overflow_risk = 0.4;
        let res = engine().resolve(&pred, 3);
        assert!(res.success);
        assert!(res.methods_applied.is_empty());
        assert_eq!(res.resolved_text, pred.original_text);
        assert_eq!(res.space_saved, 0);
    }

    #[test]
    fn test_resolve_applies_strategy_ladder() {
        let text = "Bitte beachten Sie die Anweisungen und verwenden Sie die \
                    persönliche Schutzausrüstung mit 5 Millimeter Abstand";
        let target = 60;
        let res = engine().resolve(&prediction(text, target), 3);
        assert!(char_len(&res.resolved_text) < char_len(text));
        assert!(!res.methods_applied.is_empty());
        assert!(res.space_saved > 0);
        assert!(!res.resolved_text.to_lowercase().contains("bitte beachten sie"));
        assert!(!res.resolved_text.contains("Millimeter"));
        assert!(res.resolved_text.contains("mm"));
        assert!(res.notes.starts_with("Final length"));
    }

    #[test]
    fn test_resolve_failure_reports_shortfall() {
        // No trigger patterns at all, so nothing can be saved.
        let text = "Wartungsintervall Komponenten Befestigungselement Tragkonstruktion";
        let res = engine().resolve(&prediction(text, 10), 3);
        assert!(!res.success);
        assert_eq!(res.resolved_text, text);
        assert_eq!(res.space_saved, 0);
        assert!(res.notes.contains("No compression applied"));
    }

    #[test]
    fn test_neutral_rules_leave_text_alone() {
        let e = TextCompressionEngine::for_language(TargetLanguage::French);
        let text = "aucune règle spécifique pour cette langue";
        for strategy in Strategy::CORE_ORDER {
            assert_eq!(e.apply(text, strategy), text);
        }
    }

    #[test]
    fn test_truncate_prefers_sentence_boundary() {
        let text = "Erster Satz. Zweiter Satz ist deutlich länger als der erste.";
        let out = intelligent_truncate(text, 20);
        assert_eq!(out, "Erster Satz.");
    }

    #[test]
    fn test_truncate_word_boundary_with_ellipsis() {
        let text = "ein langer Text ohne jede Satzgrenze der gekuerzt werden muss";
        let out = intelligent_truncate(text, 30);
        assert!(char_len(&out) <= 30);
        assert!(out.ends_with("..."));
        let prefix = out.trim_end_matches("...");
        assert!(text.starts_with(prefix));
    }

    #[test]
    fn test_truncate_hard_cut() {
        let text = "Unzerbrechlichwortungetuemohnejedeleerstelle";
        let out = intelligent_truncate(text, 10);
        assert_eq!(char_len(&out), 10);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_truncate_length_guarantee() {
        let text = "x".repeat(130);
        for target in 4..60 {
            let out = intelligent_truncate(&text, target);
            assert!(char_len(&out) <= target, "violated at target {target}");
        }
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(intelligent_truncate("kurz", 50), "kurz");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let text = "Überprüfung der Tragfähigkeit über längere Zeiträume hinweg";
        let out = intelligent_truncate(text, 25);
        assert!(char_len(&out) <= 25);
    }
}
