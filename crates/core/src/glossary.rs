//! Protected-term glossary.
//!
//! Product names, certifications, and unit symbols must survive translation
//! verbatim. The glossary answers "is this token protected" and produces the
//! instruction line injected into translation prompts. Product names match
//! case-insensitively; technical terms match exactly, since `en` the word
//! and `EN` the standard body are different things.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

const BUILTIN_PRODUCT_NAMES: &[&str] = &[
    // Walkway and structure product lines.
    "myriad",
    "infinity",
    "falz",
    "falz single",
    // Brands common in technical documentation.
    "würth",
    "hilti",
    "simpson",
    "fischer",
    "sika",
    "mapei",
    "weber",
    "knauf",
    // Standards bodies and marks.
    "eurocod",
    "eurocode",
    "din",
    "en",
    "iso",
    "ce",
    "eot",
    "eta",
    "dop",
];

const BUILTIN_TECHNICAL_TERMS: &[&str] = &[
    "EPDM", "TPO", "PVC", "PE", "PP", "PU", "XLPE", "NBR", "SBR", "PTFE", "CE", "EN", "DIN",
    "ISO", "UNI", "kN", "kN/m", "kg/m²", "mm", "cm", "m", "N/mm²", "MPa", "GPa", "Hz",
    // Warning keywords kept verbatim across languages.
    "EVITARE", "AVVERTENZE", "ATTENZIONE", "PERICOLO", "WARNING", "CAUTION", "DANGER", "AVOID",
];

#[derive(Debug, thiserror::Error)]
pub enum GlossaryError {
    #[error("failed to read glossary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse glossary file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Custom glossary file format.
///
/// ```toml
/// products = ["acme", "acme pro"]
/// technical = ["HDPE", "dB(A)"]
/// ```
#[derive(Debug, Default, Deserialize)]
struct GlossaryFile {
    #[serde(default)]
    products: Vec<String>,
    #[serde(default)]
    technical: Vec<String>,
}

/// Terms that the translator must leave unchanged.
#[derive(Debug, Clone)]
pub struct Glossary {
    product_names: BTreeSet<String>,
    technical_terms: BTreeSet<String>,
    reference_patterns: Vec<Regex>,
    word_pattern: Regex,
}

impl Default for Glossary {
    fn default() -> Self {
        let product_names = BUILTIN_PRODUCT_NAMES
            .iter()
            .map(|s| s.to_string())
            .collect();
        let technical_terms = BUILTIN_TECHNICAL_TERMS
            .iter()
            .map(|s| s.to_string())
            .collect();
        // Codes such as DIN-1234, 2024-1, M8, S355, C25.
        let reference_patterns = [
            r"^[A-Z]{2,5}-\d+",
            r"^\d{4}-\d{1,2}",
            r"^[A-Z]\d+[A-Z]?$",
            r"^[A-Z]{1,3}\d{2,4}$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect();

        Glossary {
            product_names,
            technical_terms,
            reference_patterns,
            word_pattern: Regex::new(r"\b\w+(?:[.-]\w+)*\b").unwrap(),
        }
    }
}

impl Glossary {
    /// Builtin glossary extended with terms from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, GlossaryError> {
        let mut glossary = Glossary::default();
        let raw = std::fs::read_to_string(path)?;
        let file: GlossaryFile = toml::from_str(&raw)?;
        for product in file.products {
            glossary.add_product_name(&product);
        }
        for term in file.technical {
            glossary.add_technical_term(&term);
        }
        Ok(glossary)
    }

    pub fn add_product_name(&mut self, name: &str) {
        self.product_names.insert(name.trim().to_lowercase());
    }

    pub fn add_technical_term(&mut self, term: &str) {
        self.technical_terms.insert(term.trim().to_string());
    }

    /// Whether `text` as a whole is protected.
    ///
    /// A multi-word text is protected when any of its words is a protected
    /// product name, so product variants ("Falz Single") are caught.
    pub fn is_protected_term(&self, text: &str) -> bool {
        let clean = text.trim();

        if self.product_names.contains(&clean.to_lowercase()) {
            return true;
        }
        if self.technical_terms.contains(clean) {
            return true;
        }
        if self
            .reference_patterns
            .iter()
            .any(|pattern| pattern.is_match(clean))
        {
            return true;
        }

        let words: Vec<String> = clean.to_lowercase().split_whitespace().map(String::from).collect();
        words.len() >= 2 && words.iter().any(|word| self.product_names.contains(word))
    }

    /// All protected terms occurring in `text`, in order of appearance,
    /// deduplicated.
    pub fn protected_terms_in(&self, text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut found = Vec::new();
        for m in self.word_pattern.find_iter(text) {
            let word = m.as_str();
            if self.is_protected_term(word) && seen.insert(word.to_string()) {
                found.push(word.to_string());
            }
        }
        found
    }

    /// Instruction line for the translation prompt, or `None` when the text
    /// contains no protected terms.
    pub fn protection_note(&self, text: &str) -> Option<String> {
        let terms = self.protected_terms_in(text);
        if terms.is_empty() {
            None
        } else {
            Some(format!(
                "IMPORTANT: Keep these terms unchanged: {}",
                terms.join(", ")
            ))
        }
    }
}
