//! Target-language normalization and per-language expansion factors.
//!
//! The surrounding pipeline historically selected behavior with string
//! comparisons on language names in several spellings. Here every call site
//! goes through [`TargetLanguage`] once, and language-dependent data lives in
//! lookup tables keyed by the normalized value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A translation target language, normalized from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    German,
    English,
    French,
    Spanish,
    Portuguese,
    Italian,
}

#[derive(Debug, Error)]
#[error("Unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl TargetLanguage {
    /// ISO 639-1 code used in prompts, reports, and the translation memory.
    pub fn code(&self) -> &'static str {
        match self {
            TargetLanguage::German => "de",
            TargetLanguage::English => "en",
            TargetLanguage::French => "fr",
            TargetLanguage::Spanish => "es",
            TargetLanguage::Portuguese => "pt",
            TargetLanguage::Italian => "it",
        }
    }

    /// English name, used when building translation prompts.
    pub fn name(&self) -> &'static str {
        match self {
            TargetLanguage::German => "German",
            TargetLanguage::English => "English",
            TargetLanguage::French => "French",
            TargetLanguage::Spanish => "Spanish",
            TargetLanguage::Portuguese => "Portuguese",
            TargetLanguage::Italian => "Italian",
        }
    }
}

impl FromStr for TargetLanguage {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "de" | "german" | "deutsch" | "tedesco" => Ok(TargetLanguage::German),
            "en" | "english" | "inglese" => Ok(TargetLanguage::English),
            "fr" | "french" | "français" | "francese" => Ok(TargetLanguage::French),
            "es" | "spanish" | "español" | "spagnolo" => Ok(TargetLanguage::Spanish),
            "pt" | "portuguese" | "portoghese" => Ok(TargetLanguage::Portuguese),
            "it" | "italian" | "italiano" => Ok(TargetLanguage::Italian),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Empirical multipliers for how much longer translated text tends to be,
/// relative to the Italian source.
///
/// Unknown languages fall back to a conservative default of 1.20.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionFactors {
    factors: BTreeMap<TargetLanguage, f64>,
    default: f64,
}

impl Default for ExpansionFactors {
    fn default() -> Self {
        let mut factors = BTreeMap::new();
        factors.insert(TargetLanguage::German, 1.30);
        factors.insert(TargetLanguage::English, 1.10);
        factors.insert(TargetLanguage::French, 1.15);
        factors.insert(TargetLanguage::Spanish, 1.05);
        factors.insert(TargetLanguage::Portuguese, 1.10);
        ExpansionFactors {
            factors,
            default: 1.20,
        }
    }
}

impl ExpansionFactors {
    pub fn factor(&self, language: TargetLanguage) -> f64 {
        self.factors.get(&language).copied().unwrap_or(self.default)
    }

    /// Override a single factor, e.g. from a user configuration file.
    pub fn set(&mut self, language: TargetLanguage, factor: f64) {
        self.factors.insert(language, factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_and_names() {
        assert_eq!("de".parse::<TargetLanguage>().unwrap(), TargetLanguage::German);
        assert_eq!("DE".parse::<TargetLanguage>().unwrap(), TargetLanguage::German);
        assert_eq!("German".parse::<TargetLanguage>().unwrap(), TargetLanguage::German);
        assert_eq!("tedesco".parse::<TargetLanguage>().unwrap(), TargetLanguage::German);
        assert_eq!("fr".parse::<TargetLanguage>().unwrap(), TargetLanguage::French);
        assert!("klingon".parse::<TargetLanguage>().is_err());
    }

    #[test]
    fn test_builtin_factors() {
        let factors = ExpansionFactors::default();
        assert_eq!(factors.factor(TargetLanguage::German), 1.30);
        assert_eq!(factors.factor(TargetLanguage::Spanish), 1.05);
        // Italian is the source language; no table entry, so it takes the default.
        assert_eq!(factors.factor(TargetLanguage::Italian), 1.20);
    }

    #[test]
    fn test_override() {
        let mut factors = ExpansionFactors::default();
        factors.set(TargetLanguage::German, 1.45);
        assert_eq!(factors.factor(TargetLanguage::German), 1.45);
    }

    #[test]
    fn test_code_display() {
        assert_eq!(TargetLanguage::German.to_string(), "de");
        assert_eq!(TargetLanguage::Portuguese.name(), "Portuguese");
    }
}
