//! Core library for idmltrans
//!
//! This crate implements the **Functional Core** of the idmltrans application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The idmltrans project uses a multi-crate architecture to enforce separation
//! of concerns:
//!
//! - **`idmltrans_core`** (this crate): Pure transformation functions with zero I/O
//! - **`idml`**: IDML container access (zip + XML parsing)
//! - **`idmltrans`**: I/O operations and orchestration (the Imperative Shell)
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Testable**: Can be tested with simple fixture data, no mocking required
//!
//! Every configuration surface (expansion factors, compression rule tables,
//! diagram keyword lists, glossary terms) is an explicit value passed into a
//! constructor. There are no module-level defaults that can be mutated.
//!
//! # Module Organization
//!
//! - [`language`]: Normalized target-language codes and expansion factors
//! - [`geometry`]: Text-frame metrics and character-capacity estimation
//! - [`risk`]: Overflow-risk classification thresholds and buckets
//! - [`predict`]: Batch overflow prediction over (text, frame) pairs
//! - [`compress`]: The layered text-compression engine and truncation
//! - [`diagram`]: Heuristic diagram/flowchart frame detection
//! - [`report`]: Aggregate reports over predictions, resolutions, detections
//! - [`glossary`]: Protected terms that must survive translation untouched

pub mod compress;
pub mod diagram;
pub mod geometry;
pub mod glossary;
pub mod language;
pub mod predict;
pub mod report;
pub mod risk;

/// Length of a string in characters, not bytes.
///
/// Every budget in this crate (frame capacity, recommended max length,
/// truncation targets) is counted in characters so that multi-byte
/// glyphs in translated text do not skew the arithmetic.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}
