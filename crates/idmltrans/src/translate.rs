use crate::prelude::{println, *};
use std::collections::BTreeMap;
use std::path::PathBuf;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use idml::IdmlPackage;
use idmltrans_core::compress::{
    OverflowResolution, Strategy, TextCompressionEngine, intelligent_truncate,
};
use idmltrans_core::diagram::{DiagramFrameDetector, DiagramFrameInfo};
use idmltrans_core::glossary::Glossary;
use idmltrans_core::language::TargetLanguage;
use idmltrans_core::predict::{OverflowPrediction, OverflowPredictor};
use idmltrans_core::report::OverflowReportBuilder;
use idmltrans_core::risk::overflow_risk;

use crate::openai::{Translator, DEFAULT_MODEL};
use crate::report::RunReport;
use crate::tm::TranslationMemory;

/// Bounded compression passes per text.
const MAX_COMPRESSION_ITERATIONS: usize = 3;

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// IDML file to translate
    input: PathBuf,

    /// Destination for the translated IDML file
    output: PathBuf,

    /// Target language (de, en, fr, es, pt)
    #[arg(short, long)]
    language: String,

    /// Compress translations that are predicted to overflow their frames
    #[arg(long)]
    overflow_prevention: bool,

    /// Maximum text reduction in percent when compressing
    #[arg(long, default_value = "25")]
    max_compression: u8,

    /// Apply the aggressive diagram compression ladder to every frame
    #[arg(long)]
    diagram_mode: bool,

    /// Disable automatic diagram frame detection
    #[arg(long)]
    no_diagram_detection: bool,

    /// OpenAI model to use
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Optional TOML file with additional protected terms
    #[arg(long)]
    glossary: Option<PathBuf>,

    /// Write the overflow/compression/diagram report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Analyze and plan, but do not call the API or write any output
    #[arg(long)]
    dry_run: bool,
}

pub async fn run(options: Options, global: crate::Global) -> Result<()> {
    let language: TargetLanguage = options.language.parse()?;
    let glossary = match &options.glossary {
        Some(path) => Glossary::from_file(path)?,
        None => Glossary::default(),
    };

    let mut package = IdmlPackage::open(&options.input)
        .wrap_err_with(|| f!("Failed to open {}", options.input.display()))?;

    let segments = package.translatable_segments(&glossary)?;
    let frames = package.frame_metrics()?;
    let frame_texts = package.frame_texts()?;

    if global.verbose {
        println!(
            "{} translatable segments, {} text frames, target {}",
            segments.len(),
            frames.len(),
            language.name()
        );
    }

    let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
    let predictor = OverflowPredictor::default();
    let predictions = predictor.predict(&texts, language, &frames);

    let detections = if options.no_diagram_detection {
        BTreeMap::new()
    } else {
        DiagramFrameDetector::default().detect(&frames, &frame_texts)
    };

    let builder = OverflowReportBuilder::new(predictor.thresholds());
    let overflow_report =
        builder.overflow(&predictions, language, predictor.expansion_factor(language));

    if options.dry_run {
        crate::report::print_overflow_summary(&overflow_report);
        if let Some(path) = &options.report {
            RunReport {
                overflow: overflow_report,
                compression: None,
                diagrams: Some(builder.diagrams(&detections)),
            }
            .save(path)?;
        }
        println!();
        println!("{}", "Dry run: no translation performed".yellow());
        return Ok(());
    }

    // Translation, translation-memory first.
    let tm = TranslationMemory::open_default()?;
    let mut translations: Vec<Option<String>> = Vec::with_capacity(texts.len());
    let mut misses = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        match tm.lookup(text, language, None)? {
            Some(hit) => translations.push(Some(hit)),
            None => {
                translations.push(None);
                misses.push(i);
            }
        }
    }
    let tm_hits = texts.len() - misses.len();

    if !misses.is_empty() {
        let translator = Translator::from_env(options.model.clone())?;
        let miss_texts: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();

        let progress = ProgressBar::new(miss_texts.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .expect("valid progress template"),
        );
        progress.set_message("Translating");

        let translated = translator
            .translate_texts(&miss_texts, language, &glossary, |done| {
                progress.inc(done as u64);
            })
            .await?;
        progress.finish_with_message("Translated");

        for (&i, translation) in misses.iter().zip(&translated) {
            tm.store(&texts[i], translation, language, None, &options.model)?;
            translations[i] = Some(translation.clone());
        }
    }
    // Every slot is filled at this point; keep the source text if one is not.
    let mut translations: Vec<String> = translations
        .into_iter()
        .zip(&texts)
        .map(|(t, original)| t.unwrap_or_else(|| original.clone()))
        .collect();

    // Overflow resolution on the translated texts.
    let engine = TextCompressionEngine::for_language(language);
    let mut resolutions = Vec::new();
    if options.overflow_prevention || options.diagram_mode {
        for (i, prediction) in predictions.iter().enumerate() {
            let diagram = detections.get(&prediction.frame_id);
            let resolution = resolve_translation(
                &engine,
                &translations[i],
                prediction,
                diagram,
                options.diagram_mode,
                options.max_compression,
            );
            // No-op resolutions (above the safety margin but within
            // capacity) would only pad the report.
            if let Some(resolution) = resolution {
                if !resolution.methods_applied.is_empty() || !resolution.success {
                    translations[i] = resolution.resolved_text.clone();
                    resolutions.push(resolution);
                }
            }
        }
    }

    package.apply_translations(&segments, &translations)?;
    package.save(&options.output)?;

    println!(
        "{}",
        f!("Translated {} segments into {}", texts.len(), options.output.display()).green()
    );
    let mut table = new_table();
    table.add_row(prettytable::row!["From translation memory", tm_hits]);
    table.add_row(prettytable::row!["From API", texts.len() - tm_hits]);
    if options.overflow_prevention || options.diagram_mode {
        table.add_row(prettytable::row!["Compressed for overflow", resolutions.len()]);
    }
    if !options.no_diagram_detection {
        table.add_row(prettytable::row!["Diagram frames detected", detections.len()]);
    }
    table.printstd();

    let compression_report = builder.compression(&resolutions);
    crate::report::print_compression_summary(&compression_report);

    if let Some(path) = &options.report {
        RunReport {
            overflow: overflow_report,
            compression: Some(compression_report),
            diagrams: Some(builder.diagrams(&detections)),
        }
        .save(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Compresses one translated text if it exceeds its frame budget.
///
/// Returns `None` when the translation already fits. `max_compression`
/// bounds the target: the engine aims no lower than
/// `(100 - max_compression)%` of the translated length, and truncation
/// never cuts past that target, even when the frame would want more.
fn resolve_translation(
    engine: &TextCompressionEngine,
    translated: &str,
    prediction: &OverflowPrediction,
    diagram: Option<&DiagramFrameInfo>,
    diagram_mode: bool,
    max_compression: u8,
) -> Option<OverflowResolution> {
    let length = char_len(translated);
    let budget = prediction.recommended_max_length;
    if length <= budget {
        return None;
    }

    let floor = length * (100 - max_compression.min(100) as usize) / 100;
    let target = budget.max(floor);

    // The prediction was made against the source text; rebuild it around the
    // actual translation so the engine sees real lengths.
    let post = OverflowPrediction {
        original_text: translated.to_string(),
        estimated_translated_length: length,
        available_space_chars: prediction.available_space_chars,
        overflow_risk: overflow_risk(length, prediction.available_space_chars),
        recommended_max_length: target,
        frame_id: prediction.frame_id.clone(),
        suggestions: Vec::new(),
    };

    let strategies: &[Strategy] = if diagram_mode || diagram.is_some() {
        &Strategy::DIAGRAM_ORDER
    } else {
        &Strategy::CORE_ORDER
    };
    let mut resolution = engine.resolve_with(&post, MAX_COMPRESSION_ITERATIONS, strategies);

    // Last resort within the allowed reduction: truncate at a boundary.
    if !resolution.success && char_len(&resolution.resolved_text) > target {
        let truncated = intelligent_truncate(&resolution.resolved_text, target);
        if char_len(&truncated) < char_len(&resolution.resolved_text) {
            resolution.space_saved += char_len(&resolution.resolved_text) - char_len(&truncated);
            resolution.resolved_text = truncated;
            if !resolution.methods_applied.contains(&Strategy::Truncate) {
                resolution.methods_applied.push(Strategy::Truncate);
            }
            resolution.success = char_len(&resolution.resolved_text) <= target;
            resolution.notes = f!(
                "Truncated to {} characters after compression",
                char_len(&resolution.resolved_text)
            );
        }
    }

    Some(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(available: usize, budget: usize) -> OverflowPrediction {
        OverflowPrediction {
            original_text: "testo".to_string(),
            estimated_translated_length: 0,
            available_space_chars: available,
            overflow_risk: 0.0,
            recommended_max_length: budget,
            frame_id: "u1".to_string(),
            suggestions: Vec::new(),
        }
    }

    #[test]
    fn test_fitting_translation_is_untouched() {
        let engine = TextCompressionEngine::for_language(TargetLanguage::German);
        let result = resolve_translation(
            &engine,
            "kurzer Text",
            &prediction(100, 90),
            None,
            false,
            25,
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_overflowing_translation_is_compressed() {
        let engine = TextCompressionEngine::for_language(TargetLanguage::German);
        let text = "Bitte beachten Sie die Anweisungen in diesem Handbuch sehr sorgfältig und \
                    grundsätzlich bei jeder einzelnen Montage";
        let result = resolve_translation(&engine, text, &prediction(80, 72), None, false, 25)
            .expect("overflow requires action");
        assert!(char_len(&result.resolved_text) < char_len(text));
        assert!(!result.methods_applied.is_empty());
    }

    #[test]
    fn test_max_compression_caps_truncation() {
        let engine = TextCompressionEngine::for_language(TargetLanguage::German);
        // No rule table matches this text, so truncation governs the outcome.
        let text = "Tragkonstruktion Befestigungselement Randabschlussprofil \
                    Unterkonstruktion Dichtungsbahn Stahlprofil Auflagerplatte \
                    Querverstrebung Eckverbinder Klemmhalterung";
        // Frame budget wants far more reduction than the 10% cap allows.
        let result = resolve_translation(&engine, text, &prediction(20, 18), None, false, 10)
            .expect("overflow requires action");
        let floor = char_len(text) * 90 / 100;
        assert!(result.methods_applied.contains(&Strategy::Truncate));
        assert!(char_len(&result.resolved_text) <= floor);
        // The long budget, not the tiny frame, set the truncation point.
        assert!(char_len(&result.resolved_text) > 20);
    }
}
