use crate::prelude::{println, *};
use std::path::PathBuf;

use idml::IdmlPackage;
use idmltrans_core::diagram::DiagramFrameDetector;
use idmltrans_core::glossary::Glossary;
use idmltrans_core::language::TargetLanguage;
use idmltrans_core::predict::OverflowPredictor;
use idmltrans_core::report::OverflowReportBuilder;

use crate::report::RunReport;

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// IDML file to analyze
    input: PathBuf,

    /// Target language (de, en, fr, es, pt)
    #[arg(short, long)]
    language: String,

    /// Optional TOML file with additional protected terms
    #[arg(long)]
    glossary: Option<PathBuf>,

    /// Output the full report as JSON instead of tables
    #[arg(long)]
    json: bool,
}

/// Offline overflow and diagram analysis. Reads the package, predicts, and
/// reports; never touches the network.
pub async fn run(options: Options, global: crate::Global) -> Result<()> {
    let language: TargetLanguage = options.language.parse()?;
    let glossary = match &options.glossary {
        Some(path) => Glossary::from_file(path)?,
        None => Glossary::default(),
    };

    let package = IdmlPackage::open(&options.input)
        .wrap_err_with(|| f!("Failed to open {}", options.input.display()))?;

    let segments = package.translatable_segments(&glossary)?;
    let frames = package.frame_metrics()?;
    let frame_texts = package.frame_texts()?;

    if global.verbose {
        println!(
            "{} translatable segments, {} text frames",
            segments.len(),
            frames.len()
        );
        println!();
    }

    let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
    let predictor = OverflowPredictor::default();
    let predictions = predictor.predict(&texts, language, &frames);

    let detector = DiagramFrameDetector::default();
    let detections = detector.detect(&frames, &frame_texts);

    let builder = OverflowReportBuilder::new(predictor.thresholds());
    let report = RunReport {
        overflow: builder.overflow(&predictions, language, predictor.expansion_factor(language)),
        compression: None,
        diagrams: Some(builder.diagrams(&detections)),
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    crate::report::print_overflow_summary(&report.overflow);
    println!();
    if let Some(diagrams) = &report.diagrams {
        crate::report::print_diagram_summary(diagrams);
    }

    Ok(())
}
