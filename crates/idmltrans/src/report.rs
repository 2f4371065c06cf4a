use crate::prelude::{println, *};
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use idmltrans_core::report::{
    CompressionReport, DiagramReport, OverflowAnalysis, OverflowReport,
};

/// Everything one run learned, bundled for `--report`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub overflow: OverflowReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagrams: Option<DiagramReport>,
}

impl RunReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| eyre!("Failed to write report to {}: {e}", path.display()))?;
        Ok(())
    }
}

pub fn print_overflow_summary(report: &OverflowReport) {
    let analysis: &OverflowAnalysis = match report {
        OverflowReport::Empty { error } => {
            println!("{}", error.yellow());
            return;
        }
        OverflowReport::Full(analysis) => analysis,
    };

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Texts to translate",
        analysis.summary.total_texts
    ]);
    table.add_row(prettytable::row![
        "Expansion factor",
        f!("{:.2}", analysis.summary.expansion_factor)
    ]);
    table.add_row(prettytable::row![
        "Average overflow risk",
        f!("{:.3}", analysis.summary.average_overflow_risk)
    ]);
    table.add_row(prettytable::row![
        "Estimated expansion",
        f!("{:+.1}%", analysis.summary.estimated_expansion)
    ]);
    table.printstd();

    println!();
    let d = &analysis.risk_distribution;
    let p = &analysis.risk_percentages;
    let mut table = new_table();
    table.add_row(prettytable::row![
        "low".green(),
        d.low,
        f!("{:.1}%", p.low)
    ]);
    table.add_row(prettytable::row![
        "medium".yellow(),
        d.medium,
        f!("{:.1}%", p.medium)
    ]);
    table.add_row(prettytable::row![
        "high".red(),
        d.high,
        f!("{:.1}%", p.high)
    ]);
    table.add_row(prettytable::row![
        "critical".red().bold(),
        d.critical,
        f!("{:.1}%", p.critical)
    ]);
    table.printstd();

    if !analysis.high_risk_texts.is_empty() {
        println!();
        println!("{}", "Texts most at risk:".bold());
        let mut table = new_table();
        for entry in &analysis.high_risk_texts {
            table.add_row(prettytable::row![
                f!("{:.2}", entry.overflow_risk),
                f!("{}/{}", entry.estimated_length, entry.available_space),
                entry.text_preview
            ]);
        }
        table.printstd();
    }

    if !analysis.recommendations.is_empty() {
        println!();
        for recommendation in &analysis.recommendations {
            println!("- {recommendation}");
        }
    }
}

pub fn print_diagram_summary(report: &DiagramReport) {
    let analysis = match report {
        DiagramReport::Empty { error } => {
            println!("{}", error.dimmed());
            return;
        }
        DiagramReport::Full(analysis) => analysis,
    };

    println!(
        "{}",
        f!(
            "Detected {} diagram frame(s), average score {:.2}",
            analysis.summary.total_diagrams,
            analysis.summary.average_diagram_score
        )
        .bold()
    );

    let mut table = new_table();
    for (priority, count) in &analysis.summary.priority_distribution {
        table.add_row(prettytable::row![priority, count]);
    }
    table.printstd();

    if !analysis.critical_frames.is_empty() {
        println!();
        println!("{}", "Critical diagram frames:".red().bold());
        let mut table = new_table();
        for frame in &analysis.critical_frames {
            table.add_row(prettytable::row![
                frame.frame_id,
                f!("score {:.2}", frame.diagram_score),
                f!("risk {:.2}", frame.overflow_risk),
                frame.risk_factors.join(", ")
            ]);
        }
        table.printstd();
    }

    for step in &analysis.next_steps {
        println!("- {step}");
    }
}

pub fn print_compression_summary(report: &CompressionReport) {
    let analysis = match report {
        CompressionReport::Empty { .. } => return,
        CompressionReport::Full(analysis) => analysis,
    };

    println!(
        "{}",
        f!(
            "Compressed {} of {} overflowing texts ({:.1}% success), {} characters saved",
            analysis.summary.successful_resolutions,
            analysis.summary.total_texts,
            analysis.summary.success_rate,
            analysis.summary.total_space_saved
        )
        .bold()
    );
    if analysis.failed_resolutions > 0 {
        println!(
            "{}",
            f!(
                "{} text(s) still exceed their frame after compression",
                analysis.failed_resolutions
            )
            .red()
        );
    }
}
