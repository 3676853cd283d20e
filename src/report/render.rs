//! Plain-text and JSON presentation of a finished report.

use std::io::Write;

use serde::Deserialize;

use super::Report;
use crate::error::Result;

/// Output format for the rendered report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render `report` in the requested format.
pub fn render(report: &Report, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Text => render_text(report, out),
        OutputFormat::Json => render_json(report, out),
    }
}

/// Human-readable console report.
pub fn render_text(report: &Report, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Generating a food report for {}", report.recipe)?;
    writeln!(out, "----------------------------------------------------------")?;

    writeln!(out, "For this recipe you need the following ingredients:")?;
    for (idx, ingredient) in report.ingredients.iter().enumerate() {
        writeln!(out, "{}. {}", idx + 1, ingredient.name)?;
    }
    writeln!(out)?;

    writeln!(out, "There are {} steps to complete this recipe:", report.steps.len())?;
    for (idx, step) in report.steps.iter().enumerate() {
        writeln!(out, "{}. {}", idx + 1, step.description)?;
    }
    writeln!(out)?;

    let nutrition = &report.nutrition;
    writeln!(
        out,
        "The recipe has the following nutrition values (in grams or milliliters if it is present in a liquid):"
    )?;
    for (label, value) in [
        ("Sugar", nutrition.sugar),
        ("Proteins", nutrition.proteins),
        ("Sodium", nutrition.sodium),
        ("Fat", nutrition.fat),
        ("Calories", nutrition.calories),
        ("Calcium", nutrition.calcium),
        ("Carbohydrates", nutrition.carbohydrates),
    ] {
        writeln!(out, "• {}: {}", label, value)?;
    }
    writeln!(out)?;

    for entry in &report.sourcing {
        writeln!(
            out,
            "The {} can be sourced from {} countries with the following scores (shipping to {}):",
            entry.ingredient.name,
            entry.options.len(),
            report.destination
        )?;
        writeln!(out, "For all scores, higher is better")?;
        for option in &entry.options {
            writeln!(out, "- From {}", option.country_name)?;
            writeln!(out, "• Average labour score: {}", option.avg_labour_score)?;
            writeln!(out, "• Average environment score: {}", option.avg_environment_score)?;
            writeln!(out, "• Average trajectory score: {}", option.avg_trajectory_score)?;
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Pretty-printed JSON document of the whole report.
pub fn render_json(report: &Report, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}
