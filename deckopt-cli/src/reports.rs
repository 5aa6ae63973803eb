use anyhow::Result;
use colored::Colorize;
use deckopt_core::{Impact, OptimizationReport, Preference};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a OptimizationReport,
    preference: Preference,
    picked: Option<&'a Impact>,
}

fn preference_label(preference: Preference) -> &'static str {
    match preference {
        Preference::Lowest => "lowest",
        Preference::Highest => "highest",
    }
}

pub fn generate_console_report(
    out: &mut dyn Write,
    report: &OptimizationReport,
    preference: Preference,
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Optimization Results".bright_cyan().bold())?;
    writeln!(out, "{}", "=======================".cyan())?;

    writeln!(out, "Mode: {:?} ({:?})", report.mode, report.direction)?;
    writeln!(
        out,
        "Average win rate before: {:.2}% ({}/{} results)",
        report.baseline_win_rate, report.baseline_present, report.baseline_requested
    )?;

    if let Some(picked) = report.pick(preference) {
        writeln!(
            out,
            "Picked ({} win rate): {} (win rate: {:.2}%)",
            preference_label(preference),
            picked.label().bold(),
            picked.win_rate
        )?;
        writeln!(out, "New deck hash: {}", picked.deck.as_str().green())?;
    } else {
        writeln!(out, "{}", "No candidates derived from the baseline.".yellow())?;
    }
    writeln!(out)?;

    for (rank, impact) in report.ranked(preference).iter().enumerate() {
        let line = format!(
            "{:>3}. {:<32} {:>7.2}%  ({}/{})",
            rank + 1,
            impact.label(),
            impact.win_rate,
            impact.present,
            impact.requested
        );
        if impact.present < impact.requested {
            writeln!(out, "{}", line.yellow())?;
        } else {
            writeln!(out, "{line}")?;
        }
    }

    if report.absent > 0 {
        writeln!(out)?;
        writeln!(
            out,
            "{}",
            format!("⚠️  {} simulations produced no result", report.absent).red()
        )?;
    }
    writeln!(out, "Total time: {total_duration:?}")?;
    Ok(())
}

pub fn generate_json_report(
    out: &mut dyn Write,
    report: &OptimizationReport,
    preference: Preference,
) -> Result<()> {
    let payload = JsonReport {
        report,
        preference,
        picked: report.pick(preference),
    };
    let json_output = serde_json::to_string_pretty(&payload)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(
    out: &mut dyn Write,
    report: &OptimizationReport,
    preference: Preference,
) -> Result<()> {
    writeln!(out, "# Deck Optimization Results\n")?;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Mode**: {:?} ({:?})", report.mode, report.direction)?;
    writeln!(out, "- **Baseline**: `{}`", report.baseline)?;
    writeln!(
        out,
        "- **Average win rate before**: {:.2}%",
        report.baseline_win_rate
    )?;
    if let Some(picked) = report.pick(preference) {
        writeln!(
            out,
            "- **Picked**: {} ({:.2}%)",
            picked.label(),
            picked.win_rate
        )?;
        writeln!(out, "- **New deck hash**: `{}`", picked.deck)?;
    }
    writeln!(out, "- **Missing results**: {}\n", report.absent)?;

    writeln!(out, "## Candidates\n")?;
    writeln!(out, "| Rank | Component | Win rate | Results |")?;
    writeln!(out, "|------|-----------|----------|---------|")?;
    for (rank, impact) in report.ranked(preference).iter().enumerate() {
        writeln!(
            out,
            "| {} | {} | {:.2}% | {}/{} |",
            rank + 1,
            impact.label(),
            impact.win_rate,
            impact.present,
            impact.requested
        )?;
    }
    Ok(())
}
