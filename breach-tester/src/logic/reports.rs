use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::{CampaignStep, CheckResult, PlayabilityAggregate, PlayabilityRecord};

/// Everything one tester run produced.
#[derive(Debug, Serialize)]
pub struct TesterReport<'a> {
    pub generated_at: String,
    pub checks: &'a [CheckResult],
    pub playability: &'a [PlayabilityAggregate],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<&'a [CampaignStep]>,
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(results: &[CheckResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    (passed as f64 / results.len() as f64) * 100.0
}

pub fn generate_console_report(
    out: &mut dyn Write,
    report: &TesterReport<'_>,
    total_duration: Duration,
) -> Result<()> {
    let results = report.checks;
    writeln!(out)?;
    writeln!(out, "{}", "📊 Level Check Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "======================".cyan())?;

    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total checks: {}", results.len())?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (results.len() - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.check_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Levels: {}/{} passed, average {:?}",
            result.successful_iterations, result.iterations_run, result.average_duration
        )?;
        for failure in &result.failures {
            writeln!(out, "     • {}", failure.red())?;
        }
    }

    if !report.playability.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "🧩 Playability".bright_yellow().bold())?;
        writeln!(out, "{}", "==============".yellow())?;
        writeln!(
            out,
            "{:>5}  {:>4}  {:>4}  {:>6}  {:>7}  {:>10}  {:>9}  {:>10}",
            "level", "size", "seqs", "buffer", "solved", "unsolvable", "exhausted", "picks"
        )?;
        for agg in report.playability {
            let solved = format!("{:>6.1}%", agg.solved_pct * 100.0);
            let solved = if agg.solved_pct >= 0.5 {
                solved.green()
            } else {
                solved.yellow()
            };
            writeln!(
                out,
                "{:>5}  {:>4}  {:>4}  {:>6}  {}  {:>9.1}%  {:>8.1}%  {:>5.1}±{:<4.1}",
                agg.level,
                agg.matrix_size,
                agg.sequences,
                agg.max_buffer_length,
                solved,
                agg.unsolvable_pct * 100.0,
                agg.exhausted_pct * 100.0,
                agg.mean_picks,
                agg.std_picks
            )?;
        }
    }

    if let Some(steps) = report.campaign {
        writeln!(out)?;
        writeln!(out, "{}", "🏆 Campaign".bright_green().bold())?;
        writeln!(out, "{}", "===========".green())?;
        for step in steps {
            writeln!(
                out,
                "Level {:>3}: {:<12} picks {:>2}  score {:>3}  -> level {}",
                step.level, step.outcome, step.picks, step.score, step.next_level
            )?;
        }
    }

    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, report: &TesterReport<'_>) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &TesterReport<'_>) -> Result<()> {
    let results = report.checks;
    writeln!(out, "# Breach Level Check Results\n")?;
    writeln!(out, "_Generated {}_\n", report.generated_at)?;

    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total checks**: {}", results.len())?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", results.len() - passed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(out, "### {status} {} (seed `{}`)\n", result.check_name, result.seed)?;
        writeln!(
            out,
            "- **Levels**: {}/{} passed",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;
        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }

    if !report.playability.is_empty() {
        writeln!(out, "## Playability\n")?;
        writeln!(out, "| Level | Size | Sequences | Buffer | Solved | Mean picks |")?;
        writeln!(out, "|------:|-----:|----------:|-------:|-------:|-----------:|")?;
        for agg in report.playability {
            writeln!(
                out,
                "| {} | {} | {} | {} | {:.1}% | {:.1} |",
                agg.level,
                agg.matrix_size,
                agg.sequences,
                agg.max_buffer_length,
                agg.solved_pct * 100.0,
                agg.mean_picks
            )?;
        }
    }
    Ok(())
}

pub fn generate_csv_report(out: &mut dyn Write, records: &[PlayabilityRecord]) -> Result<()> {
    writeln!(
        out,
        "level,seed,matrix_size,sequences,max_buffer_length,fingerprint,verdict,picks,replay_won,solve_micros"
    )?;
    for record in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            record.level,
            csv_field(&record.seed),
            record.matrix_size,
            record.sequences,
            record.max_buffer_length,
            record.fingerprint,
            record.verdict.label(),
            record.picks.map_or_else(String::new, |p| p.to_string()),
            record.replay_won,
            record.solve_micros
        )?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
