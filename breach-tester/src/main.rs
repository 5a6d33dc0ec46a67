mod logic;
mod storage;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use breach_game::{BreachEngine, DEFAULT_NODE_BUDGET, Generator, GeneratorConfig};
use logic::{
    CampaignStep, CheckResult, LevelCheck, LogicTester, PlayabilityAggregate, PlayabilityRecord,
    TesterReport, aggregate_playability, catalog_checks, find_check, resolve_seed_inputs,
    run_campaign, run_playability_analysis, validate_playability_targets,
};
use storage::JsonFileStorage;
use util::{parse_levels, report_timestamp, split_csv};

#[derive(Debug, Parser)]
#[command(name = "breach-tester", version)]
#[command(about = "Automated QA for Breach level generation and session rules")]
struct Args {
    /// Checks to run (comma-separated, or `all`)
    #[arg(long, default_value = "all")]
    checks: String,

    /// List all available checks and exit
    #[arg(long)]
    list_checks: bool,

    /// Levels to generate, e.g. `1-20` or `1,5,40-45`
    #[arg(long, default_value = "1-20")]
    levels: String,

    /// Seeds to run (comma-separated, `all` for the built-in word list)
    #[arg(long, default_value = "Testseed")]
    seeds: String,

    /// Seed variants per seed (`seed`, `seed#1`, ...)
    #[arg(long, default_value_t = 1)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file overriding the generator's difficulty tuning
    #[arg(long)]
    generator_config: Option<PathBuf>,

    /// Solver node budget per level
    #[arg(long, default_value_t = DEFAULT_NODE_BUDGET)]
    node_budget: usize,

    /// Skip the solver-based playability sweep
    #[arg(long)]
    skip_playability: bool,

    /// Play a headless campaign, saving progress in this directory
    #[arg(long)]
    campaign_dir: Option<PathBuf>,

    /// Levels to attempt in campaign mode
    #[arg(long, default_value_t = 5)]
    campaign_rounds: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_checks(&args)? {
        return Ok(());
    }

    if args.output.is_some() || args.report == "console" {
        announce_banner();
    }

    let start_time = Instant::now();
    let generator = load_generator(args.generator_config.as_deref())?;
    let levels = parse_levels(&args.levels)?;
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;
    if seed_infos.iter().any(|info| info.from_word_list) {
        log::debug!("seed word list expanded to {} seeds", seed_infos.len());
    }
    let seeds: Vec<String> = seed_infos
        .iter()
        .flat_map(|info| info.iteration_seeds(args.iterations))
        .collect();
    log::info!(
        "running {} levels x {} seeds with node budget {}",
        levels.len(),
        seeds.len(),
        args.node_budget
    );

    let checks = expand_checks(&args.checks);
    let results = run_checks(&args, &generator, &checks, &levels, &seeds);

    let records = if args.skip_playability {
        Vec::new()
    } else {
        run_playability_analysis(&generator, &levels, &seeds, args.node_budget)?
    };
    let aggregates = aggregate_playability(&records);

    let campaign = match &args.campaign_dir {
        Some(dir) => Some(play_campaign(&args, &generator, dir, &seeds)?),
        None => None,
    };

    write_reports(
        &args,
        &results,
        &records,
        &aggregates,
        campaign.as_deref(),
        start_time,
    )?;

    validate_playability_targets(&generator, &records)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_checks(args: &Args) -> Result<bool> {
    if !args.list_checks {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available checks:")?;
    for check in catalog_checks() {
        writeln!(
            output_target.writer(),
            "  {:25} - {}",
            check.key,
            check.description
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🔓 Breach Automated Tester".bright_cyan().bold());
    println!("{}", "==========================".cyan());
}

fn load_generator(path: Option<&Path>) -> Result<Generator> {
    let Some(path) = path else {
        return Ok(Generator::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = GeneratorConfig::from_json(&json)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Generator::new(config).with_context(|| format!("invalid generator config {}", path.display()))
}

fn expand_checks(checks_arg: &str) -> Vec<LevelCheck> {
    let mut checks = Vec::new();
    for name in split_csv(checks_arg) {
        if name == "all" {
            checks.extend(catalog_checks());
        } else if let Some(check) = find_check(&name) {
            checks.push(check);
        } else {
            eprintln!("⚠️  Unknown check: {}", name.yellow());
        }
    }
    let mut seen = std::collections::HashSet::new();
    checks.retain(|check| seen.insert(check.key));
    checks
}

fn run_checks(
    args: &Args,
    generator: &Generator,
    checks: &[LevelCheck],
    levels: &[u32],
    seeds: &[String],
) -> Vec<CheckResult> {
    if args.report == "console" {
        println!("{}", "🧠 Running Level Checks".bright_yellow().bold());
        println!("{}", "-".repeat(30).yellow());
    }
    let tester = LogicTester::new(generator.clone(), args.verbose);
    checks
        .iter()
        .flat_map(|check| tester.run_check(check, levels, seeds))
        .collect()
}

fn play_campaign(
    args: &Args,
    generator: &Generator,
    dir: &Path,
    seeds: &[String],
) -> Result<Vec<CampaignStep>> {
    let storage = JsonFileStorage::new(dir);
    let engine = BreachEngine::with_generator(generator.clone(), storage);
    let seed = seeds.first().map_or("Testseed", String::as_str);
    run_campaign(&engine, seed, args.campaign_rounds, args.node_budget)
        .with_context(|| format!("campaign in {} failed", dir.display()))
}

fn write_reports(
    args: &Args,
    results: &[CheckResult],
    records: &[PlayabilityRecord],
    aggregates: &[PlayabilityAggregate],
    campaign: Option<&[CampaignStep]>,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let report = TesterReport {
        generated_at: report_timestamp(),
        checks: results,
        playability: aggregates,
        campaign,
    };

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, &report)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, &report)?,
        "csv" => logic::reports::generate_csv_report(&mut output_target, records)?,
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No level checks executed.")?;
            }
            logic::reports::generate_console_report(&mut output_target, &report, duration)?;
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
