//! scanguard CLI - Run large Trino queries behind a cost gate
//!
//! Usage:
//!   scanguard run <file.sql> [--threshold <size>] [--format <format>] [--yes]
//!   scanguard estimate <file.sql> [--threshold <size>]
//!   scanguard render <file.sql> [--var NAME=VALUE] [--date YYYY-MM-DD]
//!
//! Examples:
//!   scanguard run queries/daily_fault.sql
//!   scanguard run queries/daily_fault.sql --threshold 5GiB --format json > out.json
//!   scanguard estimate queries/daily_fault.sql --date 2026-01-25

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use scanguard::config::{parse_size, Settings};
use scanguard::engine::TrinoEngine;
use scanguard::gate::{confirmation_question, ConsoleOperator, Decision, GatePolicy};
use scanguard::output::{format_size, result_json, result_preview};
use scanguard::runner::{exit_status, QueryRunner, RunOutcome};
use scanguard::template::{parse_var, render, TemplateContext, TemplateError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanguard")]
#[command(about = "scanguard - Run large Trino queries behind a pre-flight cost gate")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the estimated size of a query, then run it
    Run {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        gate: GateArgs,

        /// Output format for the result
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,

        /// Number of rows to show in the table preview
        #[arg(long)]
        preview_rows: Option<usize>,

        /// Answer "yes" to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the estimated size of a query without running it
    Estimate {
        #[command(flatten)]
        query: QueryArgs,

        #[command(flatten)]
        gate: GateArgs,
    },

    /// Print a query with its placeholders filled in
    Render {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Path to the .sql file
    file: PathBuf,

    /// Template variable, may be repeated
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Reference date for {YESTERDAY} placeholders (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct GateArgs {
    /// Size above which confirmation is required (e.g. 1GiB, 500MB)
    #[arg(short, long, value_name = "SIZE", value_parser = parse_size)]
    threshold: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Row count and a preview table
    Table,
    /// Every row as a JSON object
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run {
            query,
            gate,
            format,
            preview_rows,
            yes,
        } => cmd_run(&settings, query, gate, format, preview_rows, yes).await,
        Commands::Estimate { query, gate } => cmd_estimate(&settings, query, gate).await,
        Commands::Render { query } => cmd_render(query),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "scanguard=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings, scanguard::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

async fn cmd_run(
    settings: &Settings,
    query: QueryArgs,
    gate: GateArgs,
    format: OutputFormat,
    preview_rows: Option<usize>,
    yes: bool,
) -> ExitCode {
    let Some(sql) = load_query(&query) else {
        return ExitCode::FAILURE;
    };
    let Some(policy) = gate_policy(settings, &gate) else {
        return ExitCode::FAILURE;
    };
    let Some(engine) = connect(settings) else {
        return ExitCode::FAILURE;
    };

    // Keep stdout clean for JSON output.
    let prompt_output: Box<dyn Write> = match format {
        OutputFormat::Table => Box::new(io::stdout()),
        OutputFormat::Json => Box::new(io::stderr()),
    };
    let mut operator = ConsoleOperator::new(io::stdin().lock(), prompt_output).assume_yes(yes);

    let runner = QueryRunner::new(policy);
    let result = runner.run(&engine, &mut operator, &sql).await;

    match &result {
        Ok(RunOutcome::Completed(rows)) => match format {
            OutputFormat::Table => {
                let limit = preview_rows.unwrap_or(settings.output.preview_rows);
                println!("{}", result_preview(rows, limit));
            }
            OutputFormat::Json => match result_json(rows) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error encoding result: {}", e);
                    return ExitCode::FAILURE;
                }
            },
        },
        Ok(RunOutcome::Cancelled) => {
            eprintln!("Query cancelled by operator.");
        }
        Err(e) => {
            eprintln!("Error: {}", e);
        }
    }

    ExitCode::from(exit_status(&result))
}

async fn cmd_estimate(settings: &Settings, query: QueryArgs, gate: GateArgs) -> ExitCode {
    let Some(sql) = load_query(&query) else {
        return ExitCode::FAILURE;
    };
    let Some(policy) = gate_policy(settings, &gate) else {
        return ExitCode::FAILURE;
    };
    let Some(engine) = connect(settings) else {
        return ExitCode::FAILURE;
    };

    let mut operator = ConsoleOperator::stdio();
    let runner = QueryRunner::new(policy);
    let assessment = runner.dry_run(&engine, &mut operator, &sql).await;

    println!();
    match assessment.decision {
        Decision::Proceed => println!(
            "Decision: proceed (under the {} limit)",
            format_size(policy.threshold_bytes() as f64)
        ),
        Decision::ConfirmRequired { basis, amount } => {
            println!("Decision: confirmation required");
            println!(
                "  {}",
                confirmation_question(basis, amount, policy.threshold_bytes())
            );
        }
    }

    ExitCode::SUCCESS
}

fn cmd_render(query: QueryArgs) -> ExitCode {
    match load_query(&query) {
        Some(sql) => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}

/// Read and render the query file, reporting errors on stderr.
fn load_query(args: &QueryArgs) -> Option<String> {
    let source = match fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", args.file.display(), e);
            return None;
        }
    };

    match template_context(args).and_then(|ctx| render(&source, &ctx)) {
        Ok(sql) => Some(sql),
        Err(e) => {
            eprintln!("Template error in '{}': {}", args.file.display(), e);
            None
        }
    }
}

fn template_context(args: &QueryArgs) -> Result<TemplateContext, TemplateError> {
    let mut ctx = match args.date {
        Some(date) => TemplateContext::for_date(date)?,
        None => TemplateContext::today()?,
    };
    for (name, value) in &args.vars {
        ctx.set(name.clone(), value.clone())?;
    }
    Ok(ctx)
}

fn gate_policy(settings: &Settings, args: &GateArgs) -> Option<GatePolicy> {
    let threshold = match args.threshold {
        Some(bytes) => bytes,
        None => match settings.threshold_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return None;
            }
        },
    };
    Some(GatePolicy::new(threshold))
}

fn connect(settings: &Settings) -> Option<TrinoEngine> {
    let config = match settings.engine_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return None;
        }
    };

    match TrinoEngine::connect(&config) {
        Ok(engine) => Some(engine),
        Err(e) => {
            eprintln!("Error connecting to {}: {}", config.base_url(), e);
            None
        }
    }
}
