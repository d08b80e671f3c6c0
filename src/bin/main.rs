//! kpi-report CLI - Compile report blocks to template source
//!
//! Usage:
//!   kpi-report compile <blocks.json>
//!   kpi-report check <blocks.json> --catalog <catalog.json>
//!   kpi-report formula <text>
//!   kpi-report eval --data <report.json> --kpi <id> [--entry <n>] <formula>
//!
//! Examples:
//!   kpi-report compile report_blocks.json
//!   kpi-report formula 'SUM_ITEMS_WHERE(rows, amount, grade, op_gte, 60)'
//!   kpi-report eval --data report.json --kpi 3 'a + SUM_ITEMS(rows, val)'

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use kpi_report::blocks::load_blocks;
use kpi_report::compile::compile_with;
use kpi_report::config::Settings;
use kpi_report::dataset::ReportData;
use kpi_report::evaluate::{evaluate_snippet, SnippetRequest};
use kpi_report::formula;
use kpi_report::metadata::Catalog;
use kpi_report::validation::validate;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "kpi-report")]
#[command(about = "Compile KPI report blocks to template source")]
#[command(version)]
struct Cli {
    /// Path to a settings file (overrides the default search)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a block list to template source
    Compile {
        /// Path to the blocks JSON file
        file: PathBuf,
    },

    /// Check a block list against a metadata catalog
    Check {
        /// Path to the blocks JSON file
        file: PathBuf,

        /// Path to the catalog JSON file
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Parse a formula and print its canonical form
    Formula {
        /// Formula text
        text: String,
    },

    /// Evaluate a formula against report data
    Eval {
        /// Path to the report data JSON file
        #[arg(long)]
        data: PathBuf,

        /// KPI the formula is evaluated for
        #[arg(long)]
        kpi: i64,

        /// Entry index
        #[arg(long, default_value_t = 0)]
        entry: u32,

        /// Formula text
        formula: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Compile { file } => cmd_compile(&file, &settings),
        Commands::Check { file, catalog } => cmd_check(&file, &catalog),
        Commands::Formula { text } => cmd_formula(&text),
        Commands::Eval {
            data,
            kpi,
            entry,
            formula,
        } => cmd_eval(&data, kpi, entry, formula, &settings),
    }
}

fn read_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            None
        }
    }
}

fn cmd_compile(file: &Path, settings: &Settings) -> ExitCode {
    let Some(source) = read_file(file) else {
        return ExitCode::FAILURE;
    };

    let blocks = match load_blocks(&source) {
        Ok(blocks) => blocks,
        Err(e) => {
            eprintln!("Error loading blocks: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let output = compile_with(&blocks, &settings.compile_options());
    for skipped in &output.skipped {
        eprintln!(
            "warning: skipped {} block {}: {}",
            skipped.type_name, skipped.id, skipped.reason
        );
    }
    println!("{}", output.source);
    ExitCode::SUCCESS
}

fn cmd_check(file: &Path, catalog: &Path) -> ExitCode {
    let (Some(source), Some(catalog_json)) = (read_file(file), read_file(catalog)) else {
        return ExitCode::FAILURE;
    };

    let blocks = match load_blocks(&source) {
        Ok(blocks) => blocks,
        Err(e) => {
            eprintln!("Error loading blocks: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let catalog = match Catalog::from_json(&catalog_json) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match validate(&blocks, &catalog) {
        Ok(()) => {
            println!("OK: {} blocks are valid", blocks.len());
            ExitCode::SUCCESS
        }
        Err(errors) => {
            eprintln!("Validation errors:");
            for error in &errors {
                eprintln!("  {}", error);
            }
            ExitCode::FAILURE
        }
    }
}

fn cmd_formula(text: &str) -> ExitCode {
    let result = formula::parse(text);

    if result.has_errors() {
        for diag in result.errors() {
            let span = diag.span.clone();
            let report = Report::build(ReportKind::Error, span.clone())
                .with_message(&diag.message)
                .with_label(
                    Label::new(span)
                        .with_message(&diag.message)
                        .with_color(Color::Red),
                )
                .finish();
            if let Err(e) = report.eprint(Source::from(text)) {
                eprintln!("error: {} ({})", diag.message, e);
            }
        }
        return ExitCode::FAILURE;
    }

    for diag in &result.diagnostics {
        let span = diag.span.clone();
        let report = Report::build(ReportKind::Warning, span.clone())
            .with_message(&diag.message)
            .with_label(
                Label::new(span)
                    .with_message(&diag.message)
                    .with_color(Color::Yellow),
            )
            .finish();
        if let Err(e) = report.eprint(Source::from(text)) {
            eprintln!("{} ({})", diag, e);
        }
    }

    match result.expr {
        Some(expr) => {
            println!("{}", expr);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("Failed to parse formula");
            ExitCode::FAILURE
        }
    }
}

fn cmd_eval(data: &Path, kpi: i64, entry: u32, expression: String, settings: &Settings) -> ExitCode {
    let Some(json) = read_file(data) else {
        return ExitCode::FAILURE;
    };
    let report = match ReportData::from_json(&json) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error loading report data: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let request = SnippetRequest::Formula {
        kpi_id: kpi,
        expression,
        entry_index: entry,
    };
    match evaluate_snippet(&report, &request, &settings.evaluation) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Evaluation error: {}", e);
            ExitCode::FAILURE
        }
    }
}
