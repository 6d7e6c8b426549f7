mod config;
mod document;
mod error;
mod index;
mod parser;
mod passthrough;
mod render;
mod run;
mod source;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::Rules;
use crate::source::{RawDocument, SourceKind};

#[derive(Parser)]
#[command(
    name = "postmortem_convert",
    about = "Convert incident postmortem exports into MyST markdown"
)]
struct Cli {
    /// Recognition tables to use instead of the built-in ones
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every report and rebuild the index table
    Convert {
        /// Directory of source reports (.pdf, .txt, .md)
        #[arg(short, long)]
        reports: Option<PathBuf>,
        /// Directory for rendered markdown and the index table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the pipeline on one file and print what was extracted as JSON
    Inspect { file: PathBuf },
    /// Validate the recognition tables and template
    Check,
    /// Print the built-in recognition tables
    DefaultConfig,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::DefaultConfig => {
            print!("{}", config::DEFAULT_CONFIG);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Check => {
            let settings = config::load(cli.config.as_deref())?;
            let rules = Rules::compile(&settings)?;
            println!(
                "OK: {} sections, {} heading variants, {} metadata labels, {} timestamp patterns",
                rules.sections.len(),
                rules.heading_count(),
                rules.label_count(),
                rules.timestamps.len(),
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Inspect { file } => {
            let settings = config::load(cli.config.as_deref())?;
            let rules = Rules::compile(&settings)?;
            inspect(&file, &rules)
        }
        Commands::Convert { reports, output } => {
            let settings = config::load(cli.config.as_deref())?;
            let rules = Rules::compile(&settings)?;
            let paths = run::RunPaths {
                reports_dir: reports.unwrap_or(settings.paths.reports_dir),
                output_dir: output.unwrap_or(settings.paths.output_dir),
                index_file: PathBuf::from(settings.paths.index_file),
            };
            let report = run::run(&rules, &paths)?;
            report.print();
            if report.skipped() > 0 {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// What `inspect` prints for one source.
#[derive(Serialize)]
#[serde(untagged)]
enum Inspected {
    Report(document::ReportDocument),
    Markdown {
        entry: index::IndexEntry,
        flags: Vec<document::Flag>,
    },
}

fn inspect(file: &std::path::Path, rules: &Rules) -> anyhow::Result<ExitCode> {
    let outcome = RawDocument::load(file).and_then(|raw| match raw.kind {
        SourceKind::Markdown => {
            let p = passthrough::convert(&raw, rules)?;
            Ok(Inspected::Markdown {
                entry: p.entry,
                flags: p.flags,
            })
        }
        SourceKind::Pdf | SourceKind::Text => {
            let extraction = parser::extract_document(&raw.lines, rules)?;
            Ok(Inspected::Report(document::assemble(&raw, extraction, rules)?))
        }
    });
    match outcome {
        Ok(inspected) => {
            println!("{}", serde_json::to_string_pretty(&inspected)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}: skipped at {}: {}", file.display(), err.stage(), err);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
