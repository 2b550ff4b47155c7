use clap::{Parser, ValueEnum};
use hdrcat::{AmalgamateConfig, Report, ReportEntry, Result, amalgamate, check, generate};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
Directives:
  #include "name"      - Inlined if include/<name> exists, otherwise kept as-is
  #include <name>      - Always kept as-is
  Only lines that are exactly #include "name" (no trailing text) are directives.
  Each name is handled once; later repeats anywhere in the output are dropped.

Examples:
  # Regenerate the single header from the current repository
  hdrcat
  # Use another repository layout
  hdrcat --include-root lib/include --source mylib/mylib.h -o dist/mylib.h
  # Verify the committed single header is up to date (CI)
  hdrcat --check
  # Print the amalgamation instead of writing it
  hdrcat --stdout
  # Show the expansion report
  hdrcat --list
  hdrcat --list=json


For more information, visit: https://github.com/hdrcat/hdrcat
"#;

/// Amalgamate a header-only library into a single include file.
///
/// Copyright 2026 hdrcat contributors.
/// Licensed under the EUPL v1.2.
#[derive(Parser, Debug)]
#[command(
    name = "hdrcat",
    version,
    author = "hdrcat contributors",
    about = "Amalgamate a header-only library into a single include file.",
    after_long_help = LONG_HELP,
    after_help = "For more information, visit: https://github.com/hdrcat/hdrcat"
)]
struct Cli {
    /// Repository root the default paths are relative to
    #[arg(long, value_name = "DIR", env = "HDRCAT_REPO_ROOT")]
    repo_root: Option<PathBuf>,

    /// Directory quoted include names are resolved against
    #[arg(short = 'I', long, value_name = "DIR", env = "HDRCAT_INCLUDE_ROOT")]
    include_root: Option<PathBuf>,

    /// Root header, relative to the include root
    #[arg(short, long, value_name = "NAME")]
    source: Option<String>,

    /// Output file
    #[arg(short, long, value_name = "FILE", env = "HDRCAT_OUTPUT")]
    output: Option<PathBuf>,

    /// Include guard token
    #[arg(short, long, value_name = "TOKEN", env = "HDRCAT_GUARD")]
    guard: Option<String>,

    /// Write the amalgamation to stdout instead of the output file
    #[arg(long, conflicts_with_all = ["check", "list"])]
    stdout: bool,

    /// Exit with an error if the output file is not up to date
    #[arg(long, conflicts_with = "list")]
    check: bool,

    /// Print the expansion report (optionally with format: plain, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One line per directive
    Plain,
    /// JSON output for scripting
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let config = build_config(&cli);

    let result = if cli.stdout {
        write_stdout(&config)
    } else if cli.check {
        check(&config).map(|_| {
            if !cli.quiet {
                println!("Up to date {}", config.output.display());
            }
        })
    } else if let Some(format) = cli.list {
        list_report(&config, format)
    } else {
        generate(&config).map(|_| {
            if !cli.quiet {
                println!("Generated {}", config.output.display());
            }
        })
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose > 2)
        .init();
}

fn build_config(cli: &Cli) -> AmalgamateConfig {
    let mut config = match &cli.repo_root {
        Some(root) => AmalgamateConfig::for_repo(root),
        None => AmalgamateConfig::default(),
    };

    if let Some(dir) = &cli.include_root {
        config.include_root = dir.clone();
    }
    if let Some(source) = &cli.source {
        config.source = source.clone();
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(guard) = &cli.guard {
        config.guard = guard.clone();
    }

    config
}

fn write_stdout(config: &AmalgamateConfig) -> Result<()> {
    let amalgamation = amalgamate(config)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&amalgamation.bytes)?;
    stdout.flush()?;
    Ok(())
}

fn list_report(config: &AmalgamateConfig, format: ListFormat) -> Result<()> {
    let report = amalgamate(config)?.report;

    match format {
        ListFormat::Plain => print_plain_report(&report),
        ListFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{json}");
        }
    }

    Ok(())
}

fn print_plain_report(report: &Report) {
    println!("source {}", report.source);
    for entry in &report.entries {
        match entry {
            ReportEntry::Expand { name, .. } => println!("expand {name}"),
            ReportEntry::Pass { name } => println!("pass {name}"),
            ReportEntry::Skip { name, from } => println!("skip {name} ({from})"),
        }
    }
    for name in &report.unreferenced {
        println!("unreferenced {name}");
    }
}
