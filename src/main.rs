//! The main entry point for the `replitex` command-line application.
//!
//! This file parses command-line arguments, turns them into a validated
//! `Configuration`, starts the run on its worker thread and renders the
//! events that come back.

use anyhow::{Context, bail};
use indicatif::{ProgressBar, ProgressStyle};
use replitex::cli::{self, Commands, RunArgs};
use replitex::config::ConfigLoader;
use replitex::engine::{self, RunHandle};
use replitex::{Configuration, Event, MatchRecord, OutputFormat, OutputFormatter};
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = cli::parse_args();

    match args.command {
        Commands::Run { args, yes, quiet } => run(&args, yes, quiet),
        Commands::Preview {
            args,
            format,
            output,
            summary,
        } => preview(&args, &format, output, summary),
    }
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .init();
}

/// Merges flags with the optional config file, then normalizes and validates.
fn build_configuration(args: &RunArgs, preview: bool) -> anyhow::Result<Configuration> {
    let mut config = args.to_configuration(preview);
    if let Some(path) = &args.config {
        let found = ConfigLoader::find_config(path, &args.dir)?;
        let file = ConfigLoader::load(&found)
            .with_context(|| format!("Failed to read config file {}", found.display()))?;
        config.apply_file(file);
    }
    let config = config.normalize()?;
    config.validate()?;
    Ok(config)
}

fn run(args: &RunArgs, yes: bool, quiet: bool) -> anyhow::Result<()> {
    let config = build_configuration(args, false)?;
    if !yes && !confirm(&config)? {
        println!("Cancelled.");
        return Ok(());
    }

    let handle = engine::start(config)?;
    let outcome = follow(handle, !quiet);
    if !outcome.success {
        bail!("Run failed");
    }
    if quiet {
        if let Some(line) = outcome.last_log {
            println!("{line}");
        }
    }
    Ok(())
}

fn preview(
    args: &RunArgs,
    format: &str,
    output: Option<PathBuf>,
    summary: bool,
) -> anyhow::Result<()> {
    let config = build_configuration(args, true)?;
    let handle = engine::start(config)?;
    let outcome = follow(handle, false);
    if !outcome.success {
        bail!("Preview failed");
    }

    let formatter = OutputFormatter::new(OutputFormat::from(format), summary);
    let records = outcome.records.unwrap_or_default();
    match output {
        Some(path) => {
            let mut file = File::create(&path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            formatter.write_output(&mut file, &records)?;
            println!("Preview of {} changes written to {}", records.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            formatter.write_output(&mut lock, &records)?;
        }
    }
    Ok(())
}

/// Asks on stdin before a real run touches anything.
fn confirm(config: &Configuration) -> anyhow::Result<bool> {
    print!(
        "Replace '{}' with '{}' in {} ({:?})? [y/N] ",
        config.search,
        config.replacement,
        config.folder.display(),
        config.mode
    );
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// What a finished run left behind for the caller.
struct Outcome {
    success: bool,
    records: Option<Vec<MatchRecord>>,
    /// The last log line not printed while following, which is the summary.
    last_log: Option<String>,
}

/// Renders events until the run is over.
fn follow(handle: RunHandle, show_log: bool) -> Outcome {
    let pb = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }

    let mut success = false;
    let mut records = None;
    let mut last_log = None;
    for event in handle.events().iter() {
        match event {
            Event::StatusChanged(status) => pb.set_message(status),
            Event::Progress { done, total } => {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
            }
            Event::LogLine(line) => {
                if show_log {
                    pb.suspend(|| println!("{line}"));
                } else {
                    last_log = Some(line);
                }
            }
            Event::PreviewReady(list) => records = Some(list),
            Event::Finished(ok) => success = ok,
        }
    }
    pb.finish_and_clear();
    handle.wait();

    if !success {
        if let Some(line) = last_log.take() {
            eprintln!("{line}");
        }
    }
    Outcome {
        success,
        records,
        last_log,
    }
}
