// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! redact-text - Strip sensitive values from a log file, line by line.
//!
//! Usage:
//!   redact-text --input app.log --output app.redacted.log
//!   redact-text --input app.log --output out.log --policy policy.yaml
//!   redact-text --input app.log --output out.log --mode fast

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use redact_core::{load_config, Configuration, NullOracle, Pseudonymizer, RedactionEngine};
use redact_text::LineRedactor;
use tracing::info;

/// Discovery mode: `none` skips discovery, `fast` discovers and redacts in
/// one pass, `two-pass` discovers fully before redacting.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    None,
    Fast,
    TwoPass,
}

#[derive(Parser, Debug)]
#[command(name = "redact-text")]
#[command(about = "Redact sensitive values from a text log file")]
#[command(version)]
struct Args {
    /// Input log file
    #[arg(short, long)]
    input: PathBuf,

    /// Output log file
    #[arg(short, long)]
    output: PathBuf,

    /// Policy YAML file. Omit to use built-in defaults with discovery disabled.
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Discovery mode
    #[arg(short, long, value_enum, default_value = "two-pass")]
    mode: ModeArg,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet mode (minimal output)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(filter).with_target(false).init();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let config = match &args.policy {
        Some(path) => load_config(path)?,
        None => Configuration::default(),
    };

    let pseudonymizer = Arc::new(Pseudonymizer::new(config.general.pseudonymization.clone()));
    let redaction = RedactionEngine::from_config(&config, pseudonymizer);
    let mut redactor = LineRedactor::new(&config, redaction);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;
    redactor = redactor.with_cancel_flag(Arc::clone(&running));

    if !args.quiet {
        info!("redact-text v{}", env!("CARGO_PKG_VERSION"));
        info!("Input: {}", args.input.display());
        info!("Output: {}", args.output.display());
    }

    let stats = match args.mode {
        ModeArg::None => {
            let input = File::open(&args.input)?;
            let output = BufWriter::new(File::create(&args.output)?);
            redactor.redact(input, output)?
        }
        ModeArg::Fast => {
            let input = File::open(&args.input)?;
            let output = BufWriter::new(File::create(&args.output)?);
            redactor.process_single_pass(input, output)?
        }
        ModeArg::TwoPass => {
            if !args.quiet {
                info!("Discovering patterns");
            }
            let discover_input = File::open(&args.input)?;
            let mut oracle = NullOracle;
            redactor.discover(discover_input, Some(&mut oracle))?;

            if !args.quiet {
                info!("Rewriting log");
            }
            let input = File::open(&args.input)?;
            let output = BufWriter::new(File::create(&args.output)?);
            redactor.redact(input, output)?
        }
    };

    if !args.quiet {
        info!("Redaction complete");
        info!("  Lines read: {}", stats.lines_read);
        info!("  Lines written: {}", stats.lines_written);
    }

    Ok(())
}
