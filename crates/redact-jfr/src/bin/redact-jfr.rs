// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! redact-jfr - Strip sensitive values from a Java Flight Recorder capture.
//!
//! Usage:
//!   redact-jfr --input capture.jfr --output capture.redacted.jfr
//!   redact-jfr --input capture.jfr --output out.jfr --policy policy.yaml
//!   redact-jfr --input capture.jfr --output out.jfr --decisions decisions.yaml

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use chrono::Utc;
use redact_core::{
    load_config, Configuration, CoreError, Decision, DecisionAction, DecisionStore,
    InteractiveOracle, NullOracle, Pseudonymizer, RedactionEngine,
};
use redact_jfr::chunk::{ChunkReader, ChunkWriter};
use redact_jfr::transcoder::Transcoder;
use tracing::info;

/// Batch replay of a previously-recorded decision file: never prompts,
/// looks a value up across every bucket and defaults to keep when absent.
/// The terminal prompt loop that originally produced the file is an
/// external concern this binary doesn't implement.
struct ReplayOracle {
    store: DecisionStore,
}

impl ReplayOracle {
    fn load(path: &std::path::Path) -> Self {
        Self { store: DecisionStore::load(path) }
    }

    fn lookup(&self, value: &str) -> Option<Decision> {
        self.store
            .usernames
            .get(&value.to_lowercase())
            .or_else(|| self.store.hostnames.get(&value.to_lowercase()))
            .or_else(|| self.store.folders.get(&value.to_lowercase()))
            .or_else(|| {
                self.store
                    .custom_patterns
                    .values()
                    .find_map(|bucket| bucket.get(&value.to_lowercase()))
            })
            .cloned()
    }
}

impl InteractiveOracle for ReplayOracle {
    fn get_decision(&mut self, value: &str) -> Decision {
        self.lookup(value).unwrap_or_else(|| Decision::new(DecisionAction::Keep, Utc::now()))
    }

    fn get_folder_decision(&mut self, path: &str) -> Decision {
        self.store
            .folders
            .get(&path.to_lowercase())
            .cloned()
            .unwrap_or_else(|| Decision::new(DecisionAction::Keep, Utc::now()))
    }

    fn save(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(name = "redact-jfr")]
#[command(about = "Redact sensitive values from a JFR recording")]
#[command(version)]
struct Args {
    /// Input recording (.jfr / .flr)
    #[arg(short, long)]
    input: PathBuf,

    /// Output recording path
    #[arg(short, long)]
    output: PathBuf,

    /// Policy YAML file. Omit to use built-in defaults with discovery disabled.
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Interactive-decision replay file. When present, decisions are read
    /// but no new prompts are issued (batch mode never prompts).
    #[arg(long)]
    decisions: Option<PathBuf>,

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
    let mut transcoder = Transcoder::new(&config, redaction);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;
    transcoder = transcoder.with_cancel_flag(Arc::clone(&running));

    if !args.quiet {
        info!("redact-jfr v{}", env!("CARGO_PKG_VERSION"));
        info!("Input: {}", args.input.display());
        info!("Output: {}", args.output.display());
    }

    let mut reader = ChunkReader::open(&args.input)?;
    if !args.quiet {
        info!("Discovering patterns ({} events)", reader.event_count());
    }

    let mut null_oracle = NullOracle;
    let mut replay_oracle;
    let oracle: &mut dyn InteractiveOracle = match &args.decisions {
        Some(path) => {
            replay_oracle = ReplayOracle::load(path);
            &mut replay_oracle
        }
        None => &mut null_oracle,
    };
    transcoder.discover(&mut reader, Some(oracle))?;

    // Discovery consumes the reader's event cursor; reopen for the
    // rewrite pass rather than trying to seek the chunk format backward.
    let mut reader = ChunkReader::open(&args.input)?;
    let writer = ChunkWriter::create(&args.output)?;

    if !args.quiet {
        info!("Rewriting recording");
    }
    let stats = transcoder.transcode(&mut reader, writer)?;

    if !args.quiet {
        info!("Transcode complete");
        info!("  Events read: {}", stats.events_read);
        info!("  Events written: {}", stats.events_written);
        info!("  Events removed: {}", stats.events_removed);
    }

    Ok(())
}
