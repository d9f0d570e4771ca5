// Copyright (c) 2025 Brian G. Milnes
// SPDX-License-Identifier: MIT

//! reorder-fields: reorder the fields of a C/C++ record.
//!
//! Rewrites the record definition, the member initializer lists of its
//! constructors, and positional brace initializers of the record in the given
//! sources. Rewritten files go to stdout unless `-i` is given.
//!
//! Usage:
//!   reorder-fields --record-name ns::Foo --fields-order c,a,b src/
//!   reorder-fields --record-name Foo --fields-order c,a,b -i foo.h foo.cpp

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use reorder_fields::{reorder_fields, ReorderConfig, ReorderOutcome, SourceCorpus};

#[derive(Parser, Debug)]
#[command(name = "reorder-fields")]
#[command(about = "Reorder the fields of a C/C++ record and every initializer that depends on their order")]
struct Args {
    /// Record to reorder: Foo, ns::Foo or ::ns::Foo
    #[arg(long = "record-name")]
    record_name: String,

    /// New field order, comma separated
    #[arg(long = "fields-order")]
    fields_order: String,

    /// Overwrite the files instead of printing them
    #[arg(short = 'i', long = "in-place")]
    in_place: bool,

    /// Print the replacement plan as JSON instead of rewritten files
    #[arg(long)]
    json: bool,

    /// off, error, warn, info, debug or trace
    #[arg(long = "log-level", default_value = "warn")]
    log_level: LevelFilter,

    /// Source files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp(None)
        .init();

    let mut config = ReorderConfig::new(&args.record_name, &args.fields_order, args.paths);
    config.in_place = args.in_place;
    config.json = args.json;
    run(&config)
}

fn run(config: &ReorderConfig) -> Result<()> {
    let files = config.source_files();
    if files.is_empty() {
        bail!("No C/C++ sources found in the given paths");
    }
    info!("Loading {} source files", files.len());

    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        sources.push((path, text));
    }
    let corpus = SourceCorpus::from_sources(sources)?;

    let (plan, warnings) = match reorder_fields(&corpus, &config.record_name, config.fields_order.as_slice())? {
        ReorderOutcome::Planned { plan, warnings } => (plan, warnings),
        ReorderOutcome::Ineligible(reason) => {
            info!("{} left unchanged: {}", config.record_name, reason);
            return Ok(());
        }
    };

    for w in &warnings {
        eprintln!("{}:{}:{}: warning: {}", w.path.display(), w.line, w.column, w);
    }

    if config.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if config.in_place {
        let written = plan
            .write_all(corpus.files().iter().map(|f| (f.path(), f.text())))
            .context("Failed to rewrite sources, none were changed")?;
        for path in written {
            info!("Rewrote {}", path.display());
        }
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for file in corpus.files() {
        if plan.replacements(file.path()).is_empty() {
            continue;
        }
        out.write_all(plan.apply_to(file.path(), file.text()).as_bytes())?;
    }
    out.flush()?;
    Ok(())
}
