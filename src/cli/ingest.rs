//! Ingest command: read recon output from stdin

use std::io::IsTerminal;

use anyhow::{Context, Result};

use ferri::recon::ingest::{normalize_lines, read_lines_lossy};
use ferri::recon::{IngestError, IngestSummary, Ingestor};

use super::CliContext;

pub fn ingest_command(ctx: &CliContext, json: bool) -> Result<()> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        // Nothing piped: make sure the database exists and explain usage
        ctx.open_manager()?;
        print_usage(ctx);
        return Ok(());
    }

    let raw = read_lines_lossy(stdin.lock()).context("Failed to read stdin")?;
    let lines = normalize_lines(raw);
    if lines.is_empty() {
        return Err(IngestError::EmptyInput.into());
    }

    let manager = ctx.open_manager().map_err(IngestError::StoreUnavailable)?;
    let summary = Ingestor::new(&manager, ctx.source.as_str())
        .with_context_prefix(ctx.config.ingest.context_prefix.as_str())
        .ingest_lines(lines)?;

    print_ingest_summary(&summary, json)?;
    summary.into_result()?;
    Ok(())
}

fn print_usage(ctx: &CliContext) {
    println!("ferri: pipe recon tool output into the bug bounty database");
    println!();
    println!("Database: {}", ctx.database_path().display());
    println!("Source:   {}", ctx.source);
    println!();
    println!("Usage:");
    println!("  subfinder -d example.com | ferri --source subfinder");
    println!("  cat urls.txt | ferri ingest --json");
    println!("  ferri programs");
    println!("  ferri targets example --alive");
}

fn print_ingest_summary(summary: &IngestSummary, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    if summary.program_created {
        println!("Created program: {} (ID: {})", summary.program_name, summary.program_id);
    }

    for line in &summary.lines {
        println!("✅ {}", line.line);
    }
    for failure in &summary.failures {
        println!("⚠️  {}: {}", failure.line, failure.error);
    }

    println!();
    println!("{}", summary.summary());
    if summary.new_targets > 0 {
        println!("New targets: {}", summary.new_targets);
    }

    Ok(())
}
