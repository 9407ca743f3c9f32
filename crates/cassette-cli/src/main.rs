//! cassette - inspect, verify and generate input recordings
//!
//! Works on the JSON recording layout: four sibling streams per stem
//! (`<stem>.properties.json`, `.capabilities.json`, `.deltas.jsonl`,
//! `.text.jsonl`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cassette_recorder::random::{RandomEventConfig, RandomEventReader};
use cassette_recorder::storage::{JsonRecordReader, JsonRecordWriter, RecordReader, RecordWriter};
use cassette_core::record::TextPromptKind;

#[derive(Parser)]
#[command(name = "cassette")]
#[command(about = "Inspect, verify and generate input recordings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a recording
    Info { stem: PathBuf },
    /// Print delta records as JSON lines
    Dump {
        stem: PathBuf,
        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Parse every record and report the first defect
    Verify { stem: PathBuf },
    /// Write a seeded pseudo-random recording
    Generate {
        stem: PathBuf,
        #[arg(long, default_value = "0")]
        seed: u64,
        #[arg(long, default_value = "100")]
        count: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { stem } => info(stem),
        Commands::Dump { stem, limit } => dump(stem, limit),
        Commands::Verify { stem } => verify(stem),
        Commands::Generate { stem, seed, count } => generate(stem, seed, count),
    }
}

fn info(stem: PathBuf) -> Result<()> {
    let mut reader = JsonRecordReader::new(&stem).context("open recording")?;
    let properties = reader.session_properties();
    let capabilities = reader.static_capabilities();

    let mut count: usize = 0;
    let mut duration_ms: u64 = 0;
    while let Some(record) = reader.next_delta() {
        let record = record.context("read delta stream")?;
        count += 1;
        duration_ms += record.time_delta_ms();
    }
    let plain = reader.text_answers(TextPromptKind::Plain).len();
    let placeholder = reader.text_answers(TextPromptKind::Placeholder).len();

    println!("recording:   {}", stem.display());
    println!("coordinates: {}", if properties.absolute_coords { "absolute" } else { "fractional" });
    println!("deltas:      {}", count);
    println!("duration:    {:.3}s", duration_ms as f64 / 1000.0);
    println!("text:        {} plain, {} placeholder", plain, placeholder);
    println!("capabilities: {}", serde_json::to_string(&capabilities)?);
    Ok(())
}

fn dump(stem: PathBuf, limit: Option<usize>) -> Result<()> {
    let mut reader = JsonRecordReader::new(&stem).context("open recording")?;
    let limit = limit.unwrap_or(usize::MAX);
    let mut printed = 0;
    while printed < limit {
        let Some(record) = reader.next_delta() else {
            break;
        };
        let record = record.context("read delta stream")?;
        println!("{}", serde_json::to_string(&record)?);
        printed += 1;
    }
    Ok(())
}

fn verify(stem: PathBuf) -> Result<()> {
    let mut reader = JsonRecordReader::new(&stem).context("open recording")?;
    let mut count: usize = 0;
    while let Some(record) = reader.next_delta() {
        match record {
            Ok(_) => count += 1,
            Err(e) => {
                println!("INVALID after {} records: {}", count, e);
                std::process::exit(1);
            }
        }
    }
    println!("OK: {} records", count);
    Ok(())
}

fn generate(stem: PathBuf, seed: u64, count: usize) -> Result<()> {
    let mut source = RandomEventReader::new(RandomEventConfig {
        seed,
        event_count: count,
        ..Default::default()
    });
    let mut writer = JsonRecordWriter::new(&stem);
    writer.open().context("create recording")?;
    writer.write_session_properties(&source.session_properties())?;
    writer.write_static_capabilities(&source.static_capabilities())?;
    let mut written = 0;
    while let Some(record) = source.next_delta() {
        writer.write_delta(&record.context("generate record")?)?;
        written += 1;
    }
    writer.close()?;
    println!("wrote {} records to {}", written, stem.display());
    Ok(())
}
