//! Table build pipeline.
//!
//! Reads postcode/value rows from a CSV (optionally gzipped) and writes the
//! encoded JSON table served by the query binary.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use minilookup::{EncodedTable, EncodeError, TableBuilder};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "build-table")]
#[command(about = "Build an encoded postcode table from CSV")]
struct Args {
    /// CSV file of postcode/value rows (.csv or .csv.gz)
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON table
    #[arg(short, long)]
    output: PathBuf,

    /// Header of the postcode column
    #[arg(long, default_value = "postcode")]
    postcode_column: String,

    /// Header of the value column; empty cells mark gaps
    #[arg(long, default_value = "value")]
    value_column: String,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Skip rows with malformed postcodes instead of aborting
    #[arg(long)]
    skip_invalid: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Minilookup Table Build");
    info!("Input: {}", args.input.display());

    let table = read_rows(&args)?;
    write_table(&args.output, &table)?;

    info!(
        "Wrote {} ranges and {} values to {}",
        table.postcode_keys.len(),
        table.value_values.len(),
        args.output.display()
    );
    Ok(())
}

fn read_rows(args: &Args) -> Result<EncodedTable<String>> {
    let file = File::open(&args.input).context("Failed to open input file")?;
    let reader: Box<dyn Read> = if args.input.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let delimiter =
        u8::try_from(args.delimiter).context("Delimiter must be a single-byte character")?;
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(BufReader::new(reader));

    let headers = csv_reader.headers()?.clone();
    let postcode_idx = headers
        .iter()
        .position(|h| h == args.postcode_column)
        .with_context(|| format!("Column '{}' not found", args.postcode_column))?;
    let value_idx = headers
        .iter()
        .position(|h| h == args.value_column)
        .with_context(|| format!("Column '{}' not found", args.value_column))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} rows ({per_sec})")?,
    );

    let mut builder = TableBuilder::new();
    let mut invalid = 0usize;

    for result in csv_reader.records() {
        let record = result?;
        pb.inc(1);

        let postcode = &record[postcode_idx];
        let value = record[value_idx].trim();
        let value = (!value.is_empty()).then(|| value.to_string());

        match builder.push(postcode, value) {
            Ok(()) => {}
            Err(EncodeError::InvalidPostcode(pc)) if args.skip_invalid => {
                warn!("Skipping malformed postcode {:?}", pc);
                invalid += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Row {} rejected", record.position().map_or(0, |p| p.line()))
                })
            }
        }
    }
    pb.finish_and_clear();

    info!(
        "Read {} rows ({} excluded, {} malformed)",
        builder.len(),
        builder.skipped(),
        invalid
    );

    builder.build().context("Failed to encode table")
}

fn write_table(path: &Path, table: &EncodedTable<String>) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, table)?;
    writer.flush()?;
    Ok(())
}
