use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use listing_stats::{AggregationPipeline, AnalysisConfig, RecordSchema, RecordSet, source};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "listing-stats",
    about = "Descriptive price statistics for a listings CSV",
    long_about = "Load a listings CSV and print value counts, price summaries (overall, per group, per group and room type) and price histograms as JSON.",
    after_help = "Set RUST_LOG=debug for per-step diagnostics on stderr."
)]
struct Cli {
    #[arg(value_name = "CSV", help = "Listings file with a header row")]
    path: PathBuf,
    #[arg(
        long,
        default_value_t = 700.0,
        help = "Prices above this are left out of the display histogram only"
    )]
    display_ceiling: f64,
    #[arg(long, default_value_t = 20, help = "Histogram bin count")]
    bins: usize,
    #[arg(long, default_value = "neighbourhood_group")]
    group_column: String,
    #[arg(long, default_value = "room_type")]
    room_type_column: String,
    #[arg(long, default_value = "price")]
    price_column: String,
    #[arg(long, help = "Single-line JSON output")]
    compact: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let schema = RecordSchema::default()
        .with_group_column(cli.group_column)
        .with_room_type_column(cli.room_type_column)
        .with_price_column(cli.price_column);
    let config = AnalysisConfig::default()
        .with_schema(schema)
        .with_display_price_ceiling(cli.display_ceiling)
        .with_histogram_bins(cli.bins);

    let rows = source::load_csv(&cli.path)?;
    let records = RecordSet::load(rows, &config.schema)?;
    let pipeline = AggregationPipeline::cached(records, config);
    let report = pipeline.report()?;

    let mut stdout = std::io::stdout().lock();
    if cli.compact {
        serde_json::to_writer(&mut stdout, &report)?;
    } else {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
    }
    writeln!(stdout)?;

    Ok(())
}
