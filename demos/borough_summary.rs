use crate::utils::sample_csv_path;
use listing_stats::{AggregationPipeline, AnalysisConfig, RecordSet, SummaryCell, source};
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AnalysisConfig::default();
    let rows = source::load_csv(sample_csv_path().as_path())?;
    let records = RecordSet::load(rows, &config.schema)?;
    let pipeline = AggregationPipeline::new(records, config);

    // Listings per borough
    for entry in &pipeline.value_counts("neighbourhood_group")?.entries {
        println!("{:<15} {:>4} ({:.1}%)", entry.label, entry.count, entry.share);
    }

    // Price summary per borough and room type
    let grouped = pipeline.grouped_summary(&["neighbourhood_group", "room_type"], "price")?;
    for (borough, rooms) in grouped.nested()? {
        println!("{borough}:");
        for (room_type, cell) in rooms {
            match cell {
                SummaryCell::Summary(s) => println!(
                    "  {:<16} count={} mean={:.1} std={} median={}",
                    room_type, s.count, s.mean, s.std_dev, s.p50
                ),
                SummaryCell::NoData => println!("  {room_type:<16} no data"),
            }
        }
    }

    Ok(())
}
