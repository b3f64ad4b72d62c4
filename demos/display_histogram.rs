use crate::utils::sample_csv_path;
use listing_stats::{AggregationPipeline, AnalysisConfig, RecordSet, source};
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AnalysisConfig::default().with_histogram_bins(10);
    let rows = source::load_csv(sample_csv_path().as_path())?;
    let records = RecordSet::load(rows, &config.schema)?;
    let pipeline = AggregationPipeline::new(records, config);

    // Outliers are hidden from the chart, never from the statistics
    let scope = pipeline.display_scope(pipeline.config().display_price_ceiling)?;
    println!(
        "Hiding {} listing(s) above {} from the chart",
        scope.excluded(),
        scope.ceiling()
    );

    if let Some(histogram) = scope.histogram(pipeline.config().histogram_bins)? {
        for (i, count) in histogram.counts.iter().enumerate() {
            println!(
                "{:>8.1} - {:>8.1} | {}",
                histogram.edges[i],
                histogram.edges[i + 1],
                "#".repeat(*count)
            );
        }
    }

    println!("Canonical price summary: {:?}", pipeline.summary("price")?);
    Ok(())
}
