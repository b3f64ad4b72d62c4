//! # listing-stats
//!
//! `listing-stats` computes descriptive statistics and categorical breakdowns
//! over a flat dataset of lodging listings. It supports:
//!
//! - All-or-nothing ingestion of parsed rows with a fixed required-column contract
//! - Order-preserving filtering into cheap, immutable views
//! - Partitioning by one or more categorical columns, with an explicit
//!   `unpartitioned` bucket for records missing a key
//! - Count, mean, sample standard deviation, min, quartiles and max per subset
//! - Value frequencies, grouped summaries and display-scoped histograms
//! - A cached query builder and a one-call standard report
//!
//! Empty subsets and single observations never turn into zeros: they surface
//! as [`SummaryCell::NoData`] and [`Statistic::Undefined`].
//!
//! # Example
//!
//! ```rust
//! use listing_stats::{AggregationPipeline, AnalysisConfig, RecordSet, Row, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let row = |group: &str, room: &str, price: i64| -> Row {
//!         [
//!             ("neighbourhood_group".to_string(), Value::from(group)),
//!             ("room_type".to_string(), Value::from(room)),
//!             ("price".to_string(), Value::Int(price)),
//!         ]
//!         .into_iter()
//!         .collect()
//!     };
//!
//!     let config = AnalysisConfig::default();
//!     let records = RecordSet::load(
//!         vec![
//!             row("Manhattan", "Entire home/apt", 225),
//!             row("Brooklyn", "Private room", 89),
//!             row("Brooklyn", "Private room", 60),
//!         ],
//!         &config.schema,
//!     )?;
//!     let pipeline = AggregationPipeline::new(records, config);
//!
//!     // Value frequencies
//!     let counts = pipeline.value_counts("neighbourhood_group")?;
//!     assert_eq!(counts.get("Brooklyn"), Some(2));
//!     assert_eq!(counts.entries[1].label, "Manhattan");
//!
//!     // Price summary per borough
//!     let grouped = pipeline.grouped_summary(&["neighbourhood_group"], "price")?;
//!     for row in &grouped.rows {
//!         println!("{:?} => {:?}", row.key, row.summary);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
mod helpers;
pub mod processor;
pub mod source;

pub use config::{AnalysisConfig, RecordSchema};
pub use processor::{
    FilterPredicate, ProcessorError, Result, Value,
    column::Column,
    partitioner::{PartitionKey, Partitions, partition_by},
    pipeline::{
        AggregationPipeline, AnalysisReport, CategoryCount, DisplayHistogram, DisplayScope,
        GroupedRow, GroupedSummary, QueryBuilder, QueryCache, QueryResult, ValueCounts,
        grouped_summary, value_counts,
    },
    row_store::{Record, RecordSet, Row},
    summary::{
        Histogram, Statistic, SummaryCell, SummaryResult, quantile_sorted, sample_std_dev,
        summarize, summarize_values,
    },
};
