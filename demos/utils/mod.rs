use std::path::PathBuf;

/// Returns the path to the bundled sample listings CSV.
pub fn sample_csv_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("listings_sample.csv")
}
