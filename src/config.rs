use std::num::NonZeroUsize;

use serde::Serialize;

/// Names of the columns every listing row must carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordSchema {
    /// Categorical grouping column (borough).
    pub group_column: String,
    /// Room type column.
    pub room_type_column: String,
    /// Nightly price column. Must be a non-negative number.
    pub price_column: String,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            group_column: "neighbourhood_group".to_string(),
            room_type_column: "room_type".to_string(),
            price_column: "price".to_string(),
        }
    }
}

impl RecordSchema {
    pub fn with_group_column(mut self, name: impl Into<String>) -> Self {
        self.group_column = name.into();
        self
    }

    pub fn with_room_type_column(mut self, name: impl Into<String>) -> Self {
        self.room_type_column = name.into();
        self
    }

    pub fn with_price_column(mut self, name: impl Into<String>) -> Self {
        self.price_column = name.into();
        self
    }

    /// Required column names in schema order.
    pub fn required_columns(&self) -> [&str; 3] {
        [
            self.group_column.as_str(),
            self.room_type_column.as_str(),
            self.price_column.as_str(),
        ]
    }
}

const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(n) => n,
    None => unreachable!(),
};

/// Settings for one analysis run.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub schema: RecordSchema,
    /// Prices above this are left out of the display-scoped histogram only.
    pub display_price_ceiling: f64,
    /// Number of equal-width histogram bins.
    pub histogram_bins: usize,
    /// Entries kept by the query result cache.
    pub cache_capacity: NonZeroUsize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            schema: RecordSchema::default(),
            display_price_ceiling: 700.0,
            histogram_bins: 20,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl AnalysisConfig {
    pub fn with_schema(mut self, schema: RecordSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_display_price_ceiling(mut self, ceiling: f64) -> Self {
        self.display_price_ceiling = ceiling;
        self
    }

    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_listing_dataset() {
        let config = AnalysisConfig::default();
        assert_eq!(
            config.schema.required_columns(),
            ["neighbourhood_group", "room_type", "price"]
        );
        assert_eq!(config.display_price_ceiling, 700.0);
        assert_eq!(config.histogram_bins, 20);
        assert_eq!(config.cache_capacity.get(), 128);
    }

    #[test]
    fn test_builders_override_fields() {
        let schema = RecordSchema::default()
            .with_group_column("borough")
            .with_price_column("nightly_rate");
        let config = AnalysisConfig::default()
            .with_schema(schema)
            .with_histogram_bins(5);
        assert_eq!(config.schema.group_column, "borough");
        assert_eq!(config.schema.room_type_column, "room_type");
        assert_eq!(config.schema.price_column, "nightly_rate");
        assert_eq!(config.histogram_bins, 5);
    }
}
