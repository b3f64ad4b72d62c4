//! Descriptive statistics over one numeric column of a record subset.
//!
//! The statistic set is the classic five-number summary plus count, mean and
//! sample standard deviation. Quartiles interpolate linearly between the two
//! closest ranks of the ascending values: for `n` values and fraction `f` the
//! rank is `f * (n - 1)`.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::helpers::numeric::{extrema, lerp, mean, sorted, sum_sq_dev};
use crate::processor::{ProcessorError, Result, row_store::RecordSet};

/// A statistic that may be undefined for the subset it was computed over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statistic {
    Defined(f64),
    Undefined,
}

impl Statistic {
    pub fn value(self) -> Option<f64> {
        match self {
            Statistic::Defined(v) => Some(v),
            Statistic::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Statistic::Defined(_))
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Defined(v) => write!(f, "{v}"),
            Statistic::Undefined => f.write_str("undefined"),
        }
    }
}

impl Serialize for Statistic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Statistic::Defined(v) => serializer.serialize_f64(*v),
            Statistic::Undefined => serializer.serialize_none(),
        }
    }
}

/// `{count, mean, std, min, 25%, 50%, 75%, max}` for a non-empty subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined below two observations.
    pub std_dev: Statistic,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl SummaryResult {
    pub fn median(&self) -> f64 {
        self.p50
    }

    pub fn interquartile_range(&self) -> f64 {
        self.p75 - self.p25
    }
}

/// A summary as it appears in output tables.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryCell {
    Summary(SummaryResult),
    /// The subset had no records.
    NoData,
}

impl SummaryCell {
    /// Turns an empty-subset failure into [`SummaryCell::NoData`]; other errors pass through.
    pub fn from_result(result: Result<SummaryResult>) -> Result<Self> {
        match result {
            Ok(summary) => Ok(SummaryCell::Summary(summary)),
            Err(ProcessorError::EmptySubset { column }) => {
                debug!(%column, "empty subset, reporting no data");
                Ok(SummaryCell::NoData)
            }
            Err(e) => Err(e),
        }
    }

    pub fn summary(&self) -> Option<&SummaryResult> {
        match self {
            SummaryCell::Summary(s) => Some(s),
            SummaryCell::NoData => None,
        }
    }
}

impl Serialize for SummaryCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SummaryCell::Summary(s) => s.serialize(serializer),
            SummaryCell::NoData => serializer.serialize_str("no_data"),
        }
    }
}

/// Summarizes column `column` over `records`.
///
/// # Errors
/// - [`ProcessorError::EmptySubset`] if `records` is empty
/// - [`ProcessorError::Type`] if a cell of `column` is missing or not numeric
pub fn summarize(records: &RecordSet, column: &str) -> Result<SummaryResult> {
    if records.is_empty() {
        return Err(ProcessorError::EmptySubset {
            column: column.to_string(),
        });
    }
    let values = records.numeric_column(column)?;
    summarize_values(&values, column)
}

/// Summarizes raw values; `column` only labels errors.
pub fn summarize_values(values: &[f64], column: &str) -> Result<SummaryResult> {
    let empty = || ProcessorError::EmptySubset {
        column: column.to_string(),
    };

    let mean = mean(values).ok_or_else(empty)?;
    let (min, max) = extrema(values).ok_or_else(empty)?;
    let ordered = sorted(values);
    let quartile = |f: f64| quantile_sorted(&ordered, f).ok_or_else(empty);

    let std_dev = match sample_std_dev(values) {
        Ok(std) => Statistic::Defined(std),
        Err(ProcessorError::InsufficientData { actual, .. }) => {
            debug!(%column, count = actual, "standard deviation undefined");
            Statistic::Undefined
        }
        Err(e) => return Err(e),
    };

    Ok(SummaryResult {
        count: values.len(),
        mean,
        std_dev,
        min,
        p25: quartile(0.25)?,
        p50: quartile(0.5)?,
        p75: quartile(0.75)?,
        max,
    })
}

/// Sample standard deviation (divisor `n - 1`).
///
/// # Errors
/// [`ProcessorError::InsufficientData`] for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    let n = values.len();
    if n < 2 {
        return Err(ProcessorError::InsufficientData {
            statistic: "standard deviation",
            required: 2,
            actual: n,
        });
    }
    let center = values.iter().sum::<f64>() / n as f64;
    Ok((sum_sq_dev(values, center) / (n - 1) as f64).sqrt())
}

/// Quantile `fraction` (0.0..=1.0) of ascending `sorted` values, linearly
/// interpolated. `None` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = fraction.clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = (rank.ceil() as usize).min(last);
    Some(lerp(sorted[lo], sorted[hi], rank - lo as f64))
}

/// Equal-width histogram, the numeric payload behind a price distribution chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `bins + 1` ascending bin edges
    pub edges: Vec<f64>,
    /// Count per bin; every bin is half-open except the last, which is closed
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Buckets `values` into `bins` equal-width bins spanning their range.
    ///
    /// When all values are equal the range is widened to `v - 0.5 ..= v + 0.5`,
    /// or by a few ulps of `v` where 0.5 would vanish.
    ///
    /// # Errors
    /// - [`ProcessorError::InvalidArgument`] if `bins` is zero
    /// - [`ProcessorError::EmptySubset`] if `values` is empty
    pub fn from_values(values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(ProcessorError::InvalidArgument(
                "histogram needs at least one bin".into(),
            ));
        }
        let (mut first, mut last) = extrema(values).ok_or_else(|| ProcessorError::EmptySubset {
            column: "histogram".to_string(),
        })?;
        if first == last {
            // 0.5 alone is below the spacing of large floats
            let pad = 0.5f64.max(first.abs() * f64::EPSILON * 4.0);
            first -= pad;
            last += pad;
        }

        let step = (last - first) / bins as f64;
        let mut edges: Vec<f64> = (0..=bins).map(|i| first + step * i as f64).collect();
        edges[bins] = last;

        let norm = bins as f64 / (last - first);
        let mut counts = vec![0usize; bins];
        for &v in values {
            let mut idx = (((v - first) * norm) as usize).min(bins - 1);
            // float rounding can land one bin off the edge comparison
            if idx > 0 && v < edges[idx] {
                idx -= 1;
            } else if idx + 1 < bins && v >= edges[idx + 1] {
                idx += 1;
            }
            counts[idx] += 1;
        }

        Ok(Histogram { edges, counts })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::row_store::tests::{listing, load};

    #[test]
    fn test_constant_values() {
        let s = summarize_values(&[100.0, 100.0, 100.0], "price").unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, 100.0);
        assert_eq!(s.std_dev, Statistic::Defined(0.0));
        assert_eq!((s.min, s.p25, s.p50, s.p75, s.max), (100.0, 100.0, 100.0, 100.0, 100.0));
    }

    #[test]
    fn test_single_value() {
        let s = summarize_values(&[42.0], "price").unwrap();
        assert_eq!(s.count, 1);
        assert_eq!((s.p25, s.p50, s.p75), (42.0, 42.0, 42.0));
        assert_eq!(s.std_dev, Statistic::Undefined);
        assert!(matches!(
            sample_std_dev(&[42.0]),
            Err(ProcessorError::InsufficientData {
                required: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_two_values_interpolate() {
        let s = summarize_values(&[30.0, 10.0], "price").unwrap();
        assert_eq!(s.min, 10.0);
        assert_eq!(s.p25, 15.0);
        assert_eq!(s.p50, 20.0);
        assert_eq!(s.p75, 25.0);
        assert_eq!(s.max, 30.0);
        let std = s.std_dev.value().unwrap();
        assert!((std - 200f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_quartiles_known_sample() {
        // 1..=10: ranks 2.25, 4.5, 6.75
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let s = summarize_values(&values, "price").unwrap();
        assert_eq!(s.p25, 3.25);
        assert_eq!(s.p50, 5.5);
        assert_eq!(s.p75, 7.75);
        assert_eq!(s.mean, 5.5);
        assert!((s.std_dev.value().unwrap() - 3.0276503540974917).abs() < 1e-12);
        assert_eq!(s.interquartile_range(), 4.5);
    }

    #[test]
    fn test_empty_is_error_for_any_column() {
        let records = load(vec![listing("A", "x", 10)]).filter(|_| false);
        for column in ["price", "neighbourhood_group", "no_such_column"] {
            assert!(matches!(
                summarize(&records, column),
                Err(ProcessorError::EmptySubset { .. })
            ));
        }
        assert!(matches!(
            summarize_values(&[], "price"),
            Err(ProcessorError::EmptySubset { .. })
        ));
    }

    #[test]
    fn test_summarize_text_column_is_type_error() {
        let records = load(vec![listing("A", "x", 10)]);
        assert!(matches!(
            summarize(&records, "room_type"),
            Err(ProcessorError::Type { .. })
        ));
    }

    #[test]
    fn test_cell_maps_only_empty_to_no_data() {
        let empty = SummaryCell::from_result(summarize_values(&[], "price")).unwrap();
        assert_eq!(empty, SummaryCell::NoData);

        let other = SummaryCell::from_result(Err(ProcessorError::InvalidQuery("x".into())));
        assert!(other.is_err());
    }

    #[test]
    fn test_undefined_markers_serialize_visibly() {
        let s = summarize_values(&[5.0], "price").unwrap();
        let json = serde_json::to_value(SummaryCell::Summary(s)).unwrap();
        assert!(json["std_dev"].is_null());
        assert_eq!(json["count"], 1);
        assert_eq!(
            serde_json::to_value(SummaryCell::NoData).unwrap(),
            serde_json::json!("no_data")
        );
    }

    #[test]
    fn test_histogram_equal_width() {
        let h = Histogram::from_values(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // last bin is closed on the right
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.total(), 5);
    }

    #[test]
    fn test_histogram_single_value_widens_range() {
        let h = Histogram::from_values(&[7.0, 7.0], 2).unwrap();
        assert_eq!(h.edges, vec![6.5, 7.0, 7.5]);
        assert_eq!(h.counts, vec![0, 2]);
    }

    #[test]
    fn test_histogram_single_large_value_gets_distinct_edges() {
        let v = 1e17;
        let h = Histogram::from_values(&[v, v, v], 20).unwrap();
        assert!(h.edges[0] < v && v < h.edges[20]);
        assert!(h.edges.iter().all(|e| e.is_finite()));
        assert_eq!(h.total(), 3);
    }

    #[test]
    fn test_histogram_rejects_zero_bins_and_empty() {
        assert!(matches!(
            Histogram::from_values(&[1.0], 0),
            Err(ProcessorError::InvalidArgument(_))
        ));
        assert!(matches!(
            Histogram::from_values(&[], 20),
            Err(ProcessorError::EmptySubset { .. })
        ));
    }
}
