use lru::LruCache;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::processor::partitioner::{PartitionKey, partition_by};
use crate::processor::row_store::RecordSet;
use crate::processor::summary::{Histogram, SummaryCell, summarize};
use crate::processor::{FilterPredicate, ProcessorError, Result, Value};
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::rc::Rc;

/// What a query computes once its filters are applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryOp {
    /// Return the filtered records
    Rows,
    /// Summary statistics of a numeric column
    Describe(String),
    /// Frequency of each label of a categorical column
    ValueCounts(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    source: u64,
    filters: Vec<(String, FilterPredicate)>,
    group_by: Vec<String>,
    op: QueryOp,
}

/// LRU cache of query results.
///
/// Keys cover the whole query, filters included, plus the identity of the
/// record set it ran on, so a cache can be shared between pipelines without
/// one serving another's results.
#[derive(Debug)]
pub struct QueryCache {
    cache: RefCell<LruCache<QueryKey, QueryResult>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_capacity(AnalysisConfig::default().cache_capacity)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<QueryResult> {
        self.cache.borrow_mut().get(key).cloned()
    }

    pub fn put(&self, key: QueryKey, value: QueryResult) {
        self.cache.borrow_mut().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// One label of a categorical column and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: Value,
    pub count: usize,
    /// Percentage of the labelled records
    pub share: f64,
}

/// Label frequencies, most frequent first; ties ordered by label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCounts {
    pub column: String,
    pub entries: Vec<CategoryCount>,
    /// Records with no label for the column
    pub missing: usize,
}

impl ValueCounts {
    pub fn pairs(&self) -> Vec<(Value, usize)> {
        self.entries
            .iter()
            .map(|e| (e.label.clone(), e.count))
            .collect()
    }

    pub fn get(&self, label: impl Into<Value>) -> Option<usize> {
        let label = label.into();
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.count)
    }

    /// Labelled plus missing records.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum::<usize>() + self.missing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedRow {
    pub key: PartitionKey,
    pub summary: SummaryCell,
}

/// Summary of one column per partition, rows ordered by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSummary {
    pub keys: Vec<String>,
    pub column: String,
    pub rows: Vec<GroupedRow>,
    /// Records missing a key value, left out of every row
    pub unpartitioned: usize,
}

impl GroupedSummary {
    pub fn get<K>(&self, key: &[K]) -> Option<&SummaryCell>
    where
        K: Clone + Into<Value>,
    {
        let key: PartitionKey = key.iter().cloned().map(Into::into).collect();
        self.rows
            .iter()
            .find(|row| row.key == key)
            .map(|row| &row.summary)
    }

    /// Outer key to inner key to summary, for a two-key grouping.
    ///
    /// # Errors
    /// [`ProcessorError::InvalidQuery`] unless grouped by exactly two keys.
    pub fn nested(&self) -> Result<BTreeMap<Value, BTreeMap<Value, SummaryCell>>> {
        if self.keys.len() != 2 {
            return Err(ProcessorError::InvalidQuery(format!(
                "nested view needs two grouping keys, have {}",
                self.keys.len()
            )));
        }

        let mut out: BTreeMap<Value, BTreeMap<Value, SummaryCell>> = BTreeMap::new();
        for row in &self.rows {
            out.entry(row.key[0].clone())
                .or_default()
                .insert(row.key[1].clone(), row.summary.clone());
        }
        Ok(out)
    }
}

/// Records kept for display by a price ceiling.
///
/// Only shapes what gets rendered; canonical summaries always come from the
/// full record set.
#[derive(Debug, Clone)]
pub struct DisplayScope {
    ceiling: f64,
    records: RecordSet,
    excluded: usize,
}

impl DisplayScope {
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// Records above the ceiling.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Price histogram of the scoped records, `None` when nothing is in scope.
    pub fn histogram(&self, bins: usize) -> Result<Option<Histogram>> {
        optional_histogram(&self.records.prices(), bins)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayHistogram {
    pub ceiling: f64,
    pub excluded: usize,
    pub histogram: Option<Histogram>,
}

/// The standard breakdown of a listings dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub records: usize,
    pub group_counts: ValueCounts,
    pub room_type_counts: ValueCounts,
    pub price_summary: SummaryCell,
    pub price_by_group: GroupedSummary,
    pub price_by_group_and_room_type: GroupedSummary,
    pub display_histogram: DisplayHistogram,
    pub full_histogram: Option<Histogram>,
}

/// Query results
#[derive(Debug, Clone)]
pub enum QueryResult {
    /// Filtered records
    Rows(RecordSet),
    /// Ungrouped summary
    Summary(SummaryCell),
    /// Summary per partition
    Grouped(GroupedSummary),
    /// Label frequencies
    Counts(ValueCounts),
}

impl QueryResult {
    pub fn into_rows(self) -> Result<RecordSet> {
        match self {
            QueryResult::Rows(rows) => Ok(rows),
            other => Err(unexpected("rows", &other)),
        }
    }

    pub fn into_summary(self) -> Result<SummaryCell> {
        match self {
            QueryResult::Summary(cell) => Ok(cell),
            other => Err(unexpected("summary", &other)),
        }
    }

    pub fn into_grouped(self) -> Result<GroupedSummary> {
        match self {
            QueryResult::Grouped(grouped) => Ok(grouped),
            other => Err(unexpected("grouped summary", &other)),
        }
    }

    pub fn into_counts(self) -> Result<ValueCounts> {
        match self {
            QueryResult::Counts(counts) => Ok(counts),
            other => Err(unexpected("value counts", &other)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            QueryResult::Rows(_) => "rows",
            QueryResult::Summary(_) => "summary",
            QueryResult::Grouped(_) => "grouped summary",
            QueryResult::Counts(_) => "value counts",
        }
    }
}

fn unexpected(wanted: &str, got: &QueryResult) -> ProcessorError {
    ProcessorError::InvalidQuery(format!("expected {wanted}, query produced {}", got.kind()))
}

/// Query builder over one record set: filters, then optional grouping, then one operation.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    records: RecordSet,
    cache: Option<Rc<QueryCache>>,
    filters: Vec<(String, FilterPredicate)>,
    group_by_columns: Vec<String>,
    op: QueryOp,
}

impl QueryBuilder {
    pub fn new(records: RecordSet, cache: Option<Rc<QueryCache>>) -> Self {
        Self {
            records,
            cache,
            filters: Vec::new(),
            group_by_columns: Vec::new(),
            op: QueryOp::Rows,
        }
    }

    /// Add a filter condition; conditions are AND-ed
    pub fn filter(mut self, column: &str, predicate: FilterPredicate) -> Self {
        self.filters.push((column.to_string(), predicate));
        self
    }

    /// Add multiple filter conditions
    pub fn filters(mut self, filters: Vec<(&str, FilterPredicate)>) -> Self {
        for (col, pred) in filters {
            self.filters.push((col.to_string(), pred));
        }
        self
    }

    /// Add a single group-by column
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by_columns.push(column.to_string());
        self
    }

    /// Add group-by columns, outermost first
    pub fn group_by_multi(mut self, columns: Vec<&str>) -> Self {
        for col in columns {
            self.group_by_columns.push(col.to_string());
        }
        self
    }

    /// Summarize a numeric column
    pub fn describe(mut self, column: &str) -> Self {
        self.op = QueryOp::Describe(column.to_string());
        self
    }

    /// Count labels of a categorical column
    pub fn value_counts(mut self, column: &str) -> Self {
        self.op = QueryOp::ValueCounts(column.to_string());
        self
    }

    /// Disable caching
    pub fn no_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    fn key(&self) -> QueryKey {
        QueryKey {
            source: self.records.id(),
            filters: self.filters.clone(),
            group_by: self.group_by_columns.clone(),
            op: self.op.clone(),
        }
    }

    /// Execute the query, consulting the cache first when one is attached.
    ///
    /// # Errors
    /// - [`ProcessorError::InvalidQuery`] for an unsupported predicate or
    ///   grouping combined with anything but `describe`
    /// - [`ProcessorError::Type`] when describing a non-numeric column
    pub fn execute(self) -> Result<QueryResult> {
        let key = self.key();

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                debug!(op = ?key.op, "query cache hit");
                return Ok(hit);
            }
        }

        let result = self.run()?;

        if let Some(cache) = &self.cache {
            cache.put(key, result.clone());
        }
        Ok(result)
    }

    fn run(&self) -> Result<QueryResult> {
        let rows = self.apply_filters()?;
        let keys: Vec<&str> = self.group_by_columns.iter().map(String::as_str).collect();

        match (keys.len(), &self.op) {
            (0, QueryOp::Rows) => Ok(QueryResult::Rows(rows)),
            (0, QueryOp::Describe(column)) => Ok(QueryResult::Summary(SummaryCell::from_result(
                summarize(&rows, column),
            )?)),
            (_, QueryOp::Describe(column)) => {
                Ok(QueryResult::Grouped(grouped_summary(&rows, &keys, column)?))
            }
            (0, QueryOp::ValueCounts(column)) => {
                Ok(QueryResult::Counts(value_counts(&rows, column)))
            }
            (_, QueryOp::Rows | QueryOp::ValueCounts(_)) => Err(ProcessorError::InvalidQuery(
                "grouping is only supported together with describe".into(),
            )),
        }
    }

    /// Apply all filters in order
    fn apply_filters(&self) -> Result<RecordSet> {
        let mut rows = self.records.clone();
        for (column, predicate) in &self.filters {
            rows = rows.filter_by(column, predicate)?;
        }
        Ok(rows)
    }
}

/// Frequency of each observed value of `column`, most frequent first.
pub fn value_counts(records: &RecordSet, column: &str) -> ValueCounts {
    let selector = records.resolve(column);
    let mut counts: HashMap<Value, usize> = HashMap::new();
    let mut missing = 0;

    for record in records.iter() {
        match record.key(&selector) {
            Some(label) => *counts.entry(label).or_default() += 1,
            None => missing += 1,
        }
    }

    let labelled = (records.len() - missing) as f64;
    let mut entries: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label,
            count,
            share: count as f64 / labelled * 100.0,
        })
        .collect();
    entries.sort_by(|a, b| (Reverse(a.count), &a.label).cmp(&(Reverse(b.count), &b.label)));

    ValueCounts {
        column: column.to_string(),
        entries,
        missing,
    }
}

/// Summary of `column` for every partition of `records` under `keys`.
pub fn grouped_summary(records: &RecordSet, keys: &[&str], column: &str) -> Result<GroupedSummary> {
    let partitions = partition_by(records, keys)?;

    let rows = partitions
        .sorted()
        .into_iter()
        .map(|(key, bucket)| {
            debug_assert!(!bucket.is_empty(), "partitions are never materialized empty");
            Ok(GroupedRow {
                key: key.clone(),
                summary: SummaryCell::from_result(summarize(bucket, column))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GroupedSummary {
        keys: partitions.selectors().to_vec(),
        column: column.to_string(),
        rows,
        unpartitioned: partitions.unpartitioned().len(),
    })
}

fn optional_histogram(values: &[f64], bins: usize) -> Result<Option<Histogram>> {
    match Histogram::from_values(values, bins) {
        Ok(h) => Ok(Some(h)),
        Err(ProcessorError::EmptySubset { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Runs the standard analyses over one immutable record set.
#[derive(Debug, Clone)]
pub struct AggregationPipeline {
    records: RecordSet,
    config: AnalysisConfig,
    cache: Option<Rc<QueryCache>>,
}

impl AggregationPipeline {
    /// Pipeline without a result cache
    pub fn new(records: RecordSet, config: AnalysisConfig) -> Self {
        Self {
            records,
            config,
            cache: None,
        }
    }

    /// Pipeline with its own cache sized by `config.cache_capacity`
    pub fn cached(records: RecordSet, config: AnalysisConfig) -> Self {
        let cache = Rc::new(QueryCache::with_capacity(config.cache_capacity));
        Self::new(records, config).with_cache(cache)
    }

    pub fn with_cache(mut self, cache: Rc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.records.clone(), self.cache.clone())
    }

    pub fn value_counts(&self, column: &str) -> Result<ValueCounts> {
        self.query().value_counts(column).execute()?.into_counts()
    }

    /// Canonical summary of `column` over the full record set.
    pub fn summary(&self, column: &str) -> Result<SummaryCell> {
        self.query().describe(column).execute()?.into_summary()
    }

    /// Summary of `column` over the records matching `predicate` on `filter_column`.
    pub fn summary_where(
        &self,
        column: &str,
        filter_column: &str,
        predicate: FilterPredicate,
    ) -> Result<SummaryCell> {
        self.query()
            .filter(filter_column, predicate)
            .describe(column)
            .execute()?
            .into_summary()
    }

    pub fn grouped_summary(&self, keys: &[&str], column: &str) -> Result<GroupedSummary> {
        self.query()
            .group_by_multi(keys.to_vec())
            .describe(column)
            .execute()?
            .into_grouped()
    }

    /// Records priced at or below `ceiling`, for display only.
    pub fn display_scope(&self, ceiling: f64) -> Result<DisplayScope> {
        let price = self.config.schema.price_column.clone();
        let records = self
            .query()
            .filter(&price, FilterPredicate::AtMost(Value::Float(ceiling)))
            .execute()?
            .into_rows()?;

        Ok(DisplayScope {
            ceiling,
            excluded: self.records.len() - records.len(),
            records,
        })
    }

    /// Counts, price summaries and histograms for the whole dataset.
    pub fn report(&self) -> Result<AnalysisReport> {
        let schema = &self.config.schema;
        let (group, room_type, price) = (
            schema.group_column.as_str(),
            schema.room_type_column.as_str(),
            schema.price_column.as_str(),
        );
        let bins = self.config.histogram_bins;

        let scope = self.display_scope(self.config.display_price_ceiling)?;
        let report = AnalysisReport {
            records: self.records.len(),
            group_counts: self.value_counts(group)?,
            room_type_counts: self.value_counts(room_type)?,
            price_summary: self.summary(price)?,
            price_by_group: self.grouped_summary(&[group], price)?,
            price_by_group_and_room_type: self.grouped_summary(&[group, room_type], price)?,
            display_histogram: DisplayHistogram {
                ceiling: scope.ceiling(),
                excluded: scope.excluded(),
                histogram: scope.histogram(bins)?,
            },
            full_histogram: optional_histogram(&self.records.prices(), bins)?,
        };

        info!(
            records = report.records,
            groups = report.price_by_group.rows.len(),
            excluded_from_display = report.display_histogram.excluded,
            "built analysis report"
        );
        Ok(report)
    }
}
