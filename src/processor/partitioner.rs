use std::collections::HashMap;

use tracing::{debug, warn};

use crate::processor::{ProcessorError, Result, Value, column::Column, row_store::RecordSet};

/// Observed values, one per key selector, in selector order.
pub type PartitionKey = Vec<Value>;

/// Records bucketed by the exact tuple of their key values.
///
/// Values of different types never share a bucket: `Int(1)`, `Float(1.0)`
/// and `"1"` are three keys.
///
/// Only tuples present in the data get a bucket. Records missing a label for
/// any selector land in [`unpartitioned`](Partitions::unpartitioned), so
/// bucket sizes plus the unpartitioned size always equal the input size.
#[derive(Debug, Clone)]
pub struct Partitions {
    selectors: Vec<String>,
    buckets: HashMap<PartitionKey, RecordSet>,
    unpartitioned: RecordSet,
}

/// Groups `records` by the values of `selectors`.
///
/// Bucket iteration order is unspecified; use [`Partitions::sorted`] when the
/// output order matters.
///
/// # Errors
/// [`ProcessorError::InvalidQuery`] if `selectors` is empty.
pub fn partition_by(records: &RecordSet, selectors: &[&str]) -> Result<Partitions> {
    if selectors.is_empty() {
        return Err(ProcessorError::InvalidQuery(
            "partitioning needs at least one key column".into(),
        ));
    }

    let columns: Vec<Column> = selectors.iter().map(|s| records.resolve(s)).collect();

    let mut groups: HashMap<PartitionKey, Vec<usize>> = HashMap::new();
    let mut unpartitioned = Vec::new();

    for (pos, record) in records.iter().enumerate() {
        let key: Option<PartitionKey> = columns
            .iter()
            .map(|column| record.key(column))
            .collect();

        match key {
            Some(key) => groups.entry(key).or_default().push(pos),
            None => unpartitioned.push(pos),
        }
    }

    debug!(
        selectors = ?selectors,
        partitions = groups.len(),
        "partitioned record set"
    );
    if !unpartitioned.is_empty() {
        warn!(
            selectors = ?selectors,
            count = unpartitioned.len(),
            "records missing a key value left unpartitioned"
        );
    }

    let buckets = groups
        .into_iter()
        .map(|(key, positions)| (key, records.subset(&positions)))
        .collect();

    Ok(Partitions {
        selectors: selectors.iter().map(|s| s.to_string()).collect(),
        buckets,
        unpartitioned: records.subset(&unpartitioned),
    })
}

impl Partitions {
    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    /// Number of materialized buckets, not counting the unpartitioned one.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get<K>(&self, key: &[K]) -> Option<&RecordSet>
    where
        K: Clone + Into<Value>,
    {
        let key: PartitionKey = key.iter().cloned().map(Into::into).collect();
        self.buckets.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PartitionKey, &RecordSet)> + '_ {
        self.buckets.iter()
    }

    /// Buckets ordered lexicographically by key, using the ordering of [`Value`].
    pub fn sorted(&self) -> Vec<(&PartitionKey, &RecordSet)> {
        let mut out: Vec<_> = self.buckets.iter().collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    pub fn unpartitioned(&self) -> &RecordSet {
        &self.unpartitioned
    }

    /// Records across all buckets plus the unpartitioned ones.
    pub fn total_records(&self) -> usize {
        self.buckets.values().map(RecordSet::len).sum::<usize>() + self.unpartitioned.len()
    }
}
