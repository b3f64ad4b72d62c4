use std::borrow::Cow;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::config::RecordSchema;
use crate::processor::{
    FilterPredicate, ProcessorError, Result, Value,
    column::{Column, coerce_label, coerce_price, describe},
};

/// One parsed input row: column name to cell.
pub type Row = BTreeMap<String, Value>;

/// One listing. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    group: Option<String>,
    room_type: Option<String>,
    price: f64,
    extra: BTreeMap<String, Value>,
}

impl Record {
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn room_type(&self) -> Option<&str> {
        self.room_type.as_deref()
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// Pass-through cell, `None` if this record never carried the column.
    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Categorical label for `column`, `None` when missing or blank.
    pub fn label(&self, column: &Column) -> Option<Cow<'_, str>> {
        match column {
            Column::Group => self.group.as_deref().map(Cow::Borrowed),
            Column::RoomType => self.room_type.as_deref().map(Cow::Borrowed),
            Column::Price => Some(Cow::Owned(self.price.to_string())),
            Column::Extra(name) => self.extra.get(name).and_then(Value::label),
        }
    }

    /// Numeric value for `column`, `None` when missing or not a number.
    pub fn numeric(&self, column: &Column) -> Option<f64> {
        match column {
            Column::Price => Some(self.price),
            Column::Group => self.group.as_deref().and_then(super::column::parse_number),
            Column::RoomType => self
                .room_type
                .as_deref()
                .and_then(super::column::parse_number),
            Column::Extra(name) => self.extra.get(name).and_then(Value::as_f64),
        }
    }

    /// Grouping value for `column`: the observed cell, `None` when missing or blank.
    pub fn key(&self, column: &Column) -> Option<Value> {
        match column {
            Column::Group => self.group.clone().map(Value::Str),
            Column::RoomType => self.room_type.clone().map(Value::Str),
            Column::Price => Some(Value::Float(self.price)),
            Column::Extra(name) => self
                .extra
                .get(name)
                .filter(|v| v.label().is_some())
                .cloned(),
        }
    }

    pub fn value(&self, column: &Column) -> Value {
        match column {
            Column::Group => self.group.clone().into(),
            Column::RoomType => self.room_type.clone().into(),
            Column::Price => Value::Float(self.price),
            Column::Extra(name) => self.extra.get(name).cloned().unwrap_or(Value::Null),
        }
    }
}

#[derive(Debug)]
struct Store {
    schema: RecordSchema,
    records: Vec<Record>,
}

/// An ordered, immutable view over loaded records.
///
/// Views share the underlying store; filtering builds a new index list and
/// never touches the records themselves.
#[derive(Debug, Clone)]
pub struct RecordSet {
    store: Rc<Store>,
    rows: Rc<[usize]>,
    id: u64,
}

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(0);

fn next_view_id() -> u64 {
    NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed)
}

impl RecordSet {
    /// Builds a record set from parsed rows.
    ///
    /// Every row must carry the three schema columns and a non-negative
    /// numeric price. The first offending row aborts the whole load.
    ///
    /// # Errors
    /// - [`ProcessorError::Schema`] if a required column is absent
    /// - [`ProcessorError::Type`] if the price is missing, not a number, or negative
    ///
    /// # Example
    /// ```rust
    /// # use listing_stats::{Row, RecordSet, RecordSchema, Value};
    /// let row: Row = [
    ///     ("neighbourhood_group".to_string(), Value::from("Brooklyn")),
    ///     ("room_type".to_string(), Value::from("Private room")),
    ///     ("price".to_string(), Value::Int(149)),
    /// ]
    /// .into_iter()
    /// .collect();
    /// let records = RecordSet::load(vec![row], &RecordSchema::default()).unwrap();
    /// assert_eq!(records.len(), 1);
    /// ```
    pub fn load<I>(rows: I, schema: &RecordSchema) -> Result<Self>
    where
        I: IntoIterator<Item = Row>,
    {
        let rows = rows.into_iter();
        let mut records = Vec::with_capacity(rows.size_hint().0);

        for (idx, mut row) in rows.enumerate() {
            let mut take = |column: &str| {
                row.remove(column).ok_or_else(|| ProcessorError::Schema {
                    row: idx,
                    column: column.to_string(),
                })
            };

            let group = take(&schema.group_column)?;
            let room_type = take(&schema.room_type_column)?;
            let price = take(&schema.price_column)?;

            records.push(Record {
                group: coerce_label(&group),
                room_type: coerce_label(&room_type),
                price: coerce_price(idx, &schema.price_column, &price)?,
                extra: row,
            });
        }

        info!(records = records.len(), "loaded listing records");

        let rows: Rc<[usize]> = (0..records.len()).collect();
        Ok(RecordSet {
            store: Rc::new(Store {
                schema: schema.clone(),
                records,
            }),
            rows,
            id: next_view_id(),
        })
    }

    /// Identifies this view. Clones share it; every load or filter gets a fresh one.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.store.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Record> {
        self.rows.get(idx).map(|&i| &self.store.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows.iter().map(|&i| &self.store.records[i])
    }

    pub fn resolve(&self, name: &str) -> Column {
        Column::resolve(name, &self.store.schema)
    }

    /// Keeps the records satisfying `predicate`, in their original order.
    pub fn filter<P>(&self, predicate: P) -> RecordSet
    where
        P: Fn(&Record) -> bool,
    {
        let rows: Rc<[usize]> = self
            .rows
            .iter()
            .copied()
            .filter(|&i| predicate(&self.store.records[i]))
            .collect();

        debug!(before = self.len(), after = rows.len(), "filtered record set");

        RecordSet {
            store: Rc::clone(&self.store),
            rows,
            id: next_view_id(),
        }
    }

    /// View of the records at `positions` (indices into this view).
    pub(crate) fn subset(&self, positions: &[usize]) -> RecordSet {
        RecordSet {
            store: Rc::clone(&self.store),
            rows: positions.iter().map(|&p| self.rows[p]).collect(),
            id: next_view_id(),
        }
    }

    /// Declarative filter on one column.
    ///
    /// # Errors
    /// [`ProcessorError::InvalidQuery`] if the predicate cannot be evaluated.
    pub fn filter_by(&self, column: &str, predicate: &FilterPredicate) -> Result<RecordSet> {
        predicate.validate()?;
        let column = self.resolve(column);
        Ok(self.filter(|record| predicate.matches(record, &column)))
    }

    /// All cells of `name` in record order. Records without the column yield `Null`.
    pub fn column(&self, name: &str) -> Vec<Value> {
        let column = self.resolve(name);
        self.iter().map(|record| record.value(&column)).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.iter().map(Record::price).collect()
    }

    /// Numeric cells of `name` in record order.
    ///
    /// # Errors
    /// [`ProcessorError::Type`] on the first missing or non-numeric cell.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.resolve(name);
        if column == Column::Price {
            return Ok(self.prices());
        }

        self.iter()
            .enumerate()
            .map(|(idx, record)| {
                record.numeric(&column).ok_or_else(|| ProcessorError::Type {
                    row: idx,
                    column: name.to_string(),
                    value: describe(&record.value(&column)),
                    reason: "not a number".to_string(),
                })
            })
            .collect()
    }
}
