use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use serde::Serialize;
use thiserror::Error;

pub mod column;
pub mod partitioner;
pub mod pipeline;
pub mod row_store;
pub mod summary;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("schema error: row {row} has no '{column}' column")]
    Schema { row: usize, column: String },

    #[error("type error: row {row}, column '{column}', value {value:?}: {reason}")]
    Type {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("no records to summarize for column '{column}'")]
    EmptySubset { column: String },

    #[error("{statistic} needs at least {required} observations, got {actual}")]
    InsufficientData {
        statistic: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = ProcessorError> = std::result::Result<T, E>;

/// A raw cell as delivered by the ingestion boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing or blank cell
    Null,
    /// Integer cell
    Int(i64),
    /// Float cell
    Float(f64),
    /// Text cell
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Text is trimmed and parsed; blanks are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Str(s) => column::parse_number(s),
        }
    }

    /// Categorical view of the cell. `None` for null and blank text.
    pub fn label(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(Cow::Owned(v.to_string())),
            Value::Float(v) => Some(Cow::Owned(v.to_string())),
            Value::Str(s) if s.trim().is_empty() => None,
            Value::Str(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
        }
    }
}

/// Null first, then numbers by magnitude, then text. An `Int` sorts just
/// before a `Float` of the same magnitude so the order agrees with `Eq`.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Int(_) | Value::Float(_) => 1,
                Value::Str(_) => 2,
            }
        }

        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        matches!(self, Value::Str(s) if s == other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.label().unwrap_or_default())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Declarative filter predicate over a single column.
///
/// Ordering predicates compare numerically; a record whose cell is missing or
/// not a number never matches them. `Equals` compares labels for text bounds,
/// numbers for numeric bounds, and `Equals(Value::Null)` selects missing cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterPredicate {
    Equals(Value),
    GreaterThan(Value),
    LessThan(Value),
    /// `value <= bound`
    AtMost(Value),
    /// `value >= bound`
    AtLeast(Value),
    /// Inclusive on both ends
    Between(Value, Value),
}

impl FilterPredicate {
    /// Rejects predicate/bound combinations that can never be evaluated.
    pub fn validate(&self) -> Result<()> {
        let numeric_bound = |v: &Value| {
            v.as_f64().filter(|b| !b.is_nan()).ok_or_else(|| {
                ProcessorError::InvalidQuery(format!(
                    "ordering predicate needs a numeric bound, got {v:?}"
                ))
            })
        };

        match self {
            FilterPredicate::Equals(_) => Ok(()),
            FilterPredicate::GreaterThan(v)
            | FilterPredicate::LessThan(v)
            | FilterPredicate::AtMost(v)
            | FilterPredicate::AtLeast(v) => numeric_bound(v).map(|_| ()),
            FilterPredicate::Between(lo, hi) => {
                let (lo, hi) = (numeric_bound(lo)?, numeric_bound(hi)?);
                if lo > hi {
                    return Err(ProcessorError::InvalidQuery(format!(
                        "between bounds are reversed: {lo} > {hi}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Evaluates the predicate against one record. Assumes [`validate`](Self::validate) passed.
    pub fn matches(&self, record: &row_store::Record, column: &column::Column) -> bool {
        let number = || record.numeric(column);
        let bound = |v: &Value| v.as_f64().unwrap_or(f64::NAN);

        match self {
            FilterPredicate::Equals(Value::Null) => record.label(column).is_none(),
            FilterPredicate::Equals(Value::Str(target)) => {
                record.label(column).is_some_and(|l| l == target.as_str())
            }
            FilterPredicate::Equals(v) => number().is_some_and(|x| x == bound(v)),
            FilterPredicate::GreaterThan(v) => number().is_some_and(|x| x > bound(v)),
            FilterPredicate::LessThan(v) => number().is_some_and(|x| x < bound(v)),
            FilterPredicate::AtMost(v) => number().is_some_and(|x| x <= bound(v)),
            FilterPredicate::AtLeast(v) => number().is_some_and(|x| x >= bound(v)),
            FilterPredicate::Between(lo, hi) => {
                number().is_some_and(|x| x >= bound(lo) && x <= bound(hi))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_label_treats_blank_as_missing() {
        assert!(Value::Null.label().is_none());
        assert!(Value::from("   ").label().is_none());
        assert_eq!(Value::from("Queens").label().as_deref(), Some("Queens"));
        assert_eq!(Value::Int(7).label().as_deref(), Some("7"));
    }

    #[test]
    fn test_value_as_f64_parses_text() {
        assert_eq!(Value::from(" 149 ").as_f64(), Some(149.0));
        assert_eq!(Value::from("12.5").as_f64(), Some(12.5));
        assert_eq!(Value::from("cheap").as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_value_null_and_int_zero_differ() {
        assert_ne!(Value::Null, Value::Int(0));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_value_order_keeps_types_apart() {
        let mut values = vec![
            Value::from("1"),
            Value::Float(1.0),
            Value::Null,
            Value::Int(2),
            Value::Int(1),
            Value::Float(0.5),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Float(0.5),
                Value::Int(1),
                Value::Float(1.0),
                Value::Int(2),
                Value::from("1"),
            ]
        );
        assert_eq!(Value::from("Bronx"), "Bronx");
        assert_ne!(Value::Int(1), "1");
        assert_eq!(format!("{:<4}|", Value::Int(7)), "7   |");
    }

    #[test]
    fn test_validate_rejects_text_bound_for_ordering() {
        let err = FilterPredicate::AtMost(Value::from("a lot")).validate();
        assert!(matches!(err, Err(ProcessorError::InvalidQuery(_))));
        assert!(FilterPredicate::AtMost(Value::Int(700)).validate().is_ok());
        assert!(FilterPredicate::Equals(Value::from("Bronx")).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_reversed_between() {
        let pred = FilterPredicate::Between(Value::Int(10), Value::Int(5));
        assert!(matches!(
            pred.validate(),
            Err(ProcessorError::InvalidQuery(_))
        ));
    }
}
