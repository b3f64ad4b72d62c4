use crate::config::RecordSchema;
use crate::processor::{ProcessorError, Result, Value};

/// A column selector resolved against a [`RecordSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Group,
    RoomType,
    Price,
    /// Any pass-through column, looked up by name
    Extra(String),
}

impl Column {
    pub fn resolve(name: &str, schema: &RecordSchema) -> Self {
        if name == schema.group_column {
            Column::Group
        } else if name == schema.room_type_column {
            Column::RoomType
        } else if name == schema.price_column {
            Column::Price
        } else {
            Column::Extra(name.to_string())
        }
    }

    pub fn name<'a>(&'a self, schema: &'a RecordSchema) -> &'a str {
        match self {
            Column::Group => &schema.group_column,
            Column::RoomType => &schema.room_type_column,
            Column::Price => &schema.price_column,
            Column::Extra(name) => name,
        }
    }
}

/// Parses a numeric cell. Surrounding whitespace is ignored.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    fast_float::parse::<f64, _>(trimmed).ok()
}

/// Coerces a price cell. Prices must be finite and non-negative.
pub fn coerce_price(row: usize, column: &str, value: &Value) -> Result<f64> {
    let type_error = |reason: &str| ProcessorError::Type {
        row,
        column: column.to_string(),
        value: describe(value),
        reason: reason.to_string(),
    };

    let price = match value {
        Value::Null => return Err(type_error("price is missing")),
        Value::Str(s) if s.trim().is_empty() => return Err(type_error("price is missing")),
        other => other
            .as_f64()
            .ok_or_else(|| type_error("not a number"))?,
    };

    if !price.is_finite() {
        return Err(type_error("not a finite number"));
    }
    if price < 0.0 {
        return Err(type_error("negative price"));
    }
    Ok(price)
}

/// Coerces a categorical cell; null and blank cells have no label.
pub fn coerce_label(value: &Value) -> Option<String> {
    value.label().map(|l| l.into_owned())
}

pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Str(s) => s.clone(),
    }
}
