//! Fetched rows and row mapping.

use crate::error::{QueryError, QueryResult};
use crate::value::Value;
use std::sync::Arc;

/// A fetched row: shared column names plus one value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|i| &self.values[i])
    }

    pub fn get_idx(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub(crate) fn get_mut(&mut self, column: &str) -> Option<&mut Value> {
        let idx = self.position(column)?;
        self.values.get_mut(idx)
    }

    /// Get a typed value by column name.
    pub fn try_get<T: FromValue>(&self, column: &str) -> QueryResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| QueryError::decode(column, "no such column"))?;
        T::from_value(value).map_err(|message| QueryError::decode(column, message))
    }

    /// Get a typed value by position.
    pub fn try_get_idx<T: FromValue>(&self, idx: usize) -> QueryResult<T> {
        let value = self
            .get_idx(idx)
            .ok_or_else(|| QueryError::decode(idx.to_string(), "column index out of range"))?;
        T::from_value(value).map_err(|message| QueryError::decode(idx.to_string(), message))
    }

    /// The row as a JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(column, value)| (column.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Conversion from a fetched [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {value}")
}

macro_rules! impl_from_value_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self, String> {
                    let v = value
                        .as_i64()
                        .ok_or_else(|| mismatch(stringify!($t), value))?;
                    <$t>::try_from(v).map_err(|e| e.to_string())
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(v) => Ok(*v),
            Value::Int(v) => Ok(*v != 0),
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch("f64", value)),
            _ => Err(mismatch("f64", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Err(mismatch("string", value)),
            Value::Blob(_) => Err(mismatch("string", value)),
            other => other.to_text().ok_or_else(|| mismatch("string", other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(mismatch("bytes", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Trait for types that can be built from a fetched [`Row`].
///
/// ```ignore
/// struct Test { id: i64, foo: String }
///
/// impl FromRow for Test {
///     fn from_row(row: &Row) -> QueryResult<Self> {
///         Ok(Self { id: row.try_get("id")?, foo: row.try_get("foo")? })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> QueryResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(row.clone())
    }
}
