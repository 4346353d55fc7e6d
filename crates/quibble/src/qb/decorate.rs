//! Per-field post-processing of fetched rows.

use crate::row::Row;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Transform applied to one column of every fetched row.
#[derive(Clone)]
pub struct Decorator {
    field: String,
    transform: Transform,
}

impl Decorator {
    pub fn new(
        field: impl Into<String>,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            field: field.into(),
            transform: Arc::new(transform),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// Run decorators in insertion order. Columns the row does not have are skipped.
pub(crate) fn apply(decorators: &[Decorator], mut row: Row) -> Row {
    for decorator in decorators {
        if let Some(slot) = row.get_mut(&decorator.field) {
            let value = std::mem::take(slot);
            *slot = (decorator.transform)(value);
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorators_chain_in_order() {
        let row = Row::new(
            Arc::from(vec!["foo".to_string()]),
            vec![Value::from("bar")],
        );
        let decorators = [
            Decorator::new("foo", |v| match v {
                Value::Text(s) => Value::Text(s.to_uppercase()),
                other => other,
            }),
            Decorator::new("foo", |v| match v {
                Value::Text(s) => Value::Text(format!("<{s}>")),
                other => other,
            }),
            Decorator::new("missing", |_| Value::Null),
        ];
        let row = apply(&decorators, row);
        assert_eq!(row.get("foo"), Some(&Value::from("<BAR>")));
    }
}
