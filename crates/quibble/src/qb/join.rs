//! Join descriptors.

use crate::error::{JoinError, QueryError, QueryResult};
use crate::qb::bindings::{Bindable, Bindings, IntoBindings, Phase};
use crate::qb::group::record;
use crate::qb::select::Select;
use crate::value::Value;

/// Join direction. An unset direction renders a plain `JOIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }
}

/// A FROM or JOIN target: a table name, or a select whose SQL and bindings are spliced in.
#[derive(Debug, Clone)]
pub enum TableRef {
    Name(String),
    Select(Box<Select>),
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        TableRef::Name(name.to_owned())
    }
}

impl From<String> for TableRef {
    fn from(name: String) -> Self {
        TableRef::Name(name)
    }
}

impl From<Select> for TableRef {
    fn from(select: Select) -> Self {
        TableRef::Select(Box::new(select))
    }
}

impl TableRef {
    /// Render into SQL text, appending a sub-select's bindings to `phase`.
    pub(crate) fn weave(self, ledger: &mut Bindings, phase: Phase) -> QueryResult<String> {
        match self {
            TableRef::Name(name) => Ok(name),
            TableRef::Select(select) => ledger.weave(phase, "?", vec![Bindable::Select(select)]),
        }
    }
}

/// One `[INNER|LEFT|RIGHT|FULL] JOIN <table> USING(...)|ON ...` fragment.
///
/// Configured inside the callback passed to [`Select::join`]:
///
/// ```ignore
/// Select::new("test").join(|j| j.left("test2").on("test2.id = test.id AND test2.bar = ?", 2));
/// ```
///
/// Setting the direction twice, or never setting a condition, is a [`JoinError`]
/// reported when the select is built.
#[derive(Debug, Clone, Default)]
pub struct Join {
    direction: Option<JoinType>,
    table: Option<String>,
    condition: Option<String>,
    /// Table sub-select bindings go to `Phase::Table`, ON bindings to `Phase::Join`, so the
    /// table's values always precede the condition's.
    bindings: Bindings,
    build_error: Option<QueryError>,
}

impl Join {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target without a direction (`JOIN table`). A later call replaces the target
    /// and its bindings.
    pub fn table(mut self, table: impl Into<TableRef>) -> Self {
        self.table = None;
        self.bindings.clear(Phase::Table);
        let result = table
            .into()
            .weave(&mut self.bindings, Phase::Table)
            .map(|sql| self.table = Some(sql));
        record(&mut self.build_error, result);
        self
    }

    pub fn inner(self, table: impl Into<TableRef>) -> Self {
        self.direction(JoinType::Inner).table(table)
    }

    pub fn left(self, table: impl Into<TableRef>) -> Self {
        self.direction(JoinType::Left).table(table)
    }

    pub fn right(self, table: impl Into<TableRef>) -> Self {
        self.direction(JoinType::Right).table(table)
    }

    pub fn full(self, table: impl Into<TableRef>) -> Self {
        self.direction(JoinType::Full).table(table)
    }

    fn direction(mut self, direction: JoinType) -> Self {
        match self.direction {
            Some(existing) => record(
                &mut self.build_error,
                Err(JoinError::DirectionAlreadySet(existing.as_sql()).into()),
            ),
            None => self.direction = Some(direction),
        }
        self
    }

    /// Join on a shared column. Replaces any earlier condition.
    pub fn using(mut self, field: &str) -> Self {
        self.bindings.clear(Phase::Join);
        self.condition = Some(format!("USING({field})"));
        self
    }

    /// Join on an expression. Replaces any earlier condition and its bindings.
    pub fn on(mut self, expr: &str, values: impl IntoBindings) -> Self {
        self.condition = None;
        self.bindings.clear(Phase::Join);
        let result = self
            .bindings
            .weave(Phase::Join, expr, values.into_bindings())
            .map(|sql| self.condition = Some(format!("ON {sql}")));
        record(&mut self.build_error, result);
        self
    }

    /// Render the fragment with whitespace collapsed, plus its bindings.
    pub(crate) fn build(self) -> QueryResult<(String, Vec<Value>)> {
        if let Some(err) = self.build_error {
            return Err(err);
        }
        let table = self.table.ok_or(JoinError::MissingTable)?;
        let condition = self
            .condition
            .ok_or_else(|| JoinError::MissingCondition(table.clone()))?;
        let direction = self.direction.map(JoinType::as_sql).unwrap_or_default();
        let sql = format!("{direction} JOIN {table} {condition}");
        let sql = sql.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok((sql, self.bindings.flatten()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn using_condition() {
        let (sql, params) = Join::new().table("test2").using("id").build().unwrap();
        assert_eq!(sql, "JOIN test2 USING(id)");
        assert!(params.is_empty());
    }

    #[test]
    fn on_condition_with_bindings() {
        let (sql, params) = Join::new()
            .left("test2")
            .on("test2.id = test.id\n   AND test2.foo = ?", "bar")
            .build()
            .unwrap();
        assert_eq!(sql, "LEFT JOIN test2 ON test2.id = test.id AND test2.foo = ?");
        assert_eq!(params, vec![Value::from("bar")]);
    }

    #[test]
    fn direction_can_only_be_set_once() {
        let err = Join::new()
            .inner("test2")
            .left("test2")
            .using("id")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Join(JoinError::DirectionAlreadySet("INNER"))
        ));
    }

    #[test]
    fn missing_condition_is_an_error() {
        let err = Join::new().full("test2").build().unwrap_err();
        assert!(matches!(
            err,
            QueryError::Join(JoinError::MissingCondition(ref t)) if t == "test2"
        ));
    }

    #[test]
    fn later_condition_replaces_earlier_bindings() {
        let (sql, params) = Join::new()
            .inner("t2")
            .on("t2.a = ?", 1)
            .on("t2.b = ?", 2)
            .build()
            .unwrap();
        assert_eq!(sql, "INNER JOIN t2 ON t2.b = ?");
        assert_eq!(params, vec![Value::Int(2)]);

        let (sql, params) = Join::new()
            .inner("t2")
            .on("t2.a = ?", 1)
            .using("id")
            .build()
            .unwrap();
        assert_eq!(sql, "INNER JOIN t2 USING(id)");
        assert!(params.is_empty());
    }

    #[test]
    fn later_table_replaces_earlier_sub_select() {
        let first = Select::new("a").and_where("x = ?", 1).with_alias("t");
        let second = Select::new("b").and_where("y = ?", 2).with_alias("t");
        let (sql, params) = Join::new()
            .table(first)
            .table(second)
            .using("id")
            .build()
            .unwrap();
        assert_eq!(sql, "JOIN (SELECT * FROM b WHERE (y = ?)) AS t USING(id)");
        assert_eq!(params, vec![Value::Int(2)]);
    }

    #[test]
    fn sub_select_table_bindings_come_first() {
        let sub = Select::new("test2")
            .and_where("foo = ?", "bar")
            .with_alias("t2");
        let (sql, params) = Join::new()
            .on("t2.id = test.id AND t2.id > ?", 0)
            .inner(sub)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "INNER JOIN (SELECT * FROM test2 WHERE (foo = ?)) AS t2 ON t2.id = test.id AND t2.id > ?"
        );
        assert_eq!(params, vec![Value::from("bar"), Value::Int(0)]);
    }
}
