//! Predicate groups: nestable AND/OR expression accumulators.

use crate::error::{QueryError, QueryResult, StatementKind};
use crate::qb::bindings::{Bindable, Bindings, Phase};
use crate::qb::traits::{BuiltQuery, Statement};

/// How a predicate combines with everything before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Junction {
    And,
    Or,
}

impl Junction {
    fn as_sql(self) -> &'static str {
        match self {
            Junction::And => "AND",
            Junction::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    junction: Junction,
    sql: String,
    /// Already parenthesized (a rendered group).
    grouped: bool,
}

/// Ordered predicate list shared by WHERE and HAVING clauses.
///
/// Fragments are woven when added, so the list only holds final SQL text. Rendering folds
/// left to right and parenthesizes every step:
///
/// ```text
/// a AND b OR c   =>   (((a) AND (b)) OR (c))
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Predicates {
    conditions: Vec<Condition>,
}

impl Predicates {
    pub(crate) fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub(crate) fn push(
        &mut self,
        ledger: &mut Bindings,
        phase: Phase,
        junction: Junction,
        sql: &str,
        values: Vec<Bindable>,
    ) -> QueryResult<()> {
        let sql = ledger.weave(phase, sql, values)?;
        self.conditions.push(Condition {
            junction,
            sql,
            grouped: false,
        });
        Ok(())
    }

    /// Merge a finished group as a single predicate. Empty groups are dropped.
    pub(crate) fn push_group(
        &mut self,
        ledger: &mut Bindings,
        phase: Phase,
        junction: Junction,
        group: Group,
    ) -> QueryResult<()> {
        if let Some(err) = group.build_error {
            return Err(err);
        }
        if group.predicates.is_empty() {
            return Ok(());
        }
        let sql = group.predicates.render();
        ledger.extend(phase, group.bindings.flatten());
        self.conditions.push(Condition {
            junction,
            sql,
            grouped: true,
        });
        Ok(())
    }

    /// `field [NOT] IN (?, ?, ...)`. An empty list can never match (`1=0`), and an empty
    /// NOT IN always does (`1=1`).
    pub(crate) fn push_in(
        &mut self,
        ledger: &mut Bindings,
        phase: Phase,
        junction: Junction,
        field: &str,
        values: Vec<Bindable>,
        negated: bool,
    ) -> QueryResult<()> {
        if values.is_empty() {
            let sql = if negated { "1=1" } else { "1=0" };
            return self.push(ledger, phase, junction, sql, values);
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let op = if negated { "NOT IN" } else { "IN" };
        let sql = format!("{field} {op} ({placeholders})");
        self.push(ledger, phase, junction, &sql, values)
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for (i, condition) in self.conditions.iter().enumerate() {
            let item = if condition.grouped {
                condition.sql.clone()
            } else {
                format!("({})", condition.sql)
            };
            if i == 0 {
                out = item;
            } else {
                out = format!("({out} {} {item})", condition.junction.as_sql());
            }
        }
        out
    }
}

/// Keep the first error recorded while clauses are added.
pub(crate) fn record(slot: &mut Option<QueryError>, result: QueryResult<()>) {
    if let Err(err) = result {
        if slot.is_none() {
            *slot = Some(err);
        }
    }
}

/// The WHERE methods shared by every filtering builder.
///
/// The builder needs `bindings: Bindings`, `build_error: Option<QueryError>` and the named
/// [`Predicates`] field.
macro_rules! where_methods {
    ($predicates:ident) => {
        pub fn and_where(mut self, sql: &str, values: impl $crate::qb::IntoBindings) -> Self {
            let result = self.$predicates.push(
                &mut self.bindings,
                $crate::qb::Phase::Where,
                $crate::qb::Junction::And,
                sql,
                values.into_bindings(),
            );
            $crate::qb::group::record(&mut self.build_error, result);
            self
        }

        pub fn or_where(mut self, sql: &str, values: impl $crate::qb::IntoBindings) -> Self {
            let result = self.$predicates.push(
                &mut self.bindings,
                $crate::qb::Phase::Where,
                $crate::qb::Junction::Or,
                sql,
                values.into_bindings(),
            );
            $crate::qb::group::record(&mut self.build_error, result);
            self
        }

        /// AND a parenthesized group built by `f`. An empty group adds nothing.
        pub fn and_where_group(
            mut self,
            f: impl FnOnce($crate::qb::Group) -> $crate::qb::Group,
        ) -> Self {
            let result = self.$predicates.push_group(
                &mut self.bindings,
                $crate::qb::Phase::Where,
                $crate::qb::Junction::And,
                f($crate::qb::Group::new()),
            );
            $crate::qb::group::record(&mut self.build_error, result);
            self
        }

        pub fn or_where_group(
            mut self,
            f: impl FnOnce($crate::qb::Group) -> $crate::qb::Group,
        ) -> Self {
            let result = self.$predicates.push_group(
                &mut self.bindings,
                $crate::qb::Phase::Where,
                $crate::qb::Junction::Or,
                f($crate::qb::Group::new()),
            );
            $crate::qb::group::record(&mut self.build_error, result);
            self
        }

        /// `field IN (?, ...)`, one placeholder per value.
        pub fn in_list(mut self, field: &str, values: impl $crate::qb::IntoBindings) -> Self {
            let result = self.$predicates.push_in(
                &mut self.bindings,
                $crate::qb::Phase::Where,
                $crate::qb::Junction::And,
                field,
                values.into_bindings(),
                false,
            );
            $crate::qb::group::record(&mut self.build_error, result);
            self
        }

        pub fn not_in(mut self, field: &str, values: impl $crate::qb::IntoBindings) -> Self {
            let result = self.$predicates.push_in(
                &mut self.bindings,
                $crate::qb::Phase::Where,
                $crate::qb::Junction::And,
                field,
                values.into_bindings(),
                true,
            );
            $crate::qb::group::record(&mut self.build_error, result);
            self
        }
    };
}

pub(crate) use where_methods;

/// A parenthesized boolean expression built inside a callback.
///
/// ```ignore
/// Select::new("test")
///     .and_where("id = ?", 1)
///     .and_where_group(|g| g.and_where("foo = ?", "bar").or_where("foo = ?", "baz"));
/// // SELECT * FROM test WHERE ((id = ?) AND ((foo = ?) OR (foo = ?)))
/// ```
///
/// A group on its own is not executable.
#[derive(Debug, Clone, Default)]
pub struct Group {
    predicates: Predicates,
    bindings: Bindings,
    build_error: Option<QueryError>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    where_methods!(predicates);
}

impl Statement for Group {
    fn kind(&self) -> StatementKind {
        StatementKind::Group
    }

    fn build(&self) -> QueryResult<BuiltQuery> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        Ok(BuiltQuery::new(
            self.predicates.render(),
            self.bindings.flatten(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn or_combines_with_previous() {
        let g = Group::new()
            .and_where("foo = ?", "bar")
            .or_where("foo = ?", "baz");
        assert_eq!(g.to_sql().unwrap(), "((foo = ?) OR (foo = ?))");
        assert_eq!(
            g.bindings().unwrap(),
            vec![Value::from("bar"), Value::from("baz")]
        );
    }

    #[test]
    fn fold_is_left_to_right() {
        let g = Group::new()
            .and_where("a", ())
            .and_where("b", ())
            .or_where("c", ());
        assert_eq!(g.to_sql().unwrap(), "(((a) AND (b)) OR (c))");
    }

    #[test]
    fn nested_group_is_not_double_wrapped() {
        let g = Group::new()
            .and_where("id = ?", 1)
            .and_where_group(|g| g.and_where("foo = ?", "bar").or_where("foo = ?", "baz"));
        assert_eq!(
            g.to_sql().unwrap(),
            "((id = ?) AND ((foo = ?) OR (foo = ?)))"
        );
        assert_eq!(g.bindings().unwrap().len(), 3);
    }

    #[test]
    fn single_predicate_group_keeps_one_pair_of_parens() {
        let g = Group::new()
            .and_where("a = ?", 1)
            .or_where_group(|g| g.and_where("b = ?", 2));
        assert_eq!(g.to_sql().unwrap(), "((a = ?) OR (b = ?))");
    }

    #[test]
    fn empty_group_is_dropped() {
        let g = Group::new().and_where("a = ?", 1).and_where_group(|g| g);
        assert_eq!(g.to_sql().unwrap(), "(a = ?)");
    }

    #[test]
    fn in_list_has_one_placeholder_per_value() {
        let g = Group::new().in_list("foo", vec!["bar", "baz", "qux"]);
        assert_eq!(g.to_sql().unwrap(), "(foo IN (?, ?, ?))");
        assert_eq!(
            g.bindings().unwrap(),
            vec![Value::from("bar"), Value::from("baz"), Value::from("qux")]
        );
    }

    #[test]
    fn empty_in_lists() {
        let none: Vec<i64> = vec![];
        assert_eq!(
            Group::new().in_list("id", none.clone()).to_sql().unwrap(),
            "(1=0)"
        );
        assert_eq!(Group::new().not_in("id", none).to_sql().unwrap(), "(1=1)");
    }

    #[test]
    fn rendering_is_idempotent() {
        let g = Group::new()
            .and_where("a = ?", 1)
            .or_where_group(|g| g.in_list("b", [1, 2]).not_in("c", [3]));
        assert_eq!(g.build().unwrap(), g.build().unwrap());
    }

    #[test]
    fn mismatch_is_reported_on_build() {
        let g = Group::new().and_where("a = ? AND b = ?", 1);
        assert!(matches!(g.build(), Err(QueryError::Build(_))));
    }
}
