//! Binding ledger and the placeholder weaver.
//!
//! Every clause call hands its SQL fragment and candidate values to [`Bindings::weave`],
//! which lines the candidates up with the fragment's `?` placeholders:
//!
//! - a plain [`Value`] keeps its `?` and is appended to the clause's [`Phase`]
//! - a [`Raw`] replaces its `?` with literal SQL text and binds nothing
//! - a sub-[`Select`] replaces its `?` with the sub-select's SQL and appends the
//!   sub-select's bindings in place
//!
//! Phases flatten in [`Phase::ORDER`], which is the order clauses appear in emitted SQL.

use crate::error::{QueryError, QueryResult};
use crate::qb::select::Select;
use crate::qb::traits::Statement;
use crate::value::Value;
use std::fmt;

/// Ledger phase a clause binds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// INSERT values and UPDATE assignments.
    Values,
    /// Sub-selects used as FROM tables.
    Table,
    /// JOIN targets and ON conditions.
    Join,
    Where,
    Having,
    /// UNION members.
    Union,
}

impl Phase {
    /// Flatten order. Matches the textual order of clauses in every rendered statement.
    pub const ORDER: [Phase; 6] = [
        Phase::Values,
        Phase::Table,
        Phase::Join,
        Phase::Where,
        Phase::Having,
        Phase::Union,
    ];

    fn index(self) -> usize {
        match self {
            Phase::Values => 0,
            Phase::Table => 1,
            Phase::Join => 2,
            Phase::Where => 3,
            Phase::Having => 4,
            Phase::Union => 5,
        }
    }
}

/// Ordered, phase-keyed storage of bound values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    phases: [Vec<Value>; 6],
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, phase: Phase, value: impl Into<Value>) {
        self.phases[phase.index()].push(value.into());
    }

    pub fn extend(&mut self, phase: Phase, values: impl IntoIterator<Item = Value>) {
        self.phases[phase.index()].extend(values);
    }

    /// Drop every value bound into `phase`.
    pub fn clear(&mut self, phase: Phase) {
        self.phases[phase.index()].clear();
    }

    pub fn phase(&self, phase: Phase) -> &[Value] {
        &self.phases[phase.index()]
    }

    /// All values in [`Phase::ORDER`].
    pub fn flatten(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.len());
        for phase in Phase::ORDER {
            out.extend(self.phase(phase).iter().cloned());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.iter().all(Vec::is_empty)
    }

    /// Weave `candidates` into the `?` placeholders of `sql`, returning the rewritten fragment.
    ///
    /// Exactly one candidate per live `?` is required (quoted `?` are text). On a mismatch,
    /// or when a nested sub-select fails to build, nothing is appended.
    pub fn weave(
        &mut self,
        phase: Phase,
        sql: &str,
        candidates: Vec<Bindable>,
    ) -> QueryResult<String> {
        let offsets = placeholder_offsets(sql);
        if offsets.len() != candidates.len() {
            return Err(QueryError::build(format!(
                "`{sql}` has {} placeholder(s) but {} value(s) were supplied",
                offsets.len(),
                candidates.len()
            )));
        }

        let mut out = String::with_capacity(sql.len());
        let mut bound = Vec::with_capacity(candidates.len());
        let mut last = 0;
        for (offset, candidate) in offsets.into_iter().zip(candidates) {
            out.push_str(&sql[last..offset]);
            match candidate {
                Bindable::Value(value) => {
                    out.push('?');
                    bound.push(value);
                }
                Bindable::Raw(raw) => out.push_str(raw.as_str()),
                Bindable::Select(select) => {
                    let built = select.build()?;
                    out.push_str(&built.sql);
                    bound.extend(built.params);
                }
            }
            last = offset + 1;
        }
        out.push_str(&sql[last..]);

        self.extend(phase, bound);
        Ok(out)
    }
}

/// Byte offsets of the live `?` placeholders in `sql`.
///
/// A `?` inside a quoted literal or identifier is text, not a placeholder. Doubled quotes
/// (`'it''s'`) close and reopen the quote, so they need no special case.
pub(crate) fn placeholder_offsets(sql: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut quote: Option<u8> = None;
    for (i, b) in sql.bytes().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'?' => offsets.push(i),
                _ => {}
            },
        }
    }
    offsets
}

pub(crate) fn count_placeholders(sql: &str) -> usize {
    placeholder_offsets(sql).len()
}

/// A value inlined into SQL text verbatim instead of being bound.
///
/// ```ignore
/// Insert::new("events").set("created_at", Raw::new("CURRENT_TIMESTAMP"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Raw(String);

impl Raw {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`Raw::new`].
pub fn raw(sql: impl Into<String>) -> Raw {
    Raw::new(sql)
}

/// A candidate for one `?` placeholder.
#[derive(Debug, Clone)]
pub enum Bindable {
    Value(Value),
    Raw(Raw),
    Select(Box<Select>),
}

impl From<Raw> for Bindable {
    fn from(raw: Raw) -> Self {
        Bindable::Raw(raw)
    }
}

impl From<Select> for Bindable {
    fn from(select: Select) -> Self {
        Bindable::Select(Box::new(select))
    }
}

impl From<Value> for Bindable {
    fn from(value: Value) -> Self {
        Bindable::Value(value)
    }
}

macro_rules! impl_bindable_via_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Bindable {
                fn from(v: $t) -> Self {
                    Bindable::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_bindable_via_value!(
    bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, String, &str, &String, Vec<u8>
);

impl<T: Into<Value>> From<Option<T>> for Bindable {
    fn from(v: Option<T>) -> Self {
        Bindable::Value(Value::from(v))
    }
}

/// Conversion of a clause's candidate list.
///
/// Implemented for `()`, tuples, `Vec`, arrays, and single values, so a clause taking one
/// value does not need to be wrapped in a collection:
///
/// ```ignore
/// select.and_where("id = ?", 1)
///       .or_where("id = ? AND foo = ?", (2, "baz"))
///       .in_list("foo", vec!["bar", "baz"]);
/// ```
pub trait IntoBindings {
    fn into_bindings(self) -> Vec<Bindable>;
}

impl IntoBindings for () {
    fn into_bindings(self) -> Vec<Bindable> {
        Vec::new()
    }
}

impl<T: Into<Bindable>> IntoBindings for Vec<T> {
    fn into_bindings(self) -> Vec<Bindable> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Bindable>, const N: usize> IntoBindings for [T; N] {
    fn into_bindings(self) -> Vec<Bindable> {
        self.into_iter().map(Into::into).collect()
    }
}

macro_rules! impl_into_bindings_single {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoBindings for $t {
                fn into_bindings(self) -> Vec<Bindable> {
                    vec![self.into()]
                }
            }
        )*
    };
}

impl_into_bindings_single!(
    bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, String, &str, &String, Value, Raw,
    Select, Bindable
);

impl<T: Into<Value>> IntoBindings for Option<T> {
    fn into_bindings(self) -> Vec<Bindable> {
        vec![self.into()]
    }
}

macro_rules! impl_into_bindings_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<Bindable>),+> IntoBindings for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_bindings(self) -> Vec<Bindable> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

impl_into_bindings_tuple!(A);
impl_into_bindings_tuple!(A, B);
impl_into_bindings_tuple!(A, B, C);
impl_into_bindings_tuple!(A, B, C, D);
impl_into_bindings_tuple!(A, B, C, D, E);
impl_into_bindings_tuple!(A, B, C, D, E, F);
impl_into_bindings_tuple!(A, B, C, D, E, F, G);
impl_into_bindings_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_keep_their_placeholder() {
        let mut ledger = Bindings::new();
        let sql = ledger
            .weave(Phase::Where, "id = ? AND foo = ?", (2, "baz").into_bindings())
            .unwrap();
        assert_eq!(sql, "id = ? AND foo = ?");
        assert_eq!(
            ledger.phase(Phase::Where),
            &[Value::Int(2), Value::from("baz")]
        );
    }

    #[test]
    fn raw_is_inlined_without_binding() {
        let mut ledger = Bindings::new();
        let sql = ledger
            .weave(Phase::Values, "?, ?", (raw("NOW()"), 5).into_bindings())
            .unwrap();
        assert_eq!(sql, "NOW(), ?");
        assert_eq!(ledger.flatten(), vec![Value::Int(5)]);
    }

    #[test]
    fn sub_select_is_spliced_with_its_bindings() {
        let sub = Select::new("test2")
            .select(["id"])
            .and_where("foo = ?", "bar")
            .as_subquery();
        let mut ledger = Bindings::new();
        let sql = ledger
            .weave(Phase::Where, "a = ? AND id IN ? AND b = ?", (1, sub, 3).into_bindings())
            .unwrap();
        assert_eq!(
            sql,
            "a = ? AND id IN (SELECT id FROM test2 WHERE (foo = ?)) AND b = ?"
        );
        assert_eq!(
            ledger.flatten(),
            vec![Value::Int(1), Value::from("bar"), Value::Int(3)]
        );
        assert_eq!(count_placeholders(&sql), ledger.len());
    }

    #[test]
    fn mismatch_leaves_ledger_untouched() {
        let mut ledger = Bindings::new();
        let err = ledger
            .weave(Phase::Where, "id = ? OR id = ?", 1i64.into_bindings())
            .unwrap_err();
        assert!(matches!(err, QueryError::Build(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn quoted_question_marks_are_not_placeholders() {
        let mut ledger = Bindings::new();
        let sql = ledger.weave(Phase::Where, "foo = 'why?'", ().into_bindings()).unwrap();
        assert_eq!(sql, "foo = 'why?'");
        assert!(ledger.is_empty());

        let err = ledger
            .weave(Phase::Where, "foo = 'a?b' OR id = ?", ("x", 1).into_bindings())
            .unwrap_err();
        assert!(matches!(err, QueryError::Build(_)));

        let sql = ledger
            .weave(
                Phase::Where,
                "foo = 'it''s ?' OR \"we?rd\" = ? OR id = ?",
                (raw("'?'"), 1).into_bindings(),
            )
            .unwrap();
        assert_eq!(sql, "foo = 'it''s ?' OR \"we?rd\" = '?' OR id = ?");
        assert_eq!(ledger.flatten(), vec![Value::Int(1)]);
        assert_eq!(count_placeholders(&sql), ledger.len());
    }

    #[test]
    fn flatten_follows_phase_order() {
        let mut ledger = Bindings::new();
        ledger.push(Phase::Having, 4);
        ledger.push(Phase::Where, 3);
        ledger.push(Phase::Join, 2);
        ledger.push(Phase::Values, 1);
        ledger.push(Phase::Union, 5);
        assert_eq!(
            ledger.flatten(),
            (1..=5).map(Value::Int).collect::<Vec<_>>()
        );
    }
}
