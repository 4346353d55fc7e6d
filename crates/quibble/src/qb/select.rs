use crate::client::Client;
use crate::connection::Connection;
use crate::error::{QueryError, QueryResult, StatementContext, StatementKind};
use crate::qb::bindings::{Bindable, Bindings, IntoBindings, Phase};
use crate::qb::decorate::{self, Decorator};
use crate::qb::group::{Junction, Predicates, record, where_methods};
use crate::qb::join::{Join, TableRef};
use crate::qb::traits::{BuiltQuery, Statement};
use crate::row::{FromRow, Row};
use crate::stream::SelectStream;
use crate::value::Value;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Default, PartialEq)]
enum Wrap {
    #[default]
    None,
    Subquery,
    Alias(String),
}

/// SELECT statement builder.
///
/// Clause methods consume the builder and return the updated copy; clone first to branch.
///
/// ```ignore
/// let rows = Select::new("test")
///     .and_where("id = ?", 1)
///     .or_where("id = ? AND foo = ?", (2, "baz"))
///     .order_by("id")
///     .fetch_all(&client)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Select {
    tables: Vec<String>,
    fields: Vec<String>,
    joins: Vec<String>,
    where_clause: Predicates,
    group_by: Vec<String>,
    having: Predicates,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    unions: Vec<String>,
    wrap: Wrap,
    decorators: Vec<Decorator>,
    bindings: Bindings,
    build_error: Option<QueryError>,
}

impl Select {
    /// Create a new SELECT over `table`, a table name or a sub-select.
    pub fn new(table: impl Into<TableRef>) -> Self {
        Self {
            tables: Vec::new(),
            fields: vec!["*".to_string()],
            joins: Vec::new(),
            where_clause: Predicates::default(),
            group_by: Vec::new(),
            having: Predicates::default(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            unions: Vec::new(),
            wrap: Wrap::None,
            decorators: Vec::new(),
            bindings: Bindings::new(),
            build_error: None,
        }
        .and_from(table)
    }

    // ==================== Fields and tables ====================

    /// Add fields. The first call replaces the default `*`; later calls merge, skipping fields
    /// already selected.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.fields.len() == 1 && self.fields[0] == "*" {
            self.fields.clear();
        }
        for field in fields {
            let field = field.into();
            if !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
        if self.fields.is_empty() {
            self.fields.push("*".to_string());
        }
        self
    }

    /// Replace the field list.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = vec!["*".to_string()];
        self.select(fields)
    }

    /// Add another table to the FROM list.
    pub fn and_from(mut self, table: impl Into<TableRef>) -> Self {
        let result = table
            .into()
            .weave(&mut self.bindings, Phase::Table)
            .map(|sql| self.tables.push(sql));
        record(&mut self.build_error, result);
        self
    }

    // ==================== Joins ====================

    /// Add a join configured by `f`.
    ///
    /// ```ignore
    /// select.join(|j| j.left("test2").using("id"))
    /// ```
    pub fn join(mut self, f: impl FnOnce(Join) -> Join) -> Self {
        let result = f(Join::new()).build().map(|(sql, params)| {
            self.joins.push(sql);
            self.bindings.extend(Phase::Join, params);
        });
        record(&mut self.build_error, result);
        self
    }

    pub fn inner_join(self, table: impl Into<TableRef>, on: &str) -> Self {
        self.join(|j| j.inner(table).on(on, ()))
    }

    pub fn left_join(self, table: impl Into<TableRef>, on: &str) -> Self {
        self.join(|j| j.left(table).on(on, ()))
    }

    pub fn right_join(self, table: impl Into<TableRef>, on: &str) -> Self {
        self.join(|j| j.right(table).on(on, ()))
    }

    pub fn full_join(self, table: impl Into<TableRef>, on: &str) -> Self {
        self.join(|j| j.full(table).on(on, ()))
    }

    // ==================== WHERE ====================

    where_methods!(where_clause);

    // ==================== GROUP BY / HAVING / ORDER BY ====================

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn having(mut self, sql: &str, values: impl IntoBindings) -> Self {
        let result = self.having.push(
            &mut self.bindings,
            Phase::Having,
            Junction::And,
            sql,
            values.into_bindings(),
        );
        record(&mut self.build_error, result);
        self
    }

    pub fn or_having(mut self, sql: &str, values: impl IntoBindings) -> Self {
        let result = self.having.push(
            &mut self.bindings,
            Phase::Having,
            Junction::Or,
            sql,
            values.into_bindings(),
        );
        record(&mut self.build_error, result);
        self
    }

    /// Add an ORDER BY expression, e.g. `"id DESC"`.
    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order_by.push(expr.into());
        self
    }

    // ==================== Pagination ====================

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// LIMIT plus OFFSET; an offset of 0 is omitted.
    pub fn limit_offset(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some(limit);
        self.offset = (offset > 0).then_some(offset);
        self
    }

    // ==================== Set operations and wrapping ====================

    pub fn union(self, other: Select) -> Self {
        self.push_union("UNION", other)
    }

    pub fn union_all(self, other: Select) -> Self {
        self.push_union("UNION ALL", other)
    }

    fn push_union(mut self, op: &str, other: Select) -> Self {
        let result = self
            .bindings
            .weave(Phase::Union, "?", vec![Bindable::from(other)])
            .map(|sql| self.unions.push(format!("{op} {sql}")));
        record(&mut self.build_error, result);
        self
    }

    /// Render as `(SELECT ...)`.
    pub fn as_subquery(mut self) -> Self {
        self.wrap = Wrap::Subquery;
        self
    }

    /// Render as `(SELECT ...) AS alias`.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.wrap = Wrap::Alias(alias.into());
        self
    }

    /// Transform `field` in every fetched row. Decorators run in the order they were added.
    pub fn decorate(
        mut self,
        field: impl Into<String>,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.decorators.push(Decorator::new(field, transform));
        self
    }

    // ==================== SQL generation ====================

    fn render_fields(&self, fields: &str) -> String {
        let mut sql = format!("SELECT {fields} FROM {}", self.tables.join(", "));

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clause.render());
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having.render());
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        for union in &self.unions {
            sql.push(' ');
            sql.push_str(union);
        }
        sql
    }

    fn wrapped(&self, sql: String) -> String {
        match &self.wrap {
            Wrap::None => sql,
            Wrap::Subquery => format!("({sql})"),
            Wrap::Alias(alias) => format!("({sql}) AS {alias}"),
        }
    }

    fn check(&self) -> QueryResult<()> {
        match &self.build_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Build a `COUNT(what)` query over the same tables and conditions.
    ///
    /// Grouped, limited or unioned selects are counted through a derived table.
    pub fn build_count(&self, what: &str) -> QueryResult<BuiltQuery> {
        self.check()?;
        let needs_derived = !self.group_by.is_empty()
            || !self.having.is_empty()
            || !self.unions.is_empty()
            || self.limit.is_some()
            || self.offset.is_some();

        let sql = if needs_derived {
            let inner = self.render_fields(&self.fields.join(", "));
            format!("SELECT COUNT({what}) FROM ({inner}) AS quibble_count")
        } else {
            let mut plain = self.clone();
            plain.order_by.clear();
            plain.render_fields(&format!("COUNT({what})"))
        };
        Ok(BuiltQuery::new(sql, self.bindings.flatten()))
    }

    // ==================== Execution ====================

    /// Fetch every row. An empty result is an error in strict mode and an empty `Vec` otherwise.
    pub async fn fetch_all<C: Connection>(&self, client: &Client<C>) -> QueryResult<Vec<Row>> {
        let built = self.build()?;
        let result = client
            .query_built(StatementKind::Select, &built)
            .await
            .and_then(|rows| non_empty(rows, &built));
        let rows = client.settle(result, Vec::new)?;
        Ok(rows
            .into_iter()
            .map(|row| decorate::apply(&self.decorators, row))
            .collect())
    }

    /// Fetch the first row.
    pub async fn fetch<C: Connection>(&self, client: &Client<C>) -> QueryResult<Option<Row>> {
        Ok(self.fetch_all(client).await?.into_iter().next())
    }

    /// Fetch column `idx` of the first row.
    pub async fn fetch_column<C: Connection>(
        &self,
        client: &Client<C>,
        idx: usize,
    ) -> QueryResult<Option<Value>> {
        let row = self.fetch(client).await?;
        Ok(row.and_then(|row| row.into_values().into_iter().nth(idx)))
    }

    /// Fetch the first row mapped through [`FromRow`].
    pub async fn fetch_as<T: FromRow, C: Connection>(
        &self,
        client: &Client<C>,
    ) -> QueryResult<Option<T>> {
        self.fetch(client)
            .await?
            .map(|row| T::from_row(&row))
            .transpose()
    }

    pub async fn fetch_all_as<T: FromRow, C: Connection>(
        &self,
        client: &Client<C>,
    ) -> QueryResult<Vec<T>> {
        self.fetch_all(client)
            .await?
            .iter()
            .map(T::from_row)
            .collect()
    }

    /// Fetch the first row deserialized from its JSON object form.
    pub async fn fetch_object<T: DeserializeOwned, C: Connection>(
        &self,
        client: &Client<C>,
    ) -> QueryResult<Option<T>> {
        let Some(row) = self.fetch(client).await? else {
            return Ok(None);
        };
        serde_json::from_value(row.to_json())
            .map(Some)
            .map_err(|e| QueryError::decode("*", e.to_string()))
    }

    /// `COUNT(*)` over the same tables and conditions.
    pub async fn count<C: Connection>(&self, client: &Client<C>) -> QueryResult<u64> {
        self.count_of(client, "*").await
    }

    pub async fn count_of<C: Connection>(
        &self,
        client: &Client<C>,
        what: &str,
    ) -> QueryResult<u64> {
        let built = self.build_count(what)?;
        let result = client
            .query_built(StatementKind::Select, &built)
            .await
            .and_then(|rows| non_empty(rows, &built))
            .and_then(|rows| rows[0].try_get_idx::<u64>(0));
        client.settle(result, || 0)
    }

    /// Execute and return a lazy stream of decorated rows.
    pub async fn generate<C: Connection>(&self, client: &Client<C>) -> QueryResult<SelectStream> {
        let built = self.build()?;
        let context = StatementContext::new(StatementKind::Select, &built.sql, built.params.clone());
        let result = client
            .query_stream_built(StatementKind::Select, built)
            .await
            .map(Some);
        let inner = client.settle(result, || None)?;
        Ok(SelectStream::new(
            inner,
            self.decorators.clone(),
            context,
            !client.is_strict(),
        ))
    }
}

fn non_empty(rows: Vec<Row>, built: &BuiltQuery) -> QueryResult<Vec<Row>> {
    if rows.is_empty() {
        return Err(QueryError::empty_result(StatementContext::new(
            StatementKind::Select,
            built.sql.clone(),
            built.params.clone(),
        )));
    }
    Ok(rows)
}

impl Statement for Select {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn build(&self) -> QueryResult<BuiltQuery> {
        self.check()?;
        let sql = self.wrapped(self.render_fields(&self.fields.join(", ")));
        Ok(BuiltQuery::new(sql, self.bindings.flatten()))
    }
}
