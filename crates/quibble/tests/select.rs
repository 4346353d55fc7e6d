#![cfg(feature = "sqlite")]

use futures_util::StreamExt;
use quibble::{Client, ClientConfig, Group, QueryResult, Row, Select, SqliteConnection, Value, raw};
use serde::Deserialize;

fn client(config: ClientConfig) -> Client<SqliteConnection> {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE test (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             foo VARCHAR(255) NOT NULL
         );
         INSERT INTO test (foo) VALUES ('bar'), ('baz'), ('buzz');
         CREATE TABLE test2 (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             bar VARCHAR(255) NOT NULL
         );
         INSERT INTO test2 (bar) VALUES ('bar'), ('baz'), ('buzz');",
    )
    .unwrap();
    Client::with_config(conn, config)
}

#[tokio::test]
async fn where_and_or_where() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let rows = Select::new("test")
        .and_where("id = ?", 1)
        .or_where("id = ? AND foo = ?", (2, "baz"))
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 2);
    Ok(())
}

#[tokio::test]
async fn in_list_matches_values() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let rows = Select::new("test")
        .in_list("foo", ["bar", "baz"])
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 2);

    let rows = Select::new("test")
        .in_list("id", Vec::<i64>::new())
        .fetch_all(&client)
        .await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn unions() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let rows = Select::new("test")
        .union(Select::new("test2"))
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 3);

    let rows = Select::new("test")
        .union_all(Select::new("test2"))
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 6);
    Ok(())
}

#[tokio::test]
async fn join_using() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let row = Select::new("test")
        .join(|j| j.table("test2").using("id"))
        .fetch(&client)
        .await?
        .unwrap();
    assert_eq!(row.columns(), ["id", "foo", "bar"]);
    assert_eq!(row.len(), 3);
    Ok(())
}

#[tokio::test]
async fn join_on_with_bindings() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let rows = Select::new("test")
        .select(["test.id", "test2.bar"])
        .join(|j| j.left("test2").on("test2.id = test.id AND test2.bar <> ?", "baz"))
        .and_where("test.id > ?", 1)
        .order_by("test.id")
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("bar"), Some(&Value::Null));
    assert_eq!(rows[1].get("bar"), Some(&Value::from("buzz")));
    Ok(())
}

#[tokio::test]
async fn join_without_condition_fails_to_build() {
    let client = client(ClientConfig::new());
    let err = Select::new("test")
        .join(|j| j.inner("test2"))
        .fetch_all(&client)
        .await
        .unwrap_err();
    assert!(err.is_join());
}

#[tokio::test]
async fn sub_query_as_binding() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let sub = Select::new("test2")
        .and_where("bar = ?", "bar")
        .or_where("bar = ?", "baz")
        .select(["bar"]);
    let rows = Select::new("test")
        .and_where("foo IN (?)", sub)
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 2);
    Ok(())
}

#[tokio::test]
async fn aliased_sub_query_as_table() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let inner = Select::new("test").and_where("id > ?", 1).with_alias("t");
    let q = Select::new(inner).and_where("t.foo <> ?", "buzz");
    let rows = q.fetch_all(&client).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].try_get::<String>("foo")?, "baz");
    Ok(())
}

#[tokio::test]
async fn grouped_where() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let rows = Select::new("test")
        .and_where("id > ?", 1)
        .and_where_group(|g: Group| g.and_where("foo = ?", "bar").or_where("foo = ?", "baz"))
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 1);
    Ok(())
}

#[tokio::test]
async fn raw_values_are_inlined() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let rows = Select::new("test")
        .and_where("foo = ?", raw("'buzz'"))
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 1);
    Ok(())
}

#[tokio::test]
async fn quoted_question_mark_is_not_bound() -> QueryResult<()> {
    let client = client(ClientConfig::new().strict());
    let rows = Select::new("test")
        .and_where("foo = 'why?' OR id = ?", 1)
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].try_get::<String>("foo")?, "bar");
    Ok(())
}

#[tokio::test]
async fn counting() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    assert_eq!(Select::new("test").count(&client).await?, 3);
    assert_eq!(
        Select::new("test").and_where("id > ?", 1).count(&client).await?,
        2
    );
    assert_eq!(Select::new("test").limit(2).count(&client).await?, 2);
    assert_eq!(
        Select::new("test")
            .union_all(Select::new("test2"))
            .count(&client)
            .await?,
        6
    );
    assert_eq!(
        Select::new("test").count_of(&client, "DISTINCT foo").await?,
        3
    );
    Ok(())
}

#[tokio::test]
async fn group_by_having() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let rows = Select::new("test")
        .select(["LENGTH(foo) AS len", "COUNT(*) AS n"])
        .group_by(["LENGTH(foo)"])
        .having("COUNT(*) > ?", 1)
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].try_get::<i64>("len")?, 3);
    assert_eq!(rows[0].try_get::<i64>("n")?, 2);
    Ok(())
}

#[tokio::test]
async fn limit_and_offset() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let column = Select::new("test")
        .select(["foo"])
        .order_by("id DESC")
        .limit_offset(1, 1)
        .fetch_column(&client, 0)
        .await?;
    assert_eq!(column, Some(Value::from("baz")));
    Ok(())
}

#[tokio::test]
async fn generate_streams_rows() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let mut stream = Select::new("test").order_by("id").generate(&client).await?;
    let mut seen = Vec::new();
    while let Some(row) = stream.next().await {
        seen.push(row?.try_get::<String>("foo")?);
    }
    assert_eq!(seen, ["bar", "baz", "buzz"]);
    Ok(())
}

#[derive(Debug, Deserialize, PartialEq)]
struct TestRow {
    id: i64,
    foo: String,
}

#[tokio::test]
async fn fetch_object_deserializes_row() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let row: Option<TestRow> = Select::new("test")
        .and_where("id = ?", 2)
        .fetch_object(&client)
        .await?;
    assert_eq!(
        row,
        Some(TestRow {
            id: 2,
            foo: "baz".to_string()
        })
    );
    Ok(())
}

#[tokio::test]
async fn decorators_transform_fetched_rows() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let q = Select::new("test")
        .order_by("id")
        .decorate("foo", |v| match v {
            Value::Text(s) => Value::Text(s.to_uppercase()),
            other => other,
        })
        .decorate("id", |v| Value::Int(v.as_i64().unwrap_or_default() * 10));

    let rows: Vec<Row> = q.fetch_all(&client).await?;
    assert_eq!(rows[0].get("foo"), Some(&Value::from("BAR")));
    assert_eq!(rows[2].get("id"), Some(&Value::Int(30)));

    let streamed: Vec<Row> = q
        .generate(&client)
        .await?
        .map(|r| r.unwrap())
        .collect()
        .await;
    assert_eq!(streamed, rows);
    Ok(())
}

#[tokio::test]
async fn empty_results_follow_error_mode() {
    let q = Select::new("test").and_where("id = ?", 999);

    let silent = client(ClientConfig::new());
    assert!(q.fetch_all(&silent).await.unwrap().is_empty());
    assert!(q.fetch(&silent).await.unwrap().is_none());

    let strict = client(ClientConfig::new().strict());
    let err = q.fetch_all(&strict).await.unwrap_err();
    assert!(err.is_empty_result());
    assert_eq!(err.context().unwrap().bindings, vec![Value::Int(999)]);
}

#[tokio::test]
async fn unknown_column_is_a_preparation_error() {
    let client = client(ClientConfig::new());
    let err = Select::new("test")
        .and_where("nope = ?", 1)
        .fetch_all(&client)
        .await
        .unwrap_err();
    assert!(err.is_preparation());
}
