#![cfg(feature = "sqlite")]

use quibble::{
    Client, ClientConfig, Delete, Insert, QueryError, QueryResult, Select, SqliteConnection,
    StatementKind, Update, Value, raw,
};

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

async fn foo_of(client: &Client<SqliteConnection>, id: i64) -> QueryResult<Option<Value>> {
    Select::new("test")
        .select(["foo"])
        .and_where("id = ?", id)
        .fetch_column(client, 0)
        .await
}

#[tokio::test]
async fn insert_inserts_a_row() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let inserted = Insert::new("test")
        .set("foo", "monomelodies")
        .execute(&client)
        .await?;
    assert!(inserted);
    assert_eq!(foo_of(&client, 4).await?, Some(Value::from("monomelodies")));
    Ok(())
}

#[tokio::test]
async fn insert_with_raw_value() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    Insert::new("test")
        .set("foo", raw("UPPER('quux')"))
        .execute(&client)
        .await?;
    assert_eq!(foo_of(&client, 4).await?, Some(Value::from("QUUX")));
    Ok(())
}

#[tokio::test]
async fn insert_into_missing_table_always_raises() {
    for config in [ClientConfig::new(), ClientConfig::new().strict()] {
        let client = client(config);
        let err = Insert::new("nope")
            .set("foo", Value::Null)
            .execute(&client)
            .await
            .unwrap_err();
        assert!(err.is_preparation());
        assert!(matches!(err, QueryError::Preparation { ref sql, .. } if sql.contains("nope")));
    }
}

#[tokio::test]
async fn insert_constraint_violation_follows_error_mode() {
    let q = Insert::new("test").set("foo", Value::Null);

    let silent = client(ClientConfig::new());
    assert!(!q.execute(&silent).await.unwrap());

    let strict = client(ClientConfig::new().strict());
    let err = q.execute(&strict).await.unwrap_err();
    assert!(err.is_execution());
    assert_eq!(err.statement_kind(), Some(StatementKind::Insert));
}

#[tokio::test]
async fn multi_row_insert() -> QueryResult<()> {
    let client = client(ClientConfig::new().strict());
    let inserted = Insert::new("test")
        .row([("foo", "a")])
        .row([("foo", "b")])
        .row([("foo", "c")])
        .execute(&client)
        .await?;
    assert!(inserted);
    assert_eq!(Select::new("test").count(&client).await?, 6);
    Ok(())
}

#[tokio::test]
async fn multi_row_insert_reports_failing_row_in_strict_mode() {
    let client = client(ClientConfig::new().strict());
    let err = Insert::new("test")
        .row([("foo", Value::from("a"))])
        .row([("foo", Value::Null)])
        .row([("foo", Value::from("c"))])
        .execute(&client)
        .await
        .unwrap_err();
    assert!(err.is_execution());
    assert_eq!(err.context().unwrap().row, Some(1));
    assert_eq!(Select::new("test").count(&client).await.unwrap(), 4);
}

#[tokio::test]
async fn multi_row_insert_in_silent_mode_reports_overall_success() {
    let client = client(ClientConfig::new());
    let inserted = Insert::new("test")
        .row([("foo", Value::Null)])
        .row([("foo", Value::from("b"))])
        .execute(&client)
        .await
        .unwrap();
    assert!(inserted);
    assert_eq!(Select::new("test").count(&client).await.unwrap(), 4);
}

#[tokio::test]
async fn update_changes_matching_rows() -> QueryResult<()> {
    let client = client(ClientConfig::new().strict());
    let updated = Update::new("test")
        .set("foo", "qux")
        .and_where("id = ?", 1)
        .execute(&client)
        .await?;
    assert!(updated);
    assert_eq!(foo_of(&client, 1).await?, Some(Value::from("qux")));
    Ok(())
}

#[tokio::test]
async fn update_from_sub_select() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    Update::new("test")
        .set(
            "foo",
            Select::new("test2")
                .select(["bar"])
                .and_where("id = ?", 3)
                .as_subquery(),
        )
        .and_where("id = ?", 1)
        .execute(&client)
        .await?;
    assert_eq!(foo_of(&client, 1).await?, Some(Value::from("buzz")));
    Ok(())
}

#[tokio::test]
async fn update_without_matches_follows_error_mode() {
    let q = Update::new("test").set("foo", "qux").and_where("id = ?", 999);

    let silent = client(ClientConfig::new());
    assert!(!q.execute(&silent).await.unwrap());

    let strict = client(ClientConfig::new().strict());
    assert!(q.execute(&strict).await.unwrap_err().is_no_affected_rows());
}

#[tokio::test]
async fn delete_removes_matching_rows() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    let deleted = Delete::new("test")
        .in_list("id", [1, 2])
        .execute(&client)
        .await?;
    assert!(deleted);
    assert_eq!(Select::new("test").count(&client).await?, 1);
    Ok(())
}

#[tokio::test]
async fn delete_without_matches_follows_error_mode() {
    let q = Delete::new("test").and_where("id = ?", 999);

    let silent = client(ClientConfig::new());
    assert!(!q.execute(&silent).await.unwrap());

    let strict = client(ClientConfig::new().strict());
    let err = q.execute(&strict).await.unwrap_err();
    assert!(err.is_no_affected_rows());
    assert_eq!(
        err.to_string(),
        "delete affected no rows: `DELETE FROM test WHERE (id = ?)` (999)"
    );
}

#[tokio::test]
async fn delete_without_where_needs_opt_in() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    assert!(!Delete::new("test").execute(&client).await?);
    assert_eq!(Select::new("test").count(&client).await?, 3);

    assert!(Delete::new("test").allow_delete_all(true).execute(&client).await?);
    assert_eq!(Select::new("test").count(&client).await?, 0);
    Ok(())
}

#[tokio::test]
async fn prepared_statements_are_shared_across_builders() -> QueryResult<()> {
    let client = client(ClientConfig::new());
    for id in 1..=3 {
        foo_of(&client, id).await?;
    }
    assert_eq!(client.cached_statements(), 1);
    Ok(())
}
