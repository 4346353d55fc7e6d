#![cfg(feature = "postgres")]

use futures_util::StreamExt;
use quibble::{
    Client, ClientConfig, Delete, Insert, PgConnection, QueryResult, Select, Update, Value,
};
use tokio_postgres::NoTls;

async fn connect(config: ClientConfig) -> Option<Client<PgConnection>> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
        .batch_execute(
            "CREATE TEMP TABLE test (
                 id BIGSERIAL PRIMARY KEY,
                 foo TEXT NOT NULL,
                 created_at TIMESTAMPTZ NOT NULL DEFAULT now()
             );
             INSERT INTO test (foo) VALUES ('bar'), ('baz'), ('buzz');",
        )
        .await
        .expect("create temp table");
    Some(Client::with_config(PgConnection::new(client), config))
}

#[tokio::test]
async fn postgres_select_roundtrip() -> QueryResult<()> {
    let Some(client) = connect(ClientConfig::new()).await else {
        eprintln!("DATABASE_URL not set; skipping postgres_select_roundtrip");
        return Ok(());
    };

    let rows = Select::new("test")
        .and_where("id = ?", 1)
        .or_where("id = ? AND foo = ?", (2, "baz"))
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 2);

    assert_eq!(Select::new("test").count(&client).await?, 3);

    let sub = Select::new("test").select(["id"]).and_where("foo LIKE ?", "b%z%");
    let rows = Select::new("test")
        .and_where("id IN (?)", sub)
        .and_where("created_at <= ?", "2999-01-01T00:00:00Z")
        .fetch_all(&client)
        .await?;
    assert_eq!(rows.len(), 2);
    assert!(matches!(rows[0].get("created_at"), Some(Value::Text(_))));

    let mut stream = Select::new("test").order_by("id").generate(&client).await?;
    let mut n = 0;
    while let Some(row) = stream.next().await {
        row?;
        n += 1;
    }
    assert_eq!(n, 3);
    Ok(())
}

#[tokio::test]
async fn postgres_writes_follow_error_mode() -> QueryResult<()> {
    let Some(client) = connect(ClientConfig::new().strict()).await else {
        eprintln!("DATABASE_URL not set; skipping postgres_writes_follow_error_mode");
        return Ok(());
    };

    assert!(Insert::new("test").set("foo", "quux").execute(&client).await?);
    assert!(
        Update::new("test")
            .set("foo", "qux")
            .and_where("foo = ?", "quux")
            .execute(&client)
            .await?
    );
    let err = Delete::new("test")
        .and_where("id = ?", 999)
        .execute(&client)
        .await
        .unwrap_err();
    assert!(err.is_no_affected_rows());

    let err = Insert::new("nope")
        .set("foo", "bar")
        .execute(&client)
        .await
        .unwrap_err();
    assert!(err.is_preparation());
    Ok(())
}
