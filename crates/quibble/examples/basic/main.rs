//! Basic usage example for quibble
//!
//! Run with: cargo run --example basic -p quibble

use futures_util::StreamExt;
use quibble::{
    Client, ClientConfig, Delete, Insert, Select, SqliteConnection, Statement, Update, Value,
    raw,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Item {
    id: i64,
    foo: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(
        "CREATE TABLE test (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             foo VARCHAR(255) NOT NULL,
             created_at TEXT
         )",
    )?;
    let client = Client::with_config(conn, ClientConfig::new().strict());

    // ============================================
    // Insert
    // ============================================
    println!("=== Insert ===");

    Insert::new("test")
        .row([("foo", "bar")])
        .row([("foo", "baz")])
        .row([("foo", "buzz")])
        .execute(&client)
        .await?;
    Insert::new("test")
        .set("foo", "stamped")
        .set("created_at", raw("CURRENT_TIMESTAMP"))
        .execute(&client)
        .await?;
    println!("rows: {}", Select::new("test").count(&client).await?);

    // ============================================
    // Select
    // ============================================
    println!("\n=== Select ===");

    let q = Select::new("test")
        .and_where("id = ?", 1)
        .or_where("id = ? AND foo = ?", (2, "baz"));
    println!("sql: {}", q.to_sql()?);
    for row in q.fetch_all(&client).await? {
        println!("{}", row.to_json());
    }

    let grouped = Select::new("test")
        .and_where("id > ?", 1)
        .and_where_group(|g| g.and_where("foo = ?", "bar").or_where("foo = ?", "baz"));
    println!("grouped: {} row(s)", grouped.fetch_all(&client).await?.len());

    let item: Option<Item> = Select::new("test")
        .and_where("foo = ?", "buzz")
        .fetch_object(&client)
        .await?;
    println!("object: {item:?}");

    // ============================================
    // Streaming with decorators
    // ============================================
    println!("\n=== Generate ===");

    let mut stream = Select::new("test")
        .select(["id", "foo"])
        .order_by("id")
        .decorate("foo", |v| match v {
            Value::Text(s) => Value::Text(s.to_uppercase()),
            other => other,
        })
        .generate(&client)
        .await?;
    while let Some(row) = stream.next().await {
        let row = row?;
        println!("{} => {}", row.try_get::<i64>("id")?, row.try_get::<String>("foo")?);
    }

    // ============================================
    // Update / Delete
    // ============================================
    println!("\n=== Update / Delete ===");

    let updated = Update::new("test")
        .set("foo", "qux")
        .and_where("id = ?", 1)
        .execute(&client)
        .await?;
    println!("updated: {updated}");

    match Delete::new("test").and_where("id = ?", 999).execute(&client).await {
        Ok(deleted) => println!("deleted: {deleted}"),
        Err(e) if e.is_no_affected_rows() => println!("nothing to delete: {e}"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
