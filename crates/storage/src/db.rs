use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use yenslip_core::{Item, ParseResult, Yen};

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS receipts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uploaded_at TEXT NOT NULL,
            original_filename TEXT NOT NULL,
            stored_path TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            total_yen INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS receipt_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            receipt_id INTEGER NOT NULL,
            item_name TEXT NOT NULL,
            price_yen INTEGER NOT NULL CHECK (price_yen > 0),
            FOREIGN KEY (receipt_id) REFERENCES receipts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_receipt_items_receipt ON receipt_items(receipt_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Upload metadata stored next to the parse result.
#[derive(Debug, Clone)]
pub struct NewReceipt<'a> {
    pub original_filename: &'a str,
    pub stored_path: &'a str,
    pub content_hash: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptRecord {
    pub id: i64,
    pub uploaded_at: DateTime<Utc>,
    pub original_filename: String,
    pub stored_path: String,
    pub content_hash: String,
    /// `None` when no total was detected.
    pub total: Option<Yen>,
}

/// Insert a receipt and its items in one transaction; returns the receipt id.
pub async fn insert_receipt(
    pool: &DbPool,
    receipt: &NewReceipt<'_>,
    parsed: &ParseResult,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let receipt_id = sqlx::query(
        "INSERT INTO receipts (uploaded_at, original_filename, stored_path, content_hash, total_yen) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Utc::now())
    .bind(receipt.original_filename)
    .bind(receipt.stored_path)
    .bind(receipt.content_hash)
    .bind(parsed.total.map(Yen::amount))
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for item in &parsed.items {
        sqlx::query("INSERT INTO receipt_items (receipt_id, item_name, price_yen) VALUES (?, ?, ?)")
            .bind(receipt_id)
            .bind(item.name())
            .bind(item.price().amount())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::debug!(receipt_id, items = parsed.items.len(), "receipt stored");
    Ok(receipt_id)
}

type ReceiptRow = (i64, DateTime<Utc>, String, String, String, Option<i64>);

fn to_record(r: ReceiptRow) -> ReceiptRecord {
    ReceiptRecord {
        id: r.0,
        uploaded_at: r.1,
        original_filename: r.2,
        stored_path: r.3,
        content_hash: r.4,
        total: r.5.map(Yen::new),
    }
}

pub async fn get_receipt(pool: &DbPool, id: i64) -> Result<Option<ReceiptRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, ReceiptRow>(
        "SELECT id, uploaded_at, original_filename, stored_path, content_hash, total_yen FROM receipts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_record))
}

/// Most recent receipts first.
pub async fn list_receipts(pool: &DbPool, limit: i64) -> Result<Vec<ReceiptRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReceiptRow>(
        "SELECT id, uploaded_at, original_filename, stored_path, content_hash, total_yen FROM receipts ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(to_record).collect())
}

/// Items of one receipt in the order they were printed.
pub async fn get_receipt_items(pool: &DbPool, receipt_id: i64) -> Result<Vec<Item>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT item_name, price_yen FROM receipt_items WHERE receipt_id = ? ORDER BY id ASC",
    )
    .bind(receipt_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(name, price)| match Item::new(name, price) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(receipt_id, "skipping invalid stored item: {e}");
                None
            }
        })
        .collect())
}
