use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, info, Instrument};

use crate::analytics::EntrySnapshot;
use crate::observability;

/// A product applied as part of an entry's routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUsage {
    pub product_name: String,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
}

/// One user's skincare log for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkincareEntry {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub image_path: Option<String>,
    pub analysis_result: Option<String>,
    pub notes: Option<String>,
    pub skin_condition: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub products: Vec<ProductUsage>,
}

impl SkincareEntry {
    pub fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            date: self.date,
            skin_condition: self.skin_condition.clone(),
            analysis_result: self.analysis_result.clone(),
            products: self.products.iter().map(|p| p.product_name.clone()).collect(),
        }
    }
}

/// Payload for a new entry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub skin_condition: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub analysis_result: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductUsage>,
}

/// Partial update; `None` leaves a column untouched. `Some(products)`
/// replaces the whole product list, `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntryChanges {
    #[serde(default)]
    pub skin_condition: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub analysis_result: Option<String>,
    #[serde(default)]
    pub products: Option<Vec<ProductUsage>>,
}

/// Calendar cell for one dated entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEntry {
    pub id: i64,
    #[serde(skip)]
    pub date: NaiveDate,
    pub skin_condition: Option<String>,
    pub has_image: bool,
}

/// What is left of an entry after deletion, for file clean-up
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedEntry {
    pub id: i64,
    pub image_path: Option<String>,
}

const ENTRY_COLUMNS: &str = "id, user_id, date, image_path, analysis_result, notes, skin_condition, created_at, updated_at";

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS skincare_entries (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            date DATE NOT NULL,
            image_path TEXT,
            analysis_result TEXT,
            notes TEXT,
            skin_condition VARCHAR(50),
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CONSTRAINT skincare_entries_user_date_key UNIQUE (user_id, date)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create skincare_entries table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS product_usage (
            id BIGSERIAL PRIMARY KEY,
            entry_id BIGINT NOT NULL REFERENCES skincare_entries(id) ON DELETE CASCADE,
            product_name VARCHAR(200) NOT NULL,
            product_type VARCHAR(100),
            time_of_day VARCHAR(50)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create product_usage table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS skin_analyses (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            result TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create skin_analyses table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS product_usage_entry_id_idx ON product_usage(entry_id)")
        .execute(pool)
        .await
        .context("Failed to create product_usage entry_id index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS skin_analyses_user_id_idx ON skin_analyses(user_id)")
        .execute(pool)
        .await
        .context("Failed to create skin_analyses user_id index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

fn entry_from_row(row: &PgRow) -> SkincareEntry {
    SkincareEntry {
        id: row.get(0),
        user_id: row.get(1),
        date: row.get(2),
        image_path: row.get(3),
        analysis_result: row.get(4),
        notes: row.get(5),
        skin_condition: row.get(6),
        created_at: row.get(7),
        updated_at: row.get(8),
        products: Vec::new(),
    }
}

fn finish(operation: &str, started: Instant, success: bool) {
    observability::record_db_metrics(operation, success, started.elapsed());
}

async fn insert_products(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry_id: i64,
    products: &[ProductUsage],
) -> Result<()> {
    for product in products {
        sqlx::query(
            "INSERT INTO product_usage (entry_id, product_name, product_type, time_of_day) VALUES ($1, $2, $3, $4)",
        )
        .bind(entry_id)
        .bind(&product.product_name)
        .bind(&product.product_type)
        .bind(&product.time_of_day)
        .execute(&mut **tx)
        .await
        .context("Failed to insert product usage")?;
    }
    Ok(())
}

async fn load_products(pool: &PgPool, entry_ids: &[i64]) -> Result<HashMap<i64, Vec<ProductUsage>>> {
    let mut by_entry: HashMap<i64, Vec<ProductUsage>> = HashMap::new();
    if entry_ids.is_empty() {
        return Ok(by_entry);
    }

    let rows = sqlx::query(
        "SELECT entry_id, product_name, product_type, time_of_day FROM product_usage WHERE entry_id = ANY($1) ORDER BY id",
    )
    .bind(entry_ids)
    .fetch_all(pool)
    .await
    .context("Failed to read product usage")?;

    for row in rows {
        by_entry.entry(row.get(0)).or_default().push(ProductUsage {
            product_name: row.get(1),
            product_type: row.get(2),
            time_of_day: row.get(3),
        });
    }
    Ok(by_entry)
}

async fn with_products(pool: &PgPool, mut entry: SkincareEntry) -> Result<SkincareEntry> {
    let mut products = load_products(pool, &[entry.id]).await?;
    entry.products = products.remove(&entry.id).unwrap_or_default();
    Ok(entry)
}

/// Create an entry with its products in one transaction.
///
/// Returns `Ok(None)` when the user already has an entry for that date.
pub async fn create_entry(pool: &PgPool, user_id: i64, new_entry: &NewEntry) -> Result<Option<SkincareEntry>> {
    let started = Instant::now();
    let span = observability::db_span("create_entry", "skincare_entries");

    let result: Result<Option<SkincareEntry>> = async {
        debug!(user_id, date = %new_entry.date, products = new_entry.products.len(), "Creating entry");
        let mut tx = pool.begin().await.context("Failed to start transaction")?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO skincare_entries (user_id, date, skin_condition, notes, analysis_result)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, date) DO NOTHING
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(user_id)
        .bind(new_entry.date)
        .bind(&new_entry.skin_condition)
        .bind(&new_entry.notes)
        .bind(&new_entry.analysis_result)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to insert entry")?;

        let Some(row) = inserted else {
            info!(user_id, date = %new_entry.date, "Entry already exists for date");
            return Ok(None);
        };

        let mut entry = entry_from_row(&row);
        insert_products(&mut tx, entry.id, &new_entry.products).await?;
        tx.commit().await.context("Failed to commit new entry")?;

        entry.products = new_entry.products.clone();
        debug!(entry_id = entry.id, "Entry created successfully");
        Ok(Some(entry))
    }
    .instrument(span)
    .await;

    finish("create_entry", started, result.is_ok());
    result
}

/// Read the entry a user logged on `date`
pub async fn read_entry_by_date(pool: &PgPool, user_id: i64, date: NaiveDate) -> Result<Option<SkincareEntry>> {
    debug!(user_id, %date, "Reading entry by date");

    let row = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM skincare_entries WHERE user_id = $1 AND date = $2"
    ))
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
    .context("Failed to read entry by date")?;

    match row {
        Some(row) => Ok(Some(with_products(pool, entry_from_row(&row)).await?)),
        None => Ok(None),
    }
}

/// Read one of the user's entries by ID
pub async fn read_entry(pool: &PgPool, user_id: i64, entry_id: i64) -> Result<Option<SkincareEntry>> {
    debug!(user_id, entry_id, "Reading entry");

    let row = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM skincare_entries WHERE id = $1 AND user_id = $2"
    ))
    .bind(entry_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read entry")?;

    match row {
        Some(row) => Ok(Some(with_products(pool, entry_from_row(&row)).await?)),
        None => Ok(None),
    }
}

/// Apply a partial update. Returns `false` when the entry does not exist
/// for this user.
pub async fn update_entry(pool: &PgPool, user_id: i64, entry_id: i64, changes: &EntryChanges) -> Result<bool> {
    let started = Instant::now();
    let span = observability::db_span("update_entry", "skincare_entries");

    let result: Result<bool> = async {
        let mut tx = pool.begin().await.context("Failed to start transaction")?;

        let updated = sqlx::query(
            "UPDATE skincare_entries SET
                skin_condition = COALESCE($1, skin_condition),
                notes = COALESCE($2, notes),
                analysis_result = COALESCE($3, analysis_result),
                updated_at = CURRENT_TIMESTAMP
             WHERE id = $4 AND user_id = $5",
        )
        .bind(&changes.skin_condition)
        .bind(&changes.notes)
        .bind(&changes.analysis_result)
        .bind(entry_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update entry")?;

        if updated.rows_affected() == 0 {
            info!("No entry found with ID: {entry_id}");
            return Ok(false);
        }

        if let Some(products) = &changes.products {
            let removed = sqlx::query("DELETE FROM product_usage WHERE entry_id = $1")
                .bind(entry_id)
                .execute(&mut *tx)
                .await
                .context("Failed to clear product usage")?;
            insert_products(&mut tx, entry_id, products).await?;
            debug!(
                entry_id,
                removed = removed.rows_affected(),
                inserted = products.len(),
                "Replaced entry products"
            );
        }

        tx.commit().await.context("Failed to commit entry update")?;
        Ok(true)
    }
    .instrument(span)
    .await;

    finish("update_entry", started, result.is_ok());
    result
}

/// Delete an entry; its products go with it through the cascade.
pub async fn delete_entry(pool: &PgPool, user_id: i64, entry_id: i64) -> Result<Option<DeletedEntry>> {
    debug!(user_id, entry_id, "Deleting entry");

    let row = sqlx::query("DELETE FROM skincare_entries WHERE id = $1 AND user_id = $2 RETURNING id, image_path")
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to delete entry")?;

    Ok(row.map(|row| DeletedEntry {
        id: row.get(0),
        image_path: row.get(1),
    }))
}

/// Point the entry at a stored photo. Returns `false` for an unknown entry.
pub async fn set_entry_image(pool: &PgPool, user_id: i64, entry_id: i64, image_path: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE skincare_entries SET image_path = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND user_id = $3",
    )
    .bind(image_path)
    .bind(entry_id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to set entry image")?;

    Ok(result.rows_affected() > 0)
}

/// Store an analysis summary on the entry for `date`, creating the entry
/// when the user has none for that day. Returns the entry ID.
pub async fn record_analysis_for_date(pool: &PgPool, user_id: i64, date: NaiveDate, summary: &str) -> Result<i64> {
    let started = Instant::now();
    let result = sqlx::query(
        "INSERT INTO skincare_entries (user_id, date, analysis_result) VALUES ($1, $2, $3)
         ON CONFLICT (user_id, date)
         DO UPDATE SET analysis_result = EXCLUDED.analysis_result, updated_at = CURRENT_TIMESTAMP
         RETURNING id",
    )
    .bind(user_id)
    .bind(date)
    .bind(summary)
    .fetch_one(pool)
    .await
    .context("Failed to record analysis for date");

    finish("record_analysis_for_date", started, result.is_ok());
    let entry_id: i64 = result?.get(0);
    debug!(user_id, %date, entry_id, "Analysis stored on entry");
    Ok(entry_id)
}

/// Keep the provider's raw JSON response
pub async fn archive_skin_analysis(pool: &PgPool, user_id: i64, raw_result: &str) -> Result<i64> {
    let row = sqlx::query("INSERT INTO skin_analyses (user_id, result) VALUES ($1, $2) RETURNING id")
        .bind(user_id)
        .bind(raw_result)
        .fetch_one(pool)
        .await
        .context("Failed to archive skin analysis")?;

    Ok(row.get(0))
}

/// Every entry of the user, for the calendar view, oldest first
pub async fn list_calendar_entries(pool: &PgPool, user_id: i64) -> Result<Vec<CalendarEntry>> {
    let rows = sqlx::query(
        "SELECT id, date, skin_condition, image_path IS NOT NULL FROM skincare_entries WHERE user_id = $1 ORDER BY date",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list calendar entries")?;

    Ok(rows
        .iter()
        .map(|row| CalendarEntry {
            id: row.get(0),
            date: row.get(1),
            skin_condition: row.get(2),
            has_image: row.get(3),
        })
        .collect())
}

/// Entries with `start <= date <= end`, products attached, in date order
pub async fn list_entries_in_range(
    pool: &PgPool,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<SkincareEntry>> {
    let started = Instant::now();
    let span = observability::db_span("list_entries_in_range", "skincare_entries");

    let result: Result<Vec<SkincareEntry>> = async {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM skincare_entries
             WHERE user_id = $1 AND date >= $2 AND date <= $3
             ORDER BY date"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
        .context("Failed to list entries in range")?;

        let mut entries: Vec<SkincareEntry> = rows.iter().map(entry_from_row).collect();
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        let mut products = load_products(pool, &ids).await?;
        for entry in &mut entries {
            entry.products = products.remove(&entry.id).unwrap_or_default();
        }
        Ok(entries)
    }
    .instrument(span)
    .await;

    finish("list_entries_in_range", started, result.is_ok());
    result
}

/// Dates the user logged on, up to and including `until`, newest first
pub async fn list_entry_dates(pool: &PgPool, user_id: i64, until: NaiveDate) -> Result<Vec<NaiveDate>> {
    let rows = sqlx::query("SELECT date FROM skincare_entries WHERE user_id = $1 AND date <= $2 ORDER BY date DESC")
        .bind(user_id)
        .bind(until)
        .fetch_all(pool)
        .await
        .context("Failed to list entry dates")?;

    Ok(rows.iter().map(|row| row.get(0)).collect())
}
