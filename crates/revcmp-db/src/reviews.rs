//! Database operations for the `reviews` table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use revcmp_core::{LabelCount, ReviewRecord, StoredReview, UNKNOWN_LABEL};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub brand: String,
    pub product: String,
    pub source: String,
    pub title: String,
    pub snippet: String,
    pub link: Option<String>,
    pub label: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl From<ReviewRow> for StoredReview {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            brand: row.brand,
            product: row.product,
            source: row.source,
            title: row.title,
            snippet: row.snippet,
            link: row.link,
            label: row.label,
            fetched_at: row.fetched_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert collected records in one transaction. Returns rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written then.
pub async fn insert_reviews(pool: &SqlitePool, records: &[ReviewRecord]) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0_u64;
    for record in records {
        let result = sqlx::query(
            "INSERT INTO reviews (brand, product, source, title, snippet, link, fetched_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.brand)
        .bind(&record.product)
        .bind(&record.source)
        .bind(&record.title)
        .bind(&record.snippet)
        .bind(&record.link)
        .bind(record.fetched_at)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }
    tx.commit().await?;

    tracing::debug!(written, "inserted reviews");
    Ok(written)
}

/// All reviews for `(brand, product)`, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_reviews(
    pool: &SqlitePool,
    brand: &str,
    product: &str,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT id, brand, product, source, title, snippet, link, label, fetched_at \
         FROM reviews \
         WHERE brand = ? AND product = ? \
         ORDER BY id",
    )
    .bind(brand)
    .bind(product)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Reviews for a product, optionally narrowed to one brand, ordered by brand then id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews(
    pool: &SqlitePool,
    product: &str,
    brand: Option<&str>,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = match brand {
        Some(brand) => fetch_reviews(pool, brand, product).await?,
        None => {
            sqlx::query_as::<_, ReviewRow>(
                "SELECT id, brand, product, source, title, snippet, link, label, fetched_at \
                 FROM reviews \
                 WHERE product = ? \
                 ORDER BY brand, id",
            )
            .bind(product)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

/// Set the sentiment label of one review.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_label(pool: &SqlitePool, id: i64, label: &str) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE reviews SET label = ? WHERE id = ?")
        .bind(label)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Delete every stored review. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_reviews(pool: &SqlitePool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM reviews").execute(pool).await?;
    tracing::info!(removed = result.rows_affected(), "cleared review cache");
    Ok(result.rows_affected())
}

/// Per-(brand, label) review counts for a product, restricted to `brands`
/// when non-empty. Unlabeled reviews are counted under [`UNKNOWN_LABEL`].
///
/// Ordered by brand then label.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn label_counts(
    pool: &SqlitePool,
    product: &str,
    brands: &[String],
) -> Result<Vec<LabelCount>, DbError> {
    let rows: Vec<(String, Option<String>, i64)> = sqlx::query_as(
        "SELECT brand, label, COUNT(*) \
         FROM reviews \
         WHERE product = ? \
         GROUP BY brand, label",
    )
    .bind(product)
    .fetch_all(pool)
    .await?;

    let mut grouped: BTreeMap<(String, String), usize> = BTreeMap::new();
    for (brand, label, count) in rows {
        if !brands.is_empty() && !brands.iter().any(|b| b == &brand) {
            continue;
        }
        let label = label.unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        *grouped.entry((brand, label)).or_default() += usize::try_from(count).unwrap_or(0);
    }

    Ok(grouped
        .into_iter()
        .map(|((brand, label), count)| LabelCount {
            brand,
            label,
            count,
        })
        .collect())
}
