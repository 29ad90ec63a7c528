use chrono::{DateTime, Utc};
use deadpool_postgres::Client;
use tokio_postgres::Row;

use crate::error::{AppError, Result};
use crate::models::cache::CacheEntry;

/// A helper function to map a `tokio_postgres::Row` to a `CacheEntry`.
fn row_to_entry(row: &Row) -> Result<CacheEntry> {
    Ok(CacheEntry {
        user_key_hash: row
            .try_get("user_key_hash")
            .map_err(|_| AppError::Storage("missing user_key_hash".to_string()))?,
        payload_ciphertext: row
            .try_get("payload_ciphertext")
            .map_err(|_| AppError::Storage("missing payload_ciphertext".to_string()))?,
        nonce: row
            .try_get("nonce")
            .map_err(|_| AppError::Storage("missing nonce".to_string()))?,
        auth_tag: row
            .try_get("auth_tag")
            .map_err(|_| AppError::Storage("missing auth_tag".to_string()))?,
        cached_at: row
            .try_get("cached_at")
            .map_err(|_| AppError::Storage("missing cached_at".to_string()))?,
        expires_at: row
            .try_get("expires_at")
            .map_err(|_| AppError::Storage("missing expires_at".to_string()))?,
        last_accessed_at: row
            .try_get("last_accessed_at")
            .map_err(|_| AppError::Storage("missing last_accessed_at".to_string()))?,
        size_bytes: row
            .try_get("size_bytes")
            .map_err(|_| AppError::Storage("missing size_bytes".to_string()))?,
        schema_version: row
            .try_get("schema_version")
            .map_err(|_| AppError::Storage("missing schema_version".to_string()))?,
    })
}

/// Replaces any existing row for the entry's hash in one transaction.
///
/// Delete-then-insert rather than upsert-merge: stale partial data must
/// never survive alongside a fresh snapshot.
pub async fn replace_entry(client: &mut Client, entry: &CacheEntry) -> Result<()> {
    let tx = client.transaction().await?;

    tx.execute(
        "DELETE FROM financial_cache WHERE user_key_hash = $1",
        &[&entry.user_key_hash],
    )
    .await?;

    tx.execute(
        r#"
        INSERT INTO financial_cache
            (user_key_hash, payload_ciphertext, nonce, auth_tag,
             cached_at, expires_at, last_accessed_at, size_bytes, schema_version)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
        &[
            &entry.user_key_hash,
            &entry.payload_ciphertext,
            &entry.nonce,
            &entry.auth_tag,
            &entry.cached_at,
            &entry.expires_at,
            &entry.last_accessed_at,
            &entry.size_bytes,
            &entry.schema_version,
        ],
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Finds the non-expired row for a hash; expired rows are never returned
/// even while physically present.
pub async fn find_valid(
    client: &Client,
    user_key_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<CacheEntry>> {
    let row = client
        .query_opt(
            r#"
            SELECT user_key_hash, payload_ciphertext, nonce, auth_tag,
                   cached_at, expires_at, last_accessed_at, size_bytes, schema_version
            FROM financial_cache
            WHERE user_key_hash = $1 AND expires_at > $2
            "#,
            &[&user_key_hash, &now],
        )
        .await?;
    row.map(|r| row_to_entry(&r)).transpose()
}

/// Stamps the row's last access time.
pub async fn touch_last_accessed(client: &Client, user_key_hash: &str) -> Result<()> {
    client
        .execute(
            "UPDATE financial_cache SET last_accessed_at = NOW() WHERE user_key_hash = $1",
            &[&user_key_hash],
        )
        .await?;
    Ok(())
}

/// Deletes the row for a hash regardless of expiry; returns rows removed.
pub async fn delete_entry(client: &Client, user_key_hash: &str) -> Result<u64> {
    let deleted = client
        .execute(
            "DELETE FROM financial_cache WHERE user_key_hash = $1",
            &[&user_key_hash],
        )
        .await?;
    Ok(deleted)
}

/// Bulk-deletes every expired row; returns rows removed.
pub async fn delete_expired(client: &Client, now: DateTime<Utc>) -> Result<u64> {
    let deleted = client
        .execute(
            "DELETE FROM financial_cache WHERE expires_at <= $1",
            &[&now],
        )
        .await?;
    Ok(deleted)
}

/// The expiry timestamp of a row, if one exists (expired or not).
pub async fn entry_expiry(
    client: &Client,
    user_key_hash: &str,
) -> Result<Option<DateTime<Utc>>> {
    let row = client
        .query_opt(
            "SELECT expires_at FROM financial_cache WHERE user_key_hash = $1",
            &[&user_key_hash],
        )
        .await?;
    row.map(|r| {
        r.try_get("expires_at")
            .map_err(|_| AppError::Storage("missing expires_at".to_string()))
    })
    .transpose()
}

/// Total and still-valid row counts, for the operational status report.
pub async fn row_counts(client: &Client, now: DateTime<Utc>) -> Result<(i64, i64)> {
    let row = client
        .query_one(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE expires_at > $1) AS valid
            FROM financial_cache
            "#,
            &[&now],
        )
        .await?;
    let total: i64 = row
        .try_get("total")
        .map_err(|_| AppError::Storage("missing total".to_string()))?;
    let valid: i64 = row
        .try_get("valid")
        .map_err(|_| AppError::Storage("missing valid".to_string()))?;
    Ok((total, valid))
}
