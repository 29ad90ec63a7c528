use deadpool_postgres::Client;
use tokio_postgres::Row;

use crate::error::{AppError, Result};
use crate::models::cache::{AuditLogEntry, AuditOperation};

fn row_to_audit_entry(row: &Row) -> Result<AuditLogEntry> {
    let operation: String = row
        .try_get("operation")
        .map_err(|_| AppError::Storage("missing operation".to_string()))?;
    Ok(AuditLogEntry {
        id: row
            .try_get("id")
            .map_err(|_| AppError::Storage("missing id".to_string()))?,
        user_key_hash: row
            .try_get("user_key_hash")
            .map_err(|_| AppError::Storage("missing user_key_hash".to_string()))?,
        operation: AuditOperation::from_str(&operation)
            .ok_or_else(|| AppError::Storage(format!("unknown audit operation: {}", operation)))?,
        success: row
            .try_get("success")
            .map_err(|_| AppError::Storage("missing success".to_string()))?,
        error_message: row
            .try_get("error_message")
            .map_err(|_| AppError::Storage("missing error_message".to_string()))?,
        size_bytes: row
            .try_get("size_bytes")
            .map_err(|_| AppError::Storage("missing size_bytes".to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|_| AppError::Storage("missing created_at".to_string()))?,
    })
}

/// Appends one audit row. The table is append-only; nothing updates or
/// deletes these rows.
pub async fn record(
    client: &Client,
    user_key_hash: &str,
    operation: AuditOperation,
    success: bool,
    error_message: Option<&str>,
    size_bytes: Option<i64>,
) -> Result<()> {
    client
        .execute(
            r#"
            INSERT INTO cache_audit_log
                (user_key_hash, operation, success, error_message, size_bytes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
            &[
                &user_key_hash,
                &operation.as_str(),
                &success,
                &error_message,
                &size_bytes,
            ],
        )
        .await?;
    Ok(())
}

/// The most recent audit rows for one user hash, newest first.
pub async fn recent_for_user(
    client: &Client,
    user_key_hash: &str,
    limit: i64,
) -> Result<Vec<AuditLogEntry>> {
    let rows = client
        .query(
            r#"
            SELECT id, user_key_hash, operation, success, error_message, size_bytes, created_at
            FROM cache_audit_log
            WHERE user_key_hash = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            &[&user_key_hash, &limit],
        )
        .await?;
    rows.iter().map(row_to_audit_entry).collect()
}
