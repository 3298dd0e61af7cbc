//! Image persistence
//!
//! SQLite storage for image records and their original bytes, keyed by id.
//! The store is a durable mirror of the in-memory registry: it is written on
//! ingestion and after each batch, and read back in full at startup.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::types::{ImageRecord, ProcessingStatus};

/// Repository for image record persistence
pub struct ImageStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ImageStore<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All persisted records in ingestion order, without their bytes
    pub async fn get_all(&self) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, file_name, mime_type, status, extracted_code, found, created_at
            FROM images
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_record()).collect()
    }

    /// Persist a freshly ingested record together with its bytes
    pub async fn insert(&self, record: &ImageRecord, bytes: &[u8]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO images (id, file_name, mime_type, data, status, extracted_code, found, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.file_name)
        .bind(&record.mime_type)
        .bind(bytes)
        .bind(record.status.as_str())
        .bind(&record.extracted_code)
        .bind(record.found as i64)
        .bind(record.created_at.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Original file bytes for a record
    pub async fn get_bytes(&self, id: Uuid) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT data FROM images WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|(data,)| data))
    }

    /// Write back a record's status, extracted code and found flag
    pub async fn update_result(&self, record: &ImageRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE images
            SET status = ?, extracted_code = ?, found = ?
            WHERE id = ?
            "#,
        )
        .bind(record.status.as_str())
        .bind(&record.extracted_code)
        .bind(record.found as i64)
        .bind(record.id.to_string())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete every record; returns how many were removed
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM images").execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    id: String,
    file_name: String,
    mime_type: String,
    status: String,
    extracted_code: Option<String>,
    found: i64,
    created_at: String,
}

impl ImageRow {
    fn into_record(self) -> Result<ImageRecord> {
        let id = Uuid::parse_str(&self.id)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)?.with_timezone(&Utc);

        Ok(ImageRecord {
            id,
            file_name: self.file_name,
            mime_type: self.mime_type,
            status: ProcessingStatus::parse(&self.status),
            extracted_code: self.extracted_code,
            found: self.found != 0,
            created_at,
        })
    }
}
