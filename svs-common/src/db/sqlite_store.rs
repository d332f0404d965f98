//! SQLite-backed [`SerialStore`]

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};

use super::retry::retry_on_lock;
use super::settings::{get_setting, set_setting, TABLE_VERSION_KEY};
use crate::audit::{calculate_pagination, AuditEntry, AuditPage, PAGE_SIZE};
use crate::classifier::Status;
use crate::normalize::Identifier;
use crate::range_table::{RangeTable, SerialRange};
use crate::store::SerialStore;
use crate::{Error, Result};

/// Production store on a shared SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// One attempt at replacing the persisted table
    ///
    /// The transaction rolls back when dropped uncommitted, so an error or a
    /// cancelled future leaves the previous contents in place.
    async fn write_table(&self, table: &RangeTable) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM serials").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM invalids").execute(&mut *tx).await?;

        for (position, range) in table.ranges().iter().enumerate() {
            sqlx::query(
                "INSERT INTO serials (position, ref_number, description, start_serial, end_serial, date)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(position as i64)
            .bind(&range.reference)
            .bind(&range.description)
            .bind(range.start.as_str())
            .bind(range.end.as_str())
            .bind(range.date)
            .execute(&mut *tx)
            .await?;
        }

        for id in table.invalids() {
            sqlx::query("INSERT OR IGNORE INTO invalids (invalid_serial) VALUES (?)")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        set_setting(&mut *tx, TABLE_VERSION_KEY, table.version()).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn write_audit(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO messages (status, sender, normalized_message, detail, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.status.as_str())
        .bind(&entry.sender)
        .bind(&entry.normalized_message)
        .bind(&entry.detail)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SerialStore for SqliteStore {
    async fn replace_table(&self, table: &RangeTable) -> Result<()> {
        retry_on_lock("replace_table", self.max_lock_wait_ms, || {
            self.write_table(table)
        })
        .await?;

        tracing::debug!(
            version = table.version(),
            ranges = table.range_count(),
            invalids = table.invalid_count(),
            "Range table persisted"
        );
        Ok(())
    }

    async fn load_table(&self, width: usize) -> Result<Option<RangeTable>> {
        let version: Option<u64> = get_setting(&self.pool, TABLE_VERSION_KEY).await?;
        let Some(version) = version else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT ref_number, description, start_serial, end_serial, date
             FROM serials ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ranges = Vec::with_capacity(rows.len());
        for row in rows {
            let start: String = row.try_get("start_serial")?;
            let end: String = row.try_get("end_serial")?;
            let date: NaiveDate = row.try_get("date")?;
            ranges.push(SerialRange {
                reference: row.try_get("ref_number")?,
                description: row.try_get("description")?,
                start: Identifier::from_canonical(&start, width)?,
                end: Identifier::from_canonical(&end, width)?,
                date,
            });
        }

        let stored: Vec<String> = sqlx::query_scalar("SELECT invalid_serial FROM invalids")
            .fetch_all(&self.pool)
            .await?;
        let invalids = stored
            .iter()
            .map(|s| Identifier::from_canonical(s, width))
            .collect::<Result<HashSet<_>>>()?;

        RangeTable::build(ranges, invalids, version).map(Some)
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        retry_on_lock("append_audit", self.max_lock_wait_ms, || {
            self.write_audit(entry)
        })
        .await
    }

    async fn list_audit(&self, page: i64) -> Result<AuditPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        let pagination = calculate_pagination(total, page);

        let rows = sqlx::query(
            "SELECT status, sender, normalized_message, detail, created_at
             FROM messages ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(PAGE_SIZE)
        .bind(pagination.offset)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.try_get("status")?;
            let created_at: String = row.try_get("created_at")?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
                .with_timezone(&Utc);

            entries.push(AuditEntry {
                status: status.parse::<Status>()?,
                sender: row.try_get("sender")?,
                normalized_message: row.try_get("normalized_message")?,
                detail: row.try_get("detail")?,
                created_at,
            });
        }

        Ok(AuditPage {
            page: pagination.page,
            page_size: PAGE_SIZE,
            total_pages: pagination.total_pages,
            total_entries: total,
            entries,
        })
    }
}
