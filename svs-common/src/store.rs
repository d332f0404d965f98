//! Storage boundary for range tables and the audit log
//!
//! The engine never talks to a database directly. [`crate::db::SqliteStore`]
//! is the production backend; [`MemoryStore`] keeps everything in process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::audit::{calculate_pagination, AuditEntry, AuditPage, PAGE_SIZE};
use crate::normalize::Identifier;
use crate::range_table::RangeTable;
use crate::{Error, Result};

/// Persistence operations used by the import pipeline and the service
#[async_trait]
pub trait SerialStore: Send + Sync {
    /// Replace both persisted tables with `table` as one transaction
    ///
    /// On error the previously persisted contents must be intact.
    async fn replace_table(&self, table: &RangeTable) -> Result<()>;

    /// Load the persisted table, `None` if nothing was ever imported
    async fn load_table(&self, width: usize) -> Result<Option<RangeTable>>;

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// Newest-first audit page (1-indexed, clamped)
    async fn list_audit(&self, page: i64) -> Result<AuditPage>;
}

/// In-process store
///
/// Writes can be switched to fail, which is how callers exercise the
/// storage-failure path without a broken database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Option<RangeTable>>,
    audit: Mutex<Vec<AuditEntry>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("memory store is read-only".to_string()));
        }
        Ok(())
    }

    fn poisoned() -> Error {
        Error::Internal("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl SerialStore for MemoryStore {
    async fn replace_table(&self, table: &RangeTable) -> Result<()> {
        self.check_writable()?;
        *self.table.lock().map_err(|_| Self::poisoned())? = Some(table.clone());
        Ok(())
    }

    async fn load_table(&self, width: usize) -> Result<Option<RangeTable>> {
        let guard = self.table.lock().map_err(|_| Self::poisoned())?;
        match guard.as_ref() {
            Some(table) => {
                let stored = table
                    .ranges()
                    .iter()
                    .flat_map(|r| [&r.start, &r.end])
                    .chain(table.invalids());
                for id in stored {
                    Identifier::from_canonical(id.as_str(), width)?;
                }
                Ok(Some(table.clone()))
            }
            None => Ok(None),
        }
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.check_writable()?;
        self.audit
            .lock()
            .map_err(|_| Self::poisoned())?
            .push(entry.clone());
        Ok(())
    }

    async fn list_audit(&self, page: i64) -> Result<AuditPage> {
        let audit = self.audit.lock().map_err(|_| Self::poisoned())?;
        let total = audit.len() as i64;
        let pagination = calculate_pagination(total, page);

        let entries = audit
            .iter()
            .rev()
            .skip(pagination.offset as usize)
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect();

        Ok(AuditPage {
            page: pagination.page,
            page_size: PAGE_SIZE,
            total_pages: pagination.total_pages,
            total_entries: total,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::range_table::SerialRange;
    use std::collections::HashSet;

    fn table(normalizer: &Normalizer, ranges: &[(&str, &str)], invalids: &[&str]) -> RangeTable {
        let ranges = ranges
            .iter()
            .map(|(start, end)| SerialRange {
                reference: "R".to_string(),
                description: "batch".to_string(),
                start: normalizer.normalize(start).unwrap(),
                end: normalizer.normalize(end).unwrap(),
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .collect();
        let invalids: HashSet<_> = invalids.iter().map(|s| normalizer.normalize(s).unwrap()).collect();
        RangeTable::build(ranges, invalids, 1).unwrap()
    }

    #[tokio::test]
    async fn test_load_revalidates_invalid_identifiers() {
        let store = MemoryStore::new();
        store
            .replace_table(&table(&Normalizer::default(), &[], &["AA7"]))
            .await
            .unwrap();

        assert!(store.load_table(30).await.unwrap().is_some());
        assert!(store.load_table(20).await.is_err());
    }

    #[tokio::test]
    async fn test_load_revalidates_range_ends() {
        let store = MemoryStore::new();
        let narrow = Normalizer::new(10, Default::default());
        store
            .replace_table(&table(&narrow, &[("AA1", "AA9")], &[]))
            .await
            .unwrap();

        assert!(store.load_table(10).await.unwrap().is_some());
        assert!(store.load_table(30).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_writes_keep_previous_table() {
        let store = MemoryStore::new();
        let normalizer = Normalizer::default();
        store.replace_table(&table(&normalizer, &[("AA1", "AA9")], &[])).await.unwrap();

        store.set_fail_writes(true);
        let err = store
            .replace_table(&table(&normalizer, &[("BB1", "BB9")], &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        let loaded = store.load_table(30).await.unwrap().unwrap();
        assert_eq!(loaded.ranges()[0].start, normalizer.normalize("AA1").unwrap());
    }
}
