//! Publication point for the current range table
//!
//! Readers take an `Arc` to whatever table is current and scan it without any
//! lock. The import pipeline is the only writer; it swaps in a fully built
//! table in one atomic store. A reader that loaded the previous table keeps it
//! alive until it drops its `Arc`.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::range_table::RangeTable;

/// Shared handle to the current [`RangeTable`]
#[derive(Clone)]
pub struct SnapshotCell {
    current: Arc<ArcSwap<RangeTable>>,
}

impl SnapshotCell {
    pub fn new(initial: RangeTable) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Take a reference to the current table
    pub fn load(&self) -> Arc<RangeTable> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Replace the current table, returning the one it displaced
    pub(crate) fn publish(&self, table: RangeTable) -> Arc<RangeTable> {
        self.current.swap(Arc::new(table))
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new(RangeTable::empty())
    }
}

impl fmt::Debug for SnapshotCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.current.load();
        f.debug_struct("SnapshotCell")
            .field("version", &table.version())
            .field("ranges", &table.range_count())
            .field("invalids", &table.invalid_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    fn table(version: u64) -> RangeTable {
        RangeTable::build(Vec::new(), HashSet::new(), version).unwrap()
    }

    #[test]
    fn test_publish_replaces_current() {
        let cell = SnapshotCell::new(table(1));
        let previous = cell.publish(table(2));
        assert_eq!(previous.version(), 1);
        assert_eq!(cell.version(), 2);
    }

    #[test]
    fn test_reader_keeps_old_table_alive() {
        let cell = SnapshotCell::new(table(1));
        let held = cell.load();
        cell.publish(table(2));
        assert_eq!(held.version(), 1);
        assert_eq!(cell.load().version(), 2);
    }

    #[test]
    fn test_clones_share_publication() {
        let cell = SnapshotCell::default();
        let other = cell.clone();
        cell.publish(table(7));
        assert_eq!(other.version(), 7);
    }

    #[test]
    fn test_concurrent_readers_see_monotonic_versions() {
        let cell = SnapshotCell::new(table(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..10_000 {
                        let v = cell.load().version();
                        assert!(v >= last, "version went backwards: {} < {}", v, last);
                        last = v;
                    }
                })
            })
            .collect();

        for v in 1..=100 {
            cell.publish(table(v));
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cell.version(), 100);
    }
}
