//! Serial range table snapshots
//!
//! A [`RangeTable`] is immutable once built. Imports build a fresh table and
//! publish it through [`crate::snapshot::SnapshotCell`]; nothing edits a
//! published table in place.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::normalize::Identifier;
use crate::{Error, Result};

/// Inclusive interval of canonical identifiers with its descriptive metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialRange {
    pub reference: String,
    pub description: String,
    pub start: Identifier,
    pub end: Identifier,
    pub date: NaiveDate,
}

impl SerialRange {
    /// `start <= id <= end` in canonical string order
    pub fn contains(&self, id: &Identifier) -> bool {
        &self.start <= id && id <= &self.end
    }

    /// A reversed range can never contain anything
    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }
}

/// Outcome of a table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult<'a> {
    NoMatch,
    RangeMatch(&'a SerialRange),
    InvalidMatch,
}

/// Published set of serial ranges and known-invalid identifiers
#[derive(Debug, Clone, Default)]
pub struct RangeTable {
    version: u64,
    ranges: Vec<SerialRange>,
    invalids: HashSet<Identifier>,
}

impl RangeTable {
    /// Empty table, version 0
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from validated ranges (kept in import order) and the
    /// invalid set
    ///
    /// Every range must carry a non-blank reference and description; any
    /// violation rejects the whole batch.
    pub fn build(
        ranges: Vec<SerialRange>,
        invalids: HashSet<Identifier>,
        version: u64,
    ) -> Result<Self> {
        let missing: Vec<String> = ranges
            .iter()
            .enumerate()
            .flat_map(|(i, range)| {
                let mut blank = Vec::new();
                if range.reference.trim().is_empty() {
                    blank.push(format!("Reference Number (range {})", i + 1));
                }
                if range.description.trim().is_empty() {
                    blank.push(format!("Description (range {})", i + 1));
                }
                blank
            })
            .collect();

        if !missing.is_empty() {
            return Err(Error::StructuralImport {
                sheet: "ranges".to_string(),
                missing,
            });
        }

        Ok(Self {
            version,
            ranges,
            invalids,
        })
    }

    /// Classify a canonical identifier against this table
    ///
    /// Invalid-list membership wins over any range. Among overlapping ranges
    /// the first one in import order is returned.
    pub fn lookup(&self, id: &Identifier) -> MatchResult<'_> {
        if self.invalids.contains(id) {
            return MatchResult::InvalidMatch;
        }

        self.ranges
            .iter()
            .find(|range| range.contains(id))
            .map_or(MatchResult::NoMatch, MatchResult::RangeMatch)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn ranges(&self) -> &[SerialRange] {
        &self.ranges
    }

    pub fn invalids(&self) -> &HashSet<Identifier> {
        &self.invalids
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn id(raw: &str) -> Identifier {
        Normalizer::default().normalize(raw).unwrap()
    }

    fn range(reference: &str, description: &str, start: &str, end: &str) -> SerialRange {
        SerialRange {
            reference: reference.to_string(),
            description: description.to_string(),
            start: id(start),
            end: id(end),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_lookup_inside_range() {
        let table = RangeTable::build(vec![range("R1", "batch one", "AA1", "AA100")], HashSet::new(), 1)
            .unwrap();

        match table.lookup(&id("aa50")) {
            MatchResult::RangeMatch(r) => assert_eq!(r.description, "batch one"),
            other => panic!("expected range match, got {:?}", other),
        }
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let table = RangeTable::build(vec![range("R1", "d", "AA1", "AA100")], HashSet::new(), 1)
            .unwrap();

        assert!(matches!(table.lookup(&id("AA1")), MatchResult::RangeMatch(_)));
        assert!(matches!(table.lookup(&id("AA100")), MatchResult::RangeMatch(_)));
        assert_eq!(table.lookup(&id("AA101")), MatchResult::NoMatch);
        assert_eq!(table.lookup(&id("AA0")), MatchResult::NoMatch);
    }

    #[test]
    fn test_numeric_order_holds_across_digit_counts() {
        // 9 < 10 numerically; zero padding keeps that true for strings
        let table = RangeTable::build(vec![range("R1", "d", "AA9", "AA10")], HashSet::new(), 1)
            .unwrap();
        assert!(matches!(table.lookup(&id("AA9")), MatchResult::RangeMatch(_)));
        assert!(matches!(table.lookup(&id("AA10")), MatchResult::RangeMatch(_)));
    }

    #[test]
    fn test_different_alpha_prefix_does_not_match() {
        let table = RangeTable::build(vec![range("R1", "d", "AA1", "AA100")], HashSet::new(), 1)
            .unwrap();
        assert_eq!(table.lookup(&id("AB50")), MatchResult::NoMatch);
    }

    #[test]
    fn test_invalid_list_takes_precedence() {
        let invalids: HashSet<_> = [id("aa50")].into_iter().collect();
        let table =
            RangeTable::build(vec![range("R1", "d", "AA1", "AA100")], invalids, 1).unwrap();

        assert_eq!(table.lookup(&id("aa50")), MatchResult::InvalidMatch);
        assert!(matches!(table.lookup(&id("aa51")), MatchResult::RangeMatch(_)));
    }

    #[test]
    fn test_invalid_outside_any_range() {
        let invalids: HashSet<_> = [id("zz1")].into_iter().collect();
        let table = RangeTable::build(Vec::new(), invalids, 1).unwrap();
        assert_eq!(table.lookup(&id("zz1")), MatchResult::InvalidMatch);
    }

    #[test]
    fn test_overlap_first_in_import_order_wins() {
        let table = RangeTable::build(
            vec![
                range("A", "range A", "AA1", "AA60"),
                range("B", "range B", "AA40", "AA100"),
            ],
            HashSet::new(),
            1,
        )
        .unwrap();

        match table.lookup(&id("AA50")) {
            MatchResult::RangeMatch(r) => assert_eq!(r.reference, "A"),
            other => panic!("expected range A, got {:?}", other),
        }
        match table.lookup(&id("AA70")) {
            MatchResult::RangeMatch(r) => assert_eq!(r.reference, "B"),
            other => panic!("expected range B, got {:?}", other),
        }
    }

    #[test]
    fn test_reversed_range_never_matches() {
        let reversed = range("R", "d", "AA100", "AA1");
        assert!(reversed.is_reversed());
        let table = RangeTable::build(vec![reversed], HashSet::new(), 1).unwrap();
        assert_eq!(table.lookup(&id("AA50")), MatchResult::NoMatch);
    }

    #[test]
    fn test_blank_reference_rejects_whole_batch() {
        let err = RangeTable::build(
            vec![range("R1", "ok", "AA1", "AA2"), range(" ", "d", "AA3", "AA4")],
            HashSet::new(),
            1,
        )
        .unwrap_err();

        match err {
            Error::StructuralImport { missing, .. } => {
                assert_eq!(missing, vec!["Reference Number (range 2)".to_string()]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_empty_table() {
        let table = RangeTable::empty();
        assert_eq!(table.version(), 0);
        assert_eq!(table.lookup(&id("AA1")), MatchResult::NoMatch);
    }
}
