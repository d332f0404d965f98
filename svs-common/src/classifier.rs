//! Three-way serial classification
//!
//! Composes the [`Normalizer`] with the currently published [`RangeTable`].
//! Classification never fails for user input; the worst outcome is
//! [`Status::NotFound`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::normalize::{Identifier, Normalizer};
use crate::range_table::{MatchResult, SerialRange};
use crate::snapshot::SnapshotCell;
use crate::Error;

/// Detail recorded when the input cannot be normalized
pub const MALFORMED_DETAIL: &str = "malformed input";

/// Classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Valid,
    Invalid,
    NotFound,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Valid => "VALID",
            Status::Invalid => "INVALID",
            Status::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALID" => Ok(Status::Valid),
            "INVALID" => Ok(Status::Invalid),
            "NOT_FOUND" => Ok(Status::NotFound),
            other => Err(Error::InvalidInput(format!("unknown status '{}'", other))),
        }
    }
}

/// Explainable classification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub status: Status,
    pub detail: String,
    /// Canonical form of the input; `None` when normalization failed
    pub identifier: Option<Identifier>,
    pub matched_range: Option<SerialRange>,
}

impl Verdict {
    fn malformed() -> Self {
        Self {
            status: Status::NotFound,
            detail: MALFORMED_DETAIL.to_string(),
            identifier: None,
            matched_range: None,
        }
    }

    /// Text sent back to whoever submitted the serial
    pub fn reply_text(&self) -> String {
        let Some(id) = &self.identifier else {
            return "Serial number could not be read.".to_string();
        };

        match (self.status, &self.matched_range) {
            (Status::Valid, Some(range)) => {
                format!("Serial number {} is valid: {}", id, range.description)
            }
            (Status::Invalid, _) => format!("Serial number {} is registered as invalid.", id),
            _ => format!("Serial number {} is invalid.", id),
        }
    }
}

/// Classifies raw submissions against the current snapshot
#[derive(Debug, Clone)]
pub struct Classifier {
    normalizer: Arc<Normalizer>,
    snapshot: SnapshotCell,
}

impl Classifier {
    pub fn new(normalizer: Arc<Normalizer>, snapshot: SnapshotCell) -> Self {
        Self {
            normalizer,
            snapshot,
        }
    }

    pub fn normalizer(&self) -> &Arc<Normalizer> {
        &self.normalizer
    }

    pub fn snapshot(&self) -> &SnapshotCell {
        &self.snapshot
    }

    /// Normalize and classify raw user input
    pub fn classify(&self, raw: &str) -> Verdict {
        match self.normalizer.normalize(raw) {
            Ok(id) => self.classify_identifier(id),
            Err(e) => {
                tracing::debug!(error = %e, "Submission could not be normalized");
                Verdict::malformed()
            }
        }
    }

    /// Classify an already canonical identifier
    pub fn classify_identifier(&self, id: Identifier) -> Verdict {
        let table = self.snapshot.load();

        let (status, detail, matched_range) = match table.lookup(&id) {
            MatchResult::InvalidMatch => (
                Status::Invalid,
                "registered on the invalid list".to_string(),
                None,
            ),
            MatchResult::RangeMatch(range) => (
                Status::Valid,
                format!("{} (ref {})", range.description, range.reference),
                Some(range.clone()),
            ),
            MatchResult::NoMatch => (Status::NotFound, "no matching serial range".to_string(), None),
        };

        Verdict {
            status,
            detail,
            identifier: Some(id),
            matched_range,
        }
    }
}
