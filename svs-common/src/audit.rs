//! Audit log of classified messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{Status, Verdict};

/// Entries per audit page
pub const PAGE_SIZE: i64 = 100;

/// One processed inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub status: Status,
    pub sender: String,
    /// Canonical identifier, or the raw text when it could not be normalized
    pub normalized_message: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn from_verdict(sender: &str, raw_message: &str, verdict: &Verdict) -> Self {
        let normalized_message = match &verdict.identifier {
            Some(id) => id.to_string(),
            None => raw_message.trim().to_string(),
        };

        Self {
            status: verdict.status,
            sender: sender.to_string(),
            normalized_message,
            detail: verdict.detail.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Newest-first page of audit entries
#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_entries: i64,
    pub entries: Vec<AuditEntry>,
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Clamp the requested page into `[1, total_pages]` and compute its offset
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * PAGE_SIZE;

    Pagination {
        page,
        total_pages,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 2);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_out_of_bounds_high() {
        let p = calculate_pagination(150, 99);
        assert_eq!(p.page, 2);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(150, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_entry_from_malformed_verdict_keeps_raw_text() {
        let verdict = Verdict {
            status: Status::NotFound,
            detail: "malformed input".to_string(),
            identifier: None,
            matched_range: None,
        };
        let entry = AuditEntry::from_verdict("0912", "  abc  ", &verdict);
        assert_eq!(entry.normalized_message, "abc");
        assert_eq!(entry.status, Status::NotFound);
    }
}
