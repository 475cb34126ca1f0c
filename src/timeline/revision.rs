// Revision: a changeset token with a resolved push timestamp

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Seconds since the Unix epoch
pub type Timestamp = i64;

/// A source-control changeset placed on the timeline
///
/// Two relations are kept apart on purpose:
/// - node identity (`same_node`) compares the opaque tokens
/// - chronology (`cmp_time`, `is_before`, `is_after`) compares timestamps
///
/// Distinct changesets may share a timestamp, so neither relation can stand
/// in for the other. The derived `PartialEq` is plain structural equality
/// over both fields.
///
/// # Example
/// ```
/// use perfdigest::timeline::Revision;
///
/// let a = Revision::new("8a3b2c1d0e9f", 100);
/// let b = Revision::new("0f1e2d3c4b5a", 100);
/// assert!(a.same_time(&b));
/// assert!(!a.same_node(&b));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    node: String,
    timestamp: Timestamp,
}

impl Revision {
    pub fn new(node: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            node: node.into(),
            timestamp,
        }
    }

    /// Opaque changeset token
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Identity: true iff both revisions are the same changeset
    pub fn same_node(&self, other: &Revision) -> bool {
        self.node == other.node
    }

    /// Chronological comparison, ignoring identity
    pub fn cmp_time(&self, other: &Revision) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }

    pub fn is_before(&self, other: &Revision) -> bool {
        self.cmp_time(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Revision) -> bool {
        self.cmp_time(other) == Ordering::Greater
    }

    pub fn same_time(&self, other: &Revision) -> bool {
        self.cmp_time(other) == Ordering::Equal
    }

    /// UTC rendering of the timestamp (`%Y-%m-%d %H:%M:%S`)
    pub fn datetime(&self) -> String {
        match DateTime::from_timestamp(self.timestamp, 0) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format!("@{}", self.timestamp),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node)
    }
}
