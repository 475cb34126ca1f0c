//! JSON output format for digests

use crate::digest::TestDigest;
use crate::timeline::Interval;
use serde::{Deserialize, Serialize};

/// A record left out of a test's timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSkippedRecord {
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Human-readable reason
    pub reason: String,
}

/// One test's consolidated timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTestDigest {
    pub test: String,
    pub records_consumed: usize,
    pub ranges_produced: usize,
    pub intervals: Vec<Interval>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub skipped: Vec<JsonSkippedRecord>,
}

impl From<&TestDigest> for JsonTestDigest {
    fn from(digest: &TestDigest) -> Self {
        Self {
            test: digest.test.clone(),
            records_consumed: digest.records_consumed,
            ranges_produced: digest.ranges_produced(),
            intervals: digest.intervals.clone(),
            skipped: digest
                .skipped
                .iter()
                .map(|record| JsonSkippedRecord {
                    platform: record.platform.clone(),
                    subject: record.subject.clone(),
                    reason: record.reason.to_string(),
                })
                .collect(),
        }
    }
}

/// Complete JSON document for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDigestOutput {
    /// perfdigest version
    pub version: String,
    /// Format version identifier
    pub format: String,
    /// Date range as given on the command line
    pub date_range: String,
    pub tests: Vec<JsonTestDigest>,
}

impl JsonDigestOutput {
    pub fn new(date_range: &str) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "perfdigest-json-v1".to_string(),
            date_range: date_range.to_string(),
            tests: Vec::new(),
        }
    }

    pub fn add_test(&mut self, digest: &TestDigest) {
        self.tests.push(JsonTestDigest::from(digest));
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
