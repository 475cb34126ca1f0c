//! Per-test digest: notifications in, consolidated timeline out
//!
//! For every message the classifier matches, the digester extracts the
//! notification, resolves its changeset range and folds the resulting
//! interval into the test's partition. A record that fails at any step is
//! noted and skipped; the remaining records are still processed.

use crate::notification::{ClassifyError, DateRange, MailMessage, Mailbox, MessageClassifier};
use crate::resolver::{ResolveError, RevisionResolver};
use crate::timeline::{ConflictPolicy, DeltaSet, Interval, IntervalPartition, TimelineError};
use thiserror::Error;

/// Why a matched record did not make it into the timeline
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("{0}")]
    Classify(#[from] ClassifyError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Timeline(#[from] TimelineError),

    #[error("changeset range covers a single changeset")]
    SingleChangeset,
}

/// A matched record left out of the timeline
#[derive(Debug)]
pub struct SkippedRecord {
    pub platform: String,
    pub subject: Option<String>,
    pub reason: SkipReason,
}

/// Result of digesting one test
#[derive(Debug)]
pub struct TestDigest {
    pub test: String,
    pub intervals: Vec<Interval>,
    pub records_consumed: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl TestDigest {
    pub fn ranges_produced(&self) -> usize {
        self.intervals.len()
    }

    /// Platforms with a delta anywhere in the timeline, sorted
    pub fn platforms(&self) -> Vec<&str> {
        let mut platforms: Vec<&str> = self
            .intervals
            .iter()
            .flat_map(|interval| interval.deltas.platforms())
            .collect();
        platforms.sort_unstable();
        platforms.dedup();
        platforms
    }
}

/// Builds test digests, sharing one resolver across tests
pub struct Digester<R> {
    resolver: R,
    policy: ConflictPolicy,
}

impl<R: RevisionResolver> Digester<R> {
    pub fn new(resolver: R, policy: ConflictPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    pub fn into_resolver(self) -> R {
        self.resolver
    }

    /// Digest the messages of `mailbox` that `classifier` matches within `range`
    pub fn digest_test(
        &mut self,
        test: &str,
        mailbox: &Mailbox,
        range: &DateRange,
        classifier: &MessageClassifier,
    ) -> TestDigest {
        let mut partition = IntervalPartition::with_policy(self.policy);
        let mut records_consumed = 0;
        let mut skipped = Vec::new();

        for msg in mailbox.messages() {
            let Some(platform) = classifier.classify(msg, range) else {
                continue;
            };
            records_consumed += 1;

            if let Err(reason) = self.fold_record(&mut partition, classifier, msg, &platform) {
                tracing::warn!("{}: skipping {} notification: {}", test, platform, reason);
                skipped.push(SkippedRecord {
                    platform,
                    subject: msg.header("Subject").map(str::to_string),
                    reason,
                });
            }
        }

        if let Err(e) = partition.check_invariant() {
            tracing::error!("{}: timeline invariant violated: {}", test, e);
        }

        let intervals = partition.consolidate();
        tracing::info!(
            "{}: {} records consumed, {} ranges produced, {} skipped",
            test,
            records_consumed,
            intervals.len(),
            skipped.len()
        );

        TestDigest {
            test: test.to_string(),
            intervals,
            records_consumed,
            skipped,
        }
    }

    fn fold_record(
        &mut self,
        partition: &mut IntervalPartition,
        classifier: &MessageClassifier,
        msg: &MailMessage,
        platform: &str,
    ) -> Result<(), SkipReason> {
        let notification = classifier
            .extract(msg, platform)?
            .ok_or(SkipReason::SingleChangeset)?;

        let (from, to) = self
            .resolver
            .resolve(&notification.from_token, &notification.to_token)?;
        let interval = Interval::new(
            from,
            to,
            DeltaSet::single(notification.platform, notification.delta),
        );
        partition.insert(interval)?;
        Ok(())
    }
}

/// Report file name for a test: `Ts, Paint` → `ts-paint.html`
pub fn report_filename(test: &str) -> String {
    let stem: String = test
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')'))
        .map(|c| if c == ' ' { '-' } else { c })
        .collect();
    format!("{}.html", stem)
}
