//! Message classifier for performance-regression notification e-mails
//!
//! Reads an mbox file, picks the messages that report a change for one test
//! on a known platform within a date range, and extracts the changeset range
//! and signed percentage they carry.

use crate::config::DigestConfig;
use crate::timeline::{Delta, Sign};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors extracting a notification from a matched message
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("unparseable date header: {0}")]
    BadDate(String),

    #[error("subject carries no percentage change: {0}")]
    NoPercentage(String),

    #[error("invalid percentage {0}")]
    BadAmount(String),

    #[error("body carries no changeset range")]
    NoChangesetRange,
}

/// One message of an mbox file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailMessage {
    headers: Vec<(String, String)>,
    body: String,
}

impl MailMessage {
    pub fn new(headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// First header with this name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse the `Date` header (RFC 2822)
    pub fn sent_at(&self) -> Result<DateTime<Utc>, ClassifyError> {
        let raw = self
            .header("Date")
            .ok_or(ClassifyError::MissingHeader("Date"))?;
        DateTime::parse_from_rfc2822(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ClassifyError::BadDate(raw.to_string()))
    }

    fn parse(raw: &str) -> Self {
        let mut headers: Vec<(String, String)> = Vec::new();
        let mut lines = raw.lines();

        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            if line.starts_with([' ', '\t']) {
                // Folded header continuation
                if let Some((_, value)) = headers.last_mut() {
                    value.push('\n');
                    value.push_str(line);
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim_start().to_string()));
            }
        }

        let body: Vec<&str> = lines
            .map(|line| match line.strip_prefix('>') {
                Some(rest) if rest.trim_start_matches('>').starts_with("From ") => rest,
                _ => line,
            })
            .collect();

        Self {
            headers,
            body: body.join("\n"),
        }
    }
}

/// All messages of an mbox file, in file order
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    messages: Vec<MailMessage>,
}

impl Mailbox {
    /// Load and parse an mbox file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Split on `From ` separator lines that start a message
    pub fn parse(content: &str) -> Self {
        let mut messages = Vec::new();
        let mut current: Option<Vec<&str>> = None;
        let mut previous_blank = true;

        for line in content.lines() {
            if previous_blank && line.starts_with("From ") {
                if let Some(lines) = current.take() {
                    messages.push(MailMessage::parse(&lines.join("\n")));
                }
                current = Some(Vec::new());
            } else if let Some(lines) = current.as_mut() {
                lines.push(line);
            }
            previous_blank = line.trim().is_empty();
        }
        if let Some(lines) = current {
            messages.push(MailMessage::parse(&lines.join("\n")));
        }

        Self { messages }
    }

    pub fn messages(&self) -> &[MailMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Window of send times, exclusive at both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Parse `DD/MM/YYYY-DD/MM/YYYY`
    ///
    /// The window opens at midnight of the first day and closes at midnight
    /// following the last day.
    ///
    /// # Example
    /// ```
    /// use perfdigest::notification::DateRange;
    ///
    /// let range = DateRange::parse("01/03/2012-07/03/2012").unwrap();
    /// assert_eq!(range.begin.to_rfc3339(), "2012-03-01T00:00:00+00:00");
    /// assert_eq!(range.end.to_rfc3339(), "2012-03-08T00:00:00+00:00");
    /// ```
    pub fn parse(spec: &str) -> Result<Self> {
        let Some((first, last)) = spec.trim().split_once('-') else {
            bail!("Cannot parse date range specification: {}", spec);
        };
        let begin = parse_day(first)?;
        let last = parse_day(last)?;
        let Some(end) = last.checked_add_days(Days::new(1)) else {
            bail!("Date range end out of bounds: {}", spec);
        };
        if end <= begin {
            bail!("Date range ends before it begins: {}", spec);
        }

        Ok(Self {
            begin: begin.and_time(NaiveTime::MIN).and_utc(),
            end: end.and_time(NaiveTime::MIN).and_utc(),
        })
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.begin < *at && *at < self.end
    }
}

fn parse_day(day: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(day.trim(), "%d/%m/%Y")
        .with_context(|| format!("Cannot parse date {} (expected DD/MM/YYYY)", day))
}

/// A classified notification: one platform's change over a changeset range
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub platform: String,
    pub from_token: String,
    pub to_token: String,
    pub delta: Delta,
    pub sent_at: DateTime<Utc>,
}

/// Selects and extracts notifications for one test
#[derive(Debug, Clone)]
pub struct MessageClassifier {
    recipient_prefix: String,
    selector: Regex,
    amount: Regex,
    changeset_range: Regex,
}

impl MessageClassifier {
    pub fn new(config: &DigestConfig, test: &str) -> Result<Self> {
        let platforms = config
            .platforms
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        let selector = format!(
            r"^Talos (?:Regression|Improvement).*?{} (?:in|de)crease.*?({}) {}(-Non-PGO)?$",
            regex::escape(test),
            platforms,
            regex::escape(&config.tree)
        );
        let changeset_range = format!(
            r"Changeset range: {}\?fromchange=([0-9a-f]{{12,}})&tochange=([0-9a-f]{{12,}})",
            regex::escape(&config.pushlog_page_prefix())
        );

        Ok(Self {
            recipient_prefix: config.recipient_prefix.clone(),
            selector: Regex::new(&selector).context("Invalid subject selector")?,
            amount: Regex::new(
                r"^Talos (?:Regression|Improvement)(?s:.*?)(de|in)crease ([0-9]+(?:\.[0-9]+(?:e\+[0-9]+)?)?)%",
            )
            .context("Invalid amount pattern")?,
            changeset_range: Regex::new(&changeset_range)
                .context("Invalid changeset range pattern")?,
        })
    }

    /// Platform the message reports on, if it concerns this test and was
    /// sent within `range`
    ///
    /// PGO builds (no `-Non-PGO` tree suffix) report as `<platform>-PGO`.
    pub fn classify(&self, msg: &MailMessage, range: &DateRange) -> Option<String> {
        let to = msg.header("To")?;
        if !to.starts_with(&self.recipient_prefix) {
            return None;
        }

        let subject = normalize_subject(msg.header("Subject")?);
        let captures = self.selector.captures(&subject)?;
        let mut platform = captures.get(1)?.as_str().to_string();
        if captures.get(2).is_none() {
            platform.push_str("-PGO");
        }

        match msg.sent_at() {
            Ok(sent) if range.contains(&sent) => Some(platform),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("ignoring message for {}: {}", platform, e);
                None
            }
        }
    }

    /// Extract the notification carried by a classified message
    ///
    /// `Ok(None)` when both ends of the changeset range are the same
    /// changeset; such reports carry no range to place.
    pub fn extract(
        &self,
        msg: &MailMessage,
        platform: &str,
    ) -> Result<Option<Notification>, ClassifyError> {
        let subject = normalize_subject(
            msg.header("Subject")
                .ok_or(ClassifyError::MissingHeader("Subject"))?,
        );
        let captures = self
            .amount
            .captures(&subject)
            .ok_or_else(|| ClassifyError::NoPercentage(subject.clone()))?;
        let sign = match &captures[1] {
            "de" => Sign::Decrease,
            _ => Sign::Increase,
        };
        let magnitude: f64 = captures[2]
            .parse()
            .map_err(|_| ClassifyError::BadAmount(captures[2].to_string()))?;

        let sent_at = msg.sent_at()?;

        let range = self
            .changeset_range
            .captures(msg.body())
            .ok_or(ClassifyError::NoChangesetRange)?;
        let from_token = range[1].to_string();
        let to_token = range[2].to_string();

        if from_token == to_token {
            tracing::debug!("{} reports a single changeset {}, skipping", platform, from_token);
            return Ok(None);
        }

        Ok(Some(Notification {
            platform: platform.to_string(),
            from_token,
            to_token,
            delta: Delta::new(sign, magnitude),
            sent_at,
        }))
    }
}

/// Tabs become spaces and folding newlines disappear
fn normalize_subject(subject: &str) -> String {
    subject
        .trim()
        .chars()
        .filter(|&c| c != '\n' && c != '\r')
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "Regression detected.\n\
        Changeset range: http://hg.mozilla.org/integration/mozilla-inbound/pushloghtml?fromchange=0123456789ab&tochange=ba9876543210\n";

    fn message(to: &str, subject: &str, date: &str, body: &str) -> MailMessage {
        MailMessage::new(
            vec![
                ("To".to_string(), to.to_string()),
                ("Subject".to_string(), subject.to_string()),
                ("Date".to_string(), date.to_string()),
            ],
            body,
        )
    }

    fn march() -> DateRange {
        DateRange::parse("01/03/2012-07/03/2012").unwrap()
    }

    fn classifier() -> MessageClassifier {
        MessageClassifier::new(&DigestConfig::default(), "Ts, Paint").unwrap()
    }

    #[test]
    fn test_parse_mbox_messages() {
        let mbox = "From sender@example.com Thu Mar  1 10:00:00 2012\n\
            To: dev-tree-management@lists.mozilla.org\n\
            Subject: first\n\
            \n\
            body one\n\
            >From the archive\n\
            \n\
            From sender@example.com Thu Mar  1 11:00:00 2012\n\
            To: someone@example.com\n\
            Subject: second\n\
            \tcontinued\n\
            \n\
            body two\n";

        let mailbox = Mailbox::parse(mbox);

        assert_eq!(mailbox.len(), 2);
        let first = &mailbox.messages()[0];
        assert_eq!(first.header("subject"), Some("first"));
        assert!(first.body().contains("body one"));
        assert!(first.body().contains("\nFrom the archive"));
        let second = &mailbox.messages()[1];
        assert_eq!(second.header("Subject"), Some("second\n\tcontinued"));
        assert_eq!(second.body(), "body two");
    }

    #[test]
    fn test_parse_empty_mbox() {
        assert!(Mailbox::parse("").is_empty());
    }

    #[test]
    fn test_date_range_bounds() {
        let range = march();
        let inside = DateTime::parse_from_rfc2822("Thu, 01 Mar 2012 10:00:00 +0000")
            .unwrap()
            .with_timezone(&Utc);
        let last_day = DateTime::parse_from_rfc2822("Wed, 07 Mar 2012 23:59:59 +0000")
            .unwrap()
            .with_timezone(&Utc);
        let after = DateTime::parse_from_rfc2822("Thu, 08 Mar 2012 00:00:00 +0000")
            .unwrap()
            .with_timezone(&Utc);
        assert!(range.contains(&inside));
        assert!(range.contains(&last_day));
        assert!(!range.contains(&after));
        assert!(!range.contains(&range.begin));
    }

    #[test]
    fn test_date_range_invalid() {
        assert!(DateRange::parse("2012-03-01").is_err());
        assert!(DateRange::parse("32/01/2012-01/02/2012").is_err());
        assert!(DateRange::parse("07/03/2012-01/03/2012").is_err());
    }

    #[test]
    fn test_classify_non_pgo() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Ts, Paint increase 5.2% on Linux Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );
        assert_eq!(classifier().classify(&msg, &march()), Some("Linux".to_string()));
    }

    #[test]
    fn test_classify_pgo_suffix() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Improvement: Ts, Paint decrease 3% on Win7 Mozilla-Inbound",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );
        assert_eq!(classifier().classify(&msg, &march()), Some("Win7-PGO".to_string()));
    }

    #[test]
    fn test_classify_prefers_longest_listed_platform() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Ts, Paint increase 5.2% on Linux x64 Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );
        assert_eq!(classifier().classify(&msg, &march()), Some("Linux x64".to_string()));
    }

    #[test]
    fn test_classify_folded_subject() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Ts, Paint increase 5.2% on\n\tLinux Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );
        assert_eq!(classifier().classify(&msg, &march()), Some("Linux".to_string()));
    }

    #[test]
    fn test_classify_rejects_other_recipient() {
        let msg = message(
            "someone@example.com",
            "Talos Regression: Ts, Paint increase 5.2% on Linux Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );
        assert_eq!(classifier().classify(&msg, &march()), None);
    }

    #[test]
    fn test_classify_rejects_other_test() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Dromaeo (DOM) increase 5.2% on Linux Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );
        assert_eq!(classifier().classify(&msg, &march()), None);
    }

    #[test]
    fn test_classify_rejects_out_of_range() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Ts, Paint increase 5.2% on Linux Mozilla-Inbound-Non-PGO",
            "Fri, 09 Mar 2012 10:00:00 +0000",
            BODY,
        );
        assert_eq!(classifier().classify(&msg, &march()), None);
    }

    #[test]
    fn test_extract_increase() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Ts, Paint increase 5.2% on Linux Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );

        let notification = classifier().extract(&msg, "Linux").unwrap().unwrap();

        assert_eq!(notification.platform, "Linux");
        assert_eq!(notification.from_token, "0123456789ab");
        assert_eq!(notification.to_token, "ba9876543210");
        assert_eq!(notification.delta, Delta::increase(5.2));
    }

    #[test]
    fn test_extract_decrease_exponent() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Improvement: Ts, Paint decrease 1.5e+2% on Linux Mozilla-Inbound",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );

        let notification = classifier().extract(&msg, "Linux-PGO").unwrap().unwrap();

        assert_eq!(notification.delta, Delta::decrease(150.0));
    }

    #[test]
    fn test_extract_same_changeset_skipped() {
        let body = "Changeset range: http://hg.mozilla.org/integration/mozilla-inbound/pushloghtml?fromchange=0123456789ab&tochange=0123456789ab";
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Ts, Paint increase 5.2% on Linux Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            body,
        );
        assert_eq!(classifier().extract(&msg, "Linux"), Ok(None));
    }

    #[test]
    fn test_extract_missing_range() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Ts, Paint increase 5.2% on Linux Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            "no range here",
        );
        assert_eq!(
            classifier().extract(&msg, "Linux"),
            Err(ClassifyError::NoChangesetRange)
        );
    }

    #[test]
    fn test_extract_missing_percentage() {
        let msg = message(
            "dev-tree-management@lists.mozilla.org",
            "Talos Regression: Ts, Paint increase on Linux Mozilla-Inbound-Non-PGO",
            "Fri, 02 Mar 2012 10:00:00 +0000",
            BODY,
        );
        assert!(matches!(
            classifier().extract(&msg, "Linux"),
            Err(ClassifyError::NoPercentage(_))
        ));
    }

    #[test]
    fn test_sent_at_bad_date() {
        let msg = message("x", "y", "yesterday", "");
        assert!(matches!(msg.sent_at(), Err(ClassifyError::BadDate(_))));
    }
}
