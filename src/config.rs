//! perfdigest.toml configuration
//!
//! Describes where notifications come from (recipient list, tree name,
//! repository) and what to digest (platforms and tests). Every key is
//! optional; missing keys fall back to [`DigestConfig::default`].
//!
//! # Example perfdigest.toml
//!
//! ```toml
//! recipient_prefix = "dev-tree-management@"
//! tree = "Mozilla-Inbound"
//! repository_url = "http://hg.mozilla.org/integration/mozilla-inbound"
//! platforms = ["XP", "Win7", "Linux"]
//! tests = ["Ts, Paint"]
//! conflict_policy = "reject"
//! request_timeout_secs = 20
//! ```

use crate::timeline::ConflictPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DEFAULT_PLATFORMS: &[&str] = &[
    "XP",
    "Win7",
    "MacOSX 10.6 (rev4)",
    "Linux x64",
    "Linux",
    "WINNT 5.2",
    "WINNT 6.1",
    "CentOS release 5 (Final)",
    "CentOS (x86_64) release 5 (Final)",
    "MacOSX 10.7",
];

const DEFAULT_TESTS: &[&str] = &[
    "Ts, MED Dirty Profile",
    "Ts, MAX Dirty Profile",
    "SVG, Opacity Row Major",
    "Dromaeo (DOM)",
    "Dromaeo (CSS)",
    "SunSpider 2 MozAfterpaint",
    "DHTML Row Major MozAfterPaint",
    "DHTML 2 MozAfterPaint",
    "Ts Shutdown, MAX Dirty Profile",
    "Ts Shutdown, MED Dirty Profile",
    "V8",
    "Paint",
    "tscroll",
    "Number of Constructors",
    "Tp5 No Network Row Major MozAfterPaint",
    "Tp5 No Network Row Major MozAfterPaint (Private Bytes)",
    "Tp5 No Network Row Major MozAfterPaint (Main RSS)",
    "Tp5 No Network Row Major MozAfterPaint (Content RSS)",
    "Tp5 No Network Row Major MozAfterPaint (%CPU)",
    "Trace Malloc MaxHeap",
    "Trace Malloc Allocs",
    "Trace Malloc Leaks",
    "a11y Row Major MozAfterPaint",
    "Ts, Paint",
    "Robocop Pan Benchmark",
    "Robocopy Checkerboarding No Snapshot Benchmark",
    "Robocop Checkerboarding Real User Benchmark",
];

/// Configuration for a digest run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DigestConfig {
    /// Only messages whose `To` header starts with this are considered
    pub recipient_prefix: String,

    /// Tree name closing the notification subject (e.g. "Mozilla-Inbound").
    /// A `-Non-PGO` suffix marks non-PGO builds; platforms of PGO builds get
    /// a `-PGO` suffix.
    pub tree: String,

    /// Repository root; push-log and revision URLs are derived from it
    pub repository_url: String,

    /// Platform names as they appear in notification subjects
    pub platforms: Vec<String>,

    /// Tests digested when none are given on the command line
    pub tests: Vec<String>,

    /// Handling of two different deltas for one platform on one range
    pub conflict_policy: ConflictPolicy,

    /// Timeout for a single push-log request
    pub request_timeout_secs: u64,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            recipient_prefix: "dev-tree-management@".to_string(),
            tree: "Mozilla-Inbound".to_string(),
            repository_url: "http://hg.mozilla.org/integration/mozilla-inbound".to_string(),
            platforms: DEFAULT_PLATFORMS.iter().map(|s| s.to_string()).collect(),
            tests: DEFAULT_TESTS.iter().map(|s| s.to_string()).collect(),
            conflict_policy: ConflictPolicy::LastWriteWins,
            request_timeout_secs: 30,
        }
    }
}

impl DigestConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DigestConfig = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.platforms.is_empty() {
            return Err("platforms must not be empty".to_string());
        }
        if self.platforms.iter().any(|p| p.trim().is_empty()) {
            return Err("platform names must not be blank".to_string());
        }
        if self.tree.trim().is_empty() {
            return Err("tree must not be empty".to_string());
        }
        if !self.repository_url.starts_with("http://") && !self.repository_url.starts_with("https://") {
            return Err(format!(
                "repository_url must be an http(s) URL, got {}",
                self.repository_url
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be positive".to_string());
        }
        Ok(())
    }

    fn repository_root(&self) -> &str {
        self.repository_url.trim_end_matches('/')
    }

    /// Push-log JSON endpoint for a changeset range
    pub fn json_pushes_url(&self, from: &str, to: &str) -> String {
        format!(
            "{}/json-pushes?fromchange={}&tochange={}",
            self.repository_root(),
            from,
            to
        )
    }

    /// Human-facing push-log page for a changeset range
    pub fn pushlog_url(&self, from: &str, to: &str) -> String {
        format!(
            "{}/pushloghtml?fromchange={}&tochange={}",
            self.repository_root(),
            from,
            to
        )
    }

    /// Page for a single changeset
    pub fn revision_url(&self, node: &str) -> String {
        format!("{}/rev/{}", self.repository_root(), node)
    }

    /// Push-log page prefix as it appears in notification bodies
    pub fn pushlog_page_prefix(&self) -> String {
        format!("{}/pushloghtml", self.repository_root())
    }
}
