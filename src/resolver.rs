//! Revision resolution: changeset tokens → timestamped timeline revisions
//!
//! Notifications name a changeset range by two tokens whose order cannot be
//! trusted. A resolver looks the range up (normally in the repository push
//! log) and returns both ends as [`Revision`]s in chronological order.
//! Lookups are slow and remote, so [`CachedResolver`] keeps every answer in
//! a JSON file between runs.

use crate::config::DigestConfig;
use crate::timeline::{Revision, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Lookup cache format version (currently only v1 supported)
const CACHE_VERSION: u32 = 1;

/// Errors resolving a changeset range
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("push log request failed: {0}")]
    Fetch(String),

    #[error("push log has no pushes for {from}..{to}")]
    EmptyPushlog { from: String, to: String },

    #[error("unknown revision {0}")]
    UnknownRevision(String),

    #[error("{from}..{to} is not cached and lookups are disabled")]
    Offline { from: String, to: String },

    #[error("unsupported cache version: {found} (expected {expected})")]
    UnsupportedCacheVersion { expected: u32, found: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        ResolveError::Fetch(err.to_string())
    }
}

/// Maps a changeset range to its two ends on the timeline
pub trait RevisionResolver {
    /// Both ends of `from..to`, earliest first
    fn resolve(&mut self, from: &str, to: &str) -> Result<(Revision, Revision), ResolveError>;
}

impl<R: RevisionResolver + ?Sized> RevisionResolver for Box<R> {
    fn resolve(&mut self, from: &str, to: &str) -> Result<(Revision, Revision), ResolveError> {
        (**self).resolve(from, to)
    }
}

/// Build the chronologically ordered pair for `from..to`
fn ordered(from: &str, from_ts: Timestamp, to: &str, to_ts: Timestamp) -> (Revision, Revision) {
    let first = Revision::new(from, from_ts);
    let second = Revision::new(to, to_ts);
    if first.is_after(&second) {
        (second, first)
    } else {
        (first, second)
    }
}

/// One push as reported by `json-pushes`
#[derive(Debug, Clone, Deserialize)]
pub struct Push {
    pub date: Timestamp,
    #[serde(default)]
    pub changesets: Vec<String>,
    #[serde(default)]
    pub user: Option<String>,
}

/// Earliest and latest push dates of a `json-pushes` response
///
/// The response is an object keyed by push id; key order says nothing, so
/// pushes are ordered by numeric id.
pub fn push_span(pushes: &HashMap<String, Push>) -> Option<(Timestamp, Timestamp)> {
    let mut ordered: Vec<(u64, &Push)> = pushes
        .iter()
        .filter_map(|(id, push)| id.parse::<u64>().ok().map(|id| (id, push)))
        .collect();
    ordered.sort_by_key(|(id, _)| *id);

    let first = ordered.first()?.1.date;
    let last = ordered.last()?.1.date;
    Some((first, last))
}

/// Resolves ranges against the repository's `json-pushes` endpoint
pub struct PushlogResolver {
    client: reqwest::blocking::Client,
    config: DigestConfig,
}

impl PushlogResolver {
    pub fn new(config: &DigestConfig) -> Result<Self, ResolveError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

impl RevisionResolver for PushlogResolver {
    fn resolve(&mut self, from: &str, to: &str) -> Result<(Revision, Revision), ResolveError> {
        let url = self.config.json_pushes_url(from, to);
        tracing::debug!("fetching {}", url);

        let pushes: HashMap<String, Push> = self
            .client
            .get(&url)
            .send()?
            .error_for_status()?
            .json()?;

        let (first, last) = push_span(&pushes).ok_or_else(|| ResolveError::EmptyPushlog {
            from: from.to_string(),
            to: to.to_string(),
        })?;
        Ok(ordered(from, first, to, last))
    }
}

/// Never resolves anything; used when network lookups are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineResolver;

impl RevisionResolver for OfflineResolver {
    fn resolve(&mut self, from: &str, to: &str) -> Result<(Revision, Revision), ResolveError> {
        Err(ResolveError::Offline {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Resolves from a fixed token → timestamp table
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    timestamps: HashMap<String, Timestamp>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node: impl Into<String>, timestamp: Timestamp) -> Self {
        self.timestamps.insert(node.into(), timestamp);
        self
    }

    pub fn insert(&mut self, node: impl Into<String>, timestamp: Timestamp) {
        self.timestamps.insert(node.into(), timestamp);
    }

    fn lookup(&self, node: &str) -> Result<Timestamp, ResolveError> {
        self.timestamps
            .get(node)
            .copied()
            .ok_or_else(|| ResolveError::UnknownRevision(node.to_string()))
    }
}

impl RevisionResolver for StaticResolver {
    fn resolve(&mut self, from: &str, to: &str) -> Result<(Revision, Revision), ResolveError> {
        Ok(ordered(from, self.lookup(from)?, to, self.lookup(to)?))
    }
}

/// Cached endpoints of one range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSpan {
    pub from: Timestamp,
    pub to: Timestamp,
}

/// Persistent lookup cache, keyed by `from:to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushlogCache {
    pub version: u32,
    pub entries: BTreeMap<String, CachedSpan>,
}

impl Default for PushlogCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl PushlogCache {
    fn key(from: &str, to: &str) -> String {
        format!("{}:{}", from, to)
    }

    /// Load a cache file; a missing file is an empty cache
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let cache: PushlogCache = serde_json::from_str(&contents)?;
        if cache.version != CACHE_VERSION {
            return Err(ResolveError::UnsupportedCacheVersion {
                expected: CACHE_VERSION,
                found: cache.version,
            });
        }
        Ok(cache)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ResolveError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get(&self, from: &str, to: &str) -> Option<CachedSpan> {
        self.entries.get(&Self::key(from, to)).copied()
    }

    pub fn insert(&mut self, from: &str, to: &str, span: CachedSpan) {
        self.entries.insert(Self::key(from, to), span);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Answers from the cache, asking `inner` only on a miss
pub struct CachedResolver<R> {
    inner: R,
    cache: PushlogCache,
    path: Option<PathBuf>,
    dirty: bool,
}

impl<R: RevisionResolver> CachedResolver<R> {
    /// In-memory cache only
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: PushlogCache::default(),
            path: None,
            dirty: false,
        }
    }

    /// Cache backed by `path`, loaded now and written by [`Self::save`]
    pub fn with_file<P: Into<PathBuf>>(inner: R, path: P) -> Result<Self, ResolveError> {
        let path = path.into();
        let cache = PushlogCache::load(&path)?;
        tracing::debug!("loaded {} cached ranges from {}", cache.len(), path.display());
        Ok(Self {
            inner,
            cache,
            path: Some(path),
            dirty: false,
        })
    }

    pub fn cache(&self) -> &PushlogCache {
        &self.cache
    }

    /// Write the cache back if anything new was resolved
    pub fn save(&mut self) -> Result<(), ResolveError> {
        if let (true, Some(path)) = (self.dirty, self.path.as_ref()) {
            self.cache.save(path)?;
            tracing::info!("saved {} cached ranges to {}", self.cache.len(), path.display());
            self.dirty = false;
        }
        Ok(())
    }
}

impl<R: RevisionResolver> RevisionResolver for CachedResolver<R> {
    fn resolve(&mut self, from: &str, to: &str) -> Result<(Revision, Revision), ResolveError> {
        if let Some(span) = self.cache.get(from, to) {
            return Ok(ordered(from, span.from, to, span.to));
        }

        let (first, second) = self.inner.resolve(from, to)?;
        let span = if first.node() == from {
            CachedSpan {
                from: first.timestamp(),
                to: second.timestamp(),
            }
        } else {
            CachedSpan {
                from: second.timestamp(),
                to: first.timestamp(),
            }
        };
        self.cache.insert(from, to, span);
        self.dirty = true;
        Ok((first, second))
    }
}
