// Per-platform performance deltas and their merge policy

use super::TimelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Direction of a performance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    #[serde(rename = "+")]
    Increase,
    #[serde(rename = "-")]
    Decrease,
}

impl Sign {
    pub fn as_char(self) -> char {
        match self {
            Sign::Increase => '+',
            Sign::Decrease => '-',
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A signed percentage change reported for one platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub sign: Sign,
    /// Percentage, always non-negative
    pub magnitude: f64,
}

impl Delta {
    pub fn new(sign: Sign, magnitude: f64) -> Self {
        Self { sign, magnitude }
    }

    pub fn increase(magnitude: f64) -> Self {
        Self::new(Sign::Increase, magnitude)
    }

    pub fn decrease(magnitude: f64) -> Self {
        Self::new(Sign::Decrease, magnitude)
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sign, self.magnitude)
    }
}

/// What to do when two merged sets carry different deltas for one platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// The later value wins and the conflict is logged
    #[default]
    LastWriteWins,
    /// The merge fails with `TimelineError::ConflictingDelta`
    Reject,
}

/// Platform name → delta, at most one entry per platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeltaSet {
    entries: BTreeMap<String, Delta>,
}

impl DeltaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing a single platform's delta
    pub fn single(platform: impl Into<String>, delta: Delta) -> Self {
        let mut set = Self::new();
        set.insert(platform, delta);
        set
    }

    /// Insert or replace a platform's delta, returning the previous value
    pub fn insert(&mut self, platform: impl Into<String>, delta: Delta) -> Option<Delta> {
        self.entries.insert(platform.into(), delta)
    }

    pub fn get(&self, platform: &str) -> Option<&Delta> {
        self.entries.get(platform)
    }

    pub fn contains(&self, platform: &str) -> bool {
        self.entries.contains_key(platform)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in platform order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Delta)> {
        self.entries.iter().map(|(p, d)| (p.as_str(), d))
    }

    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Union keyed by platform; entries of `later` replace ours
    ///
    /// Differing values for a shared platform are logged, since they usually
    /// mean a duplicate or inconsistent notification.
    pub fn overlay(&self, later: &DeltaSet) -> DeltaSet {
        let mut merged = self.clone();
        for (platform, delta) in &later.entries {
            if let Some(previous) = merged.entries.insert(platform.clone(), *delta) {
                if previous == *delta {
                    tracing::debug!("duplicate delta {} for {}", delta, platform);
                } else {
                    tracing::warn!(
                        "overlapping deltas for {}: {} replaced by {}",
                        platform,
                        previous,
                        delta
                    );
                }
            }
        }
        merged
    }

    /// Union keyed by platform under `policy`
    ///
    /// # Example
    /// ```
    /// use perfdigest::timeline::{ConflictPolicy, Delta, DeltaSet};
    ///
    /// let linux = DeltaSet::single("Linux", Delta::increase(5.0));
    /// let win7 = DeltaSet::single("Win7", Delta::decrease(3.0));
    /// let merged = linux.merged(&win7, ConflictPolicy::Reject).unwrap();
    /// assert_eq!(merged.len(), 2);
    /// ```
    pub fn merged(
        &self,
        later: &DeltaSet,
        policy: ConflictPolicy,
    ) -> Result<DeltaSet, TimelineError> {
        if policy == ConflictPolicy::Reject {
            for (platform, incoming) in &later.entries {
                match self.entries.get(platform) {
                    Some(existing) if existing != incoming => {
                        return Err(TimelineError::ConflictingDelta {
                            platform: platform.clone(),
                            existing: *existing,
                            incoming: *incoming,
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(self.overlay(later))
    }
}

impl fmt::Display for DeltaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (platform, delta) in &self.entries {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}: {}", platform, delta)?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(String, Delta)> for DeltaSet {
    fn from_iter<I: IntoIterator<Item = (String, Delta)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
