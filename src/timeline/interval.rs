// Interval: one delta-annotated span of the revision timeline

use super::{DeltaSet, Revision, TimelineError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous span `[from, to]` of the revision timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub from: Revision,
    pub to: Revision,
    pub deltas: DeltaSet,
}

impl Interval {
    pub fn new(from: Revision, to: Revision, deltas: DeltaSet) -> Self {
        Self { from, to, deltas }
    }

    /// Fails when `from` is chronologically after `to`
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.from.is_after(&self.to) {
            return Err(TimelineError::MalformedInterval {
                from: format!("{} ({})", self.from, self.from.datetime()),
                to: format!("{} ({})", self.to, self.to.datetime()),
            });
        }
        Ok(())
    }

    /// Both boundaries are the same changeset
    pub fn is_degenerate(&self) -> bool {
        self.from.same_node(&self.to)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}):{} ({})",
            self.from,
            self.from.datetime(),
            self.to,
            self.to.datetime()
        )?;
        for (platform, delta) in self.deltas.iter() {
            write!(f, " {}: {}", platform, delta)?;
        }
        Ok(())
    }
}
