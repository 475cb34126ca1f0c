// Interval-partition merge engine
//
// Builds a sorted, non-overlapping timeline of revision ranges from an
// unordered stream of (possibly overlapping) delta-annotated intervals.
//
// - `Revision`: opaque node token plus a chronological timestamp. Ordering
//   compares timestamps only; `same_node` compares tokens only.
// - `DeltaSet`: per-platform signed percentage changes, ordered by platform.
// - `IntervalPartition`: the running timeline for one test. Every insertion
//   splits and merges existing intervals so the partition stays disjoint.
// - `consolidate`: finishing pass dropping zero-width intervals and merging
//   same-start neighbours.
//
// The engine is synchronous and performs no I/O. Each test owns its own
// partition; insertions into one partition must not run concurrently.

mod consolidate;
mod delta;
mod interval;
mod partition;
mod revision;

pub use consolidate::consolidate;
pub use delta::{ConflictPolicy, Delta, DeltaSet, Sign};
pub use interval::Interval;
pub use partition::IntervalPartition;
pub use revision::{Revision, Timestamp};

use thiserror::Error;

/// Errors raised by the timeline engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("malformed interval: {from} is later than {to}")]
    MalformedInterval { from: String, to: String },

    #[error("conflicting deltas for {platform}: {existing} then {incoming}")]
    ConflictingDelta {
        platform: String,
        existing: Delta,
        incoming: Delta,
    },
}
