// Interval partition and the insertion algorithm
//
// The partition is kept sorted by `from` with no two intervals overlapping
// (`intervals[i].to <= intervals[i + 1].from`, by timestamp). Inserting an
// interval scans left to right and reconciles it against every point it
// overlaps, splitting both into locally ordered pieces whose shared span
// carries the merged deltas.
//
// Pieces that stay within the replaced point's span are spliced in place.
// The only fragment that can reach points not yet visited is the part of the
// incoming interval beyond the point's end; it goes back on the work-list and
// resumes scanning just after the spliced pieces.

use super::{consolidate, ConflictPolicy, DeltaSet, Interval, Revision, TimelineError};
use std::cmp::Ordering;

/// Ordered, non-overlapping timeline of intervals for one test
#[derive(Debug, Clone, Default)]
pub struct IntervalPartition {
    intervals: Vec<Interval>,
    policy: ConflictPolicy,
}

/// Fragment waiting to be placed, with the index to resume scanning from
struct Pending {
    interval: Interval,
    start: usize,
}

/// How an incoming interval relates to the point under the cursor
enum Resolution {
    /// Touches the point at the point's end node; keep scanning
    Skip,
    /// Ends on the point's start node; goes right before it
    InsertBefore,
    /// Point replaced by `pieces`; `tail` still has to be placed
    Replace {
        pieces: Vec<Interval>,
        tail: Option<Interval>,
    },
}

fn piece(from: &Revision, to: &Revision, deltas: DeltaSet) -> Interval {
    Interval::new(from.clone(), to.clone(), deltas)
}

impl IntervalPartition {
    /// Empty partition using last-write-wins for conflicting deltas
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self {
            intervals: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }

    /// Fold `interval` into the partition
    ///
    /// Fails fast on a malformed interval. Under `ConflictPolicy::Reject` a
    /// conflicting delta aborts the insertion and the partition is left
    /// exactly as it was.
    ///
    /// # Example
    /// ```
    /// use perfdigest::timeline::{Delta, DeltaSet, Interval, IntervalPartition, Revision};
    ///
    /// let (a, b, c, d) = (
    ///     Revision::new("a", 1),
    ///     Revision::new("b", 2),
    ///     Revision::new("c", 3),
    ///     Revision::new("d", 4),
    /// );
    /// let mut partition = IntervalPartition::new();
    /// partition
    ///     .insert(Interval::new(a, d, DeltaSet::single("Linux", Delta::increase(5.0))))
    ///     .unwrap();
    /// partition
    ///     .insert(Interval::new(b, c, DeltaSet::single("Win7", Delta::decrease(3.0))))
    ///     .unwrap();
    /// assert_eq!(partition.len(), 3);
    /// assert_eq!(partition.intervals()[1].deltas.len(), 2);
    /// ```
    pub fn insert(&mut self, interval: Interval) -> Result<(), TimelineError> {
        interval.validate()?;
        tracing::trace!("inserting {}", interval);

        match self.policy {
            ConflictPolicy::LastWriteWins => self.fold_in(interval),
            ConflictPolicy::Reject => {
                let snapshot = self.intervals.clone();
                let result = self.fold_in(interval);
                if result.is_err() {
                    self.intervals = snapshot;
                }
                result
            }
        }
    }

    fn fold_in(&mut self, interval: Interval) -> Result<(), TimelineError> {
        let mut work = vec![Pending { interval, start: 0 }];
        while let Some(pending) = work.pop() {
            if let Some(next) = self.place(pending)? {
                work.push(next);
            }
        }
        Ok(())
    }

    fn place(&mut self, pending: Pending) -> Result<Option<Pending>, TimelineError> {
        let Pending { interval: info, start } = pending;
        let mut i = start;

        while i < self.intervals.len() {
            let point = &self.intervals[i];

            if info.to.is_before(&point.from) {
                // The sort invariant puts every later point past info's end too
                self.intervals.insert(i, info);
                return Ok(None);
            }
            if info.from.is_after(&point.to) {
                i += 1;
                continue;
            }

            match resolve_overlap(point, &info, self.policy)? {
                Resolution::Skip => i += 1,
                Resolution::InsertBefore => {
                    self.intervals.insert(i, info);
                    return Ok(None);
                }
                Resolution::Replace { pieces, tail } => {
                    let resume = i + pieces.len();
                    self.intervals.splice(i..=i, pieces);
                    return Ok(tail.map(|interval| Pending {
                        interval,
                        start: resume,
                    }));
                }
            }
        }

        self.intervals.push(info);
        Ok(None)
    }

    /// Verify sort order and non-overlap of adjacent intervals
    pub fn check_invariant(&self) -> Result<(), String> {
        for (i, pair) in self.intervals.windows(2).enumerate() {
            let (left, right) = (&pair[0], &pair[1]);
            if right.from.is_before(&left.from) {
                return Err(format!(
                    "intervals {} and {} out of order: {} starts after {}",
                    i,
                    i + 1,
                    left,
                    right
                ));
            }
            if left.to.is_after(&right.from) {
                return Err(format!(
                    "intervals {} and {} overlap: {} and {}",
                    i,
                    i + 1,
                    left,
                    right
                ));
            }
        }
        Ok(())
    }

    /// Finish the partition: see [`consolidate`]
    pub fn consolidate(self) -> Vec<Interval> {
        consolidate(self.intervals)
    }

    pub fn into_intervals(self) -> Vec<Interval> {
        self.intervals
    }

    #[cfg(test)]
    pub(crate) fn from_intervals_unchecked(intervals: Vec<Interval>) -> Self {
        Self {
            intervals,
            policy: ConflictPolicy::default(),
        }
    }
}

/// Case analysis for an incoming interval that overlaps or touches `point`
///
/// Precondition: `info.to >= point.from` and `info.from <= point.to`.
fn resolve_overlap(
    point: &Interval,
    info: &Interval,
    policy: ConflictPolicy,
) -> Result<Resolution, TimelineError> {
    use Ordering::{Equal, Greater, Less};

    let merged = || point.deltas.merged(&info.deltas, policy);
    let ours = || point.deltas.clone();
    let theirs = || info.deltas.clone();

    let resolution = match info.from.cmp_time(&point.from) {
        Equal => match info.to.cmp_time(&point.to) {
            //  |--INFO--|
            //  |-----POINT-----|
            Less => Resolution::Replace {
                pieces: vec![
                    piece(&info.from, &info.to, merged()?),
                    piece(&info.to, &point.to, ours()),
                ],
                tail: None,
            },
            //  |-----INFO-----|
            //  |-----POINT----|
            Equal => Resolution::Replace {
                pieces: vec![piece(&point.from, &point.to, merged()?)],
                tail: None,
            },
            //  |-----INFO-----------|
            //  |--POINT--|
            // A zero-width point is replaced the same way; the tail resumes
            // after it, so it is never compared against the point again.
            Greater => Resolution::Replace {
                pieces: vec![piece(&point.from, &point.to, merged()?)],
                tail: Some(piece(&point.to, &info.to, theirs())),
            },
        },
        _ if info.from.same_node(&point.to) => Resolution::Skip,
        _ if info.to.same_node(&point.from) => Resolution::InsertBefore,
        Greater => match info.to.cmp_time(&point.to) {
            //      |--INFO--|
            //  |-------POINT-------|
            Less => Resolution::Replace {
                pieces: vec![
                    piece(&point.from, &info.from, ours()),
                    piece(&info.from, &info.to, merged()?),
                    piece(&info.to, &point.to, ours()),
                ],
                tail: None,
            },
            //      |---INFO---|
            //  |-----POINT----|
            Equal => Resolution::Replace {
                pieces: vec![
                    piece(&point.from, &info.from, ours()),
                    piece(&info.from, &info.to, merged()?),
                ],
                tail: None,
            },
            //        |-----INFO-----|
            //  |-----POINT----|
            Greater => Resolution::Replace {
                pieces: vec![
                    piece(&point.from, &info.from, ours()),
                    piece(&info.from, &point.to, merged()?),
                ],
                tail: Some(piece(&point.to, &info.to, theirs())),
            },
        },
        Less => match info.to.cmp_time(&point.to) {
            //  |--------INFO--------|
            //     |----POINT----|
            Greater => Resolution::Replace {
                pieces: vec![
                    piece(&info.from, &point.from, theirs()),
                    piece(&point.from, &point.to, merged()?),
                ],
                tail: Some(piece(&point.to, &info.to, theirs())),
            },
            //  |-------INFO-------|
            //     |----POINT------|
            Equal => Resolution::Replace {
                pieces: vec![
                    piece(&info.from, &point.from, theirs()),
                    piece(&point.from, &point.to, merged()?),
                ],
                tail: None,
            },
            //  |-----INFO-----|
            //        |-----POINT-----|
            Less => Resolution::Replace {
                pieces: vec![
                    piece(&info.from, &point.from, theirs()),
                    piece(&point.from, &info.to, merged()?),
                    piece(&info.to, &point.to, ours()),
                ],
                tail: None,
            },
        },
    };

    Ok(resolution)
}
