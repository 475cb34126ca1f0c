// Consolidation pass run once per test after every insertion

use super::Interval;

/// Finish a partition for rendering
///
/// 1. Drop degenerate intervals (both boundaries the same node).
/// 2. Merge each interval into the preceding kept one when both start on the
///    same node: the end becomes the chronologically later of the two and
///    the later interval's deltas are overlaid.
///
/// Running the pass on its own output changes nothing.
pub fn consolidate(intervals: Vec<Interval>) -> Vec<Interval> {
    let mut kept: Vec<Interval> = Vec::with_capacity(intervals.len());

    for interval in intervals.into_iter().filter(|i| !i.is_degenerate()) {
        match kept.last_mut() {
            Some(last) if last.from.same_node(&interval.from) => {
                tracing::debug!("merging {} into {}", interval, last);
                if interval.to.is_after(&last.to) {
                    last.to = interval.to;
                }
                last.deltas = last.deltas.overlay(&interval.deltas);
            }
            _ => kept.push(interval),
        }
    }

    kept
}
