//! Half-open time intervals and the slot algebra built on them.
//!
//! All times are naive local date-times. A slot set is a `Vec<TimeInterval>`
//! kept sorted by start; every operation here returns a freshly sorted set.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

/// A half-open interval `[start, end)` with `start < end`.
///
/// `preferred` marks slots that fall inside a preferred window (for example a
/// class-period grid). It only influences scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub preferred: bool,
}

impl TimeInterval {
    /// Create an untagged interval. Returns `None` unless `start < end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        Self::tagged(start, end, false)
    }

    /// Create an interval carrying a preferred tag. Returns `None` unless `start < end`.
    pub fn tagged(start: NaiveDateTime, end: NaiveDateTime, preferred: bool) -> Option<Self> {
        if start < end {
            Some(Self {
                start,
                end,
                preferred,
            })
        } else {
            None
        }
    }

    /// Interval of `minutes` starting at `start`.
    ///
    /// Returns `None` for non-positive lengths and for ends past the
    /// representable calendar.
    pub fn from_minutes(start: NaiveDateTime, minutes: i64) -> Option<Self> {
        let end = start.checked_add_signed(TimeDelta::try_minutes(minutes)?)?;
        Self::new(start, end)
    }

    /// Daily window `[date + start, date + end)`.
    pub fn on_date(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Option<Self> {
        Self::new(date.and_time(start), date.and_time(end))
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// True when the two intervals share any instant.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Calendar date of the interval start.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Drop or truncate the part of this interval before `cutoff`.
    ///
    /// Returns `None` when the interval ends at or before `cutoff`.
    pub fn trim_before(&self, cutoff: NaiveDateTime) -> Option<TimeInterval> {
        if self.end <= cutoff {
            return None;
        }
        if self.start < cutoff {
            return Self::tagged(cutoff, self.end, self.preferred);
        }
        Some(*self)
    }

    /// Parts of this interval left after removing `blocker` (zero, one or two).
    ///
    /// Remainders keep the preferred tag of `self`.
    pub fn minus(&self, blocker: &TimeInterval) -> Vec<TimeInterval> {
        if !self.overlaps(blocker) {
            return vec![*self];
        }
        let mut parts = Vec::with_capacity(2);
        if let Some(before) = Self::tagged(self.start, blocker.start, self.preferred) {
            parts.push(before);
        }
        if let Some(after) = Self::tagged(blocker.end, self.end, self.preferred) {
            parts.push(after);
        }
        parts
    }
}

/// Sort a slot set by start (then end) in place.
pub fn sort_slots(slots: &mut [TimeInterval]) {
    slots.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
}

/// Subtract `blocker` from every interval in `slots`.
///
/// Intervals that do not overlap the blocker pass through unchanged.
pub fn subtract(slots: &[TimeInterval], blocker: &TimeInterval) -> Vec<TimeInterval> {
    let mut result: Vec<TimeInterval> = slots.iter().flat_map(|s| s.minus(blocker)).collect();
    sort_slots(&mut result);
    result
}

/// Subtract every blocker in turn.
pub fn subtract_all<'a, I>(slots: &[TimeInterval], blockers: I) -> Vec<TimeInterval>
where
    I: IntoIterator<Item = &'a TimeInterval>,
{
    let mut result = slots.to_vec();
    for blocker in blockers {
        result = subtract(&result, blocker);
    }
    sort_slots(&mut result);
    result
}

/// Split `slot` against a preferred `window`, tagging the overlap as preferred.
///
/// A slot that is already preferred is returned unchanged, which makes
/// repeated application idempotent.
pub fn split_by_window(slot: &TimeInterval, window: &TimeInterval) -> Vec<TimeInterval> {
    if slot.preferred || !slot.overlaps(window) {
        return vec![*slot];
    }
    let mut parts = Vec::with_capacity(3);
    if let Some(before) = TimeInterval::tagged(slot.start, window.start, false) {
        parts.push(before);
    }
    let overlap_start = slot.start.max(window.start);
    let overlap_end = slot.end.min(window.end);
    if let Some(inside) = TimeInterval::tagged(overlap_start, overlap_end, true) {
        parts.push(inside);
    }
    if let Some(after) = TimeInterval::tagged(window.end, slot.end, false) {
        parts.push(after);
    }
    parts
}

/// Blocked time kept as sorted, non-overlapping periods.
///
/// Maintains the invariant that `busy_periods` is sorted by start and that no
/// two periods overlap or touch, so lookups can binary search.
#[derive(Clone, Debug, Default)]
pub struct BusyTimeline {
    busy_periods: Vec<TimeInterval>,
}

impl BusyTimeline {
    /// Build a timeline from arbitrary (possibly overlapping) blocked intervals.
    pub fn new(periods: impl IntoIterator<Item = TimeInterval>) -> Self {
        let mut periods: Vec<TimeInterval> = periods.into_iter().collect();
        if periods.is_empty() {
            return Self::default();
        }
        sort_slots(&mut periods);

        let mut merged: Vec<TimeInterval> = Vec::with_capacity(periods.len());
        for period in periods {
            match merged.last_mut() {
                Some(last) if period.start <= last.end => {
                    last.end = last.end.max(period.end);
                }
                _ => merged.push(TimeInterval {
                    preferred: false,
                    ..period
                }),
            }
        }
        Self {
            busy_periods: merged,
        }
    }

    /// Free parts of `window` that no busy period covers, sorted by start.
    ///
    /// Equivalent to subtracting every busy period from `[window]`, but only
    /// visits the periods that can intersect the window.
    pub fn free_within(&self, window: &TimeInterval) -> Vec<TimeInterval> {
        let mut free = Vec::new();
        let mut cursor = window.start;
        let first = self.busy_periods.partition_point(|p| p.end <= window.start);

        for busy in &self.busy_periods[first..] {
            if busy.start >= window.end {
                break;
            }
            if let Some(gap) = TimeInterval::tagged(cursor, busy.start, window.preferred) {
                free.push(gap);
            }
            cursor = cursor.max(busy.end);
            if cursor >= window.end {
                return free;
            }
        }

        if let Some(tail) = TimeInterval::tagged(cursor, window.end, window.preferred) {
            free.push(tail);
        }
        free
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn iv(day: u32, h1: u32, m1: u32, h2: u32, m2: u32) -> TimeInterval {
        TimeInterval::new(dt(day, h1, m1), dt(day, h2, m2)).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_and_inverted() {
        assert!(TimeInterval::new(dt(1, 9, 0), dt(1, 9, 0)).is_none());
        assert!(TimeInterval::new(dt(1, 10, 0), dt(1, 9, 0)).is_none());
        assert_eq!(iv(1, 9, 0, 10, 30).duration_minutes(), 90);
    }

    #[test]
    fn test_from_minutes_rejects_overflowing_lengths() {
        assert_eq!(
            TimeInterval::from_minutes(dt(1, 9, 0), 90),
            Some(iv(1, 9, 0, 10, 30))
        );
        assert!(TimeInterval::from_minutes(dt(1, 9, 0), 0).is_none());
        assert!(TimeInterval::from_minutes(dt(1, 9, 0), 1_000_000_000_000).is_none());
        assert!(TimeInterval::from_minutes(dt(1, 9, 0), i64::MAX).is_none());
    }

    #[test]
    fn test_overlaps_is_half_open() {
        let a = iv(1, 8, 0, 10, 0);
        assert!(a.overlaps(&iv(1, 9, 0, 11, 0)));
        assert!(!a.overlaps(&iv(1, 10, 0, 11, 0)));
        assert!(!iv(1, 10, 0, 11, 0).overlaps(&a));
    }

    #[test]
    fn test_subtract_middle_leaves_two_parts() {
        let slots = vec![iv(1, 8, 0, 23, 0)];
        let result = subtract(&slots, &iv(1, 8, 30, 10, 10));
        assert_eq!(result, vec![iv(1, 8, 0, 8, 30), iv(1, 10, 10, 23, 0)]);
    }

    #[test]
    fn test_subtract_covering_blocker_removes_slot() {
        let slots = vec![iv(1, 9, 0, 10, 0), iv(1, 12, 0, 13, 0)];
        let result = subtract(&slots, &iv(1, 8, 0, 11, 0));
        assert_eq!(result, vec![iv(1, 12, 0, 13, 0)]);
    }

    #[test]
    fn test_subtract_disjoint_is_noop() {
        let slots = vec![iv(1, 9, 0, 10, 0), iv(1, 12, 0, 13, 0)];
        assert_eq!(subtract(&slots, &iv(1, 10, 0, 12, 0)), slots);
    }

    #[test]
    fn test_subtract_preserves_preferred_tag() {
        let slot = TimeInterval::tagged(dt(1, 8, 0), dt(1, 12, 0), true).unwrap();
        let result = subtract(&[slot], &iv(1, 9, 0, 10, 0));
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|s| s.preferred));
    }

    #[test]
    fn test_trim_before() {
        let slot = iv(1, 9, 0, 12, 0);
        assert_eq!(slot.trim_before(dt(1, 8, 0)), Some(slot));
        assert_eq!(slot.trim_before(dt(1, 10, 15)), Some(iv(1, 10, 15, 12, 0)));
        assert_eq!(slot.trim_before(dt(1, 12, 0)), None);
        assert_eq!(slot.trim_before(dt(1, 13, 0)), None);
    }

    #[test]
    fn test_split_by_window_tags_overlap() {
        let slot = iv(1, 8, 0, 12, 0);
        let window = TimeInterval::tagged(dt(1, 8, 30), dt(1, 9, 15), true).unwrap();
        let parts = split_by_window(&slot, &window);
        assert_eq!(parts.len(), 3);
        assert!(!parts[0].preferred);
        assert!(parts[1].preferred);
        assert_eq!((parts[1].start, parts[1].end), (dt(1, 8, 30), dt(1, 9, 15)));
        assert!(!parts[2].preferred);
    }

    #[test]
    fn test_split_by_window_is_idempotent() {
        let slot = iv(1, 8, 0, 12, 0);
        let window = TimeInterval::tagged(dt(1, 8, 30), dt(1, 9, 15), true).unwrap();
        let once = split_by_window(&slot, &window);
        let twice: Vec<TimeInterval> = once
            .iter()
            .flat_map(|s| split_by_window(s, &window))
            .collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_timeline_merges_overlapping_and_touching() {
        let timeline = BusyTimeline::new(vec![
            iv(1, 10, 0, 11, 0),
            iv(1, 8, 0, 9, 0),
            iv(1, 9, 0, 9, 30),
            iv(1, 10, 30, 12, 0),
        ]);
        assert_eq!(
            timeline.free_within(&iv(1, 7, 0, 13, 0)),
            vec![iv(1, 7, 0, 8, 0), iv(1, 9, 30, 10, 0), iv(1, 12, 0, 13, 0)]
        );
    }

    #[test]
    fn test_free_within_matches_subtract_all() {
        let blockers = vec![
            iv(1, 7, 0, 8, 30),
            iv(1, 10, 0, 11, 0),
            iv(1, 10, 30, 12, 0),
            iv(1, 22, 0, 23, 30),
        ];
        let window = iv(1, 8, 0, 23, 0);
        let timeline = BusyTimeline::new(blockers.clone());
        assert_eq!(
            timeline.free_within(&window),
            subtract_all(&[window], &blockers)
        );
    }

    #[test]
    fn test_free_within_empty_timeline_returns_window() {
        let window = iv(1, 8, 0, 23, 0);
        assert_eq!(BusyTimeline::default().free_within(&window), vec![window]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn base() -> NaiveDateTime {
            dt(1, 0, 0)
        }

        fn interval_at(offset: i64, len: i64) -> TimeInterval {
            TimeInterval::from_minutes(base() + TimeDelta::minutes(offset), len).unwrap()
        }

        fn arb_interval() -> impl Strategy<Value = TimeInterval> {
            (0i64..1440, 1i64..240).prop_map(|(offset, len)| interval_at(offset, len))
        }

        proptest! {
            #[test]
            fn prop_free_within_equals_subtract_all(
                window in arb_interval(),
                blockers in prop::collection::vec(arb_interval(), 0..8),
            ) {
                let timeline = BusyTimeline::new(blockers.clone());
                prop_assert_eq!(timeline.free_within(&window), subtract_all(&[window], &blockers));
            }

            #[test]
            fn prop_subtract_disjoint_blocker_is_noop(slot in arb_interval(), gap in 0i64..120, len in 1i64..120) {
                let blocker = TimeInterval::from_minutes(slot.end + TimeDelta::minutes(gap), len).unwrap();
                prop_assert_eq!(subtract(&[slot], &blocker), vec![slot]);
            }

            #[test]
            fn prop_subtract_leaves_no_overlap(
                slots in prop::collection::vec(arb_interval(), 0..6),
                blocker in arb_interval(),
            ) {
                let result = subtract(&slots, &blocker);
                prop_assert!(result.iter().all(|s| !s.overlaps(&blocker)));
                prop_assert!(result.windows(2).all(|w| w[0].start <= w[1].start));
                let kept: i64 = result.iter().map(TimeInterval::duration_minutes).sum();
                let total: i64 = slots.iter().map(TimeInterval::duration_minutes).sum();
                prop_assert!(kept <= total);
            }
        }
    }
}
