//! Mutable state of one allocation pass.

use chrono::Duration;

use crate::interval::{sort_slots, TimeInterval};

use super::capacity::DailyLoad;

/// Free slots and daily load as a pass progresses.
///
/// Cloned for tentative split attempts; the clone replaces the original only
/// when the attempt succeeds.
#[derive(Clone, Debug, Default)]
pub struct AllocationState {
    /// Free slots, sorted by start
    pub slots: Vec<TimeInterval>,
    pub load: DailyLoad,
}

impl AllocationState {
    pub fn new(mut slots: Vec<TimeInterval>, load: DailyLoad) -> Self {
        sort_slots(&mut slots);
        Self { slots, load }
    }

    /// Copy for a tentative attempt.
    pub fn clone_for_attempt(&self) -> Self {
        self.clone()
    }

    pub fn contains_slot(&self, slot: &TimeInterval) -> bool {
        self.slots.contains(slot)
    }

    /// Take `allocation` out of `slot`, also removing `buffer_minutes` of
    /// padding on either side (clamped to the slot). Remainders keep the
    /// slot's preferred tag.
    pub fn consume(&mut self, slot: &TimeInterval, allocation: &TimeInterval, buffer_minutes: i64) {
        let padding = Duration::minutes(buffer_minutes.max(0));
        let safe_start = allocation
            .start
            .checked_sub_signed(padding)
            .map_or(slot.start, |t| t.max(slot.start));
        let safe_end = allocation
            .end
            .checked_add_signed(padding)
            .map_or(slot.end, |t| t.min(slot.end));

        self.slots.retain(|s| s != slot);
        if let Some(before) = TimeInterval::tagged(slot.start, safe_start, slot.preferred) {
            self.slots.push(before);
        }
        if let Some(after) = TimeInterval::tagged(safe_end, slot.end, slot.preferred) {
            self.slots.push(after);
        }
        sort_slots(&mut self.slots);
    }

    /// Consume the allocation and charge its minutes to the slot's date.
    pub fn commit(&mut self, slot: &TimeInterval, allocation: &TimeInterval, buffer_minutes: i64) {
        self.consume(slot, allocation, buffer_minutes);
        self.load
            .add(allocation.date(), allocation.duration_minutes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_commit_leaves_buffered_remainder() {
        let slot = TimeInterval::tagged(dt(10, 0), dt(14, 0), true).unwrap();
        let mut state = AllocationState::new(vec![slot], DailyLoad::new());
        let allocation = TimeInterval::new(dt(10, 0), dt(11, 30)).unwrap();

        state.commit(&slot, &allocation, 15);

        assert_eq!(
            state.slots,
            vec![TimeInterval::tagged(dt(11, 45), dt(14, 0), true).unwrap()]
        );
        assert_eq!(state.load.get(dt(0, 0).date()), 90);
    }

    #[test]
    fn test_buffer_clamped_to_slot() {
        let slot = TimeInterval::new(dt(10, 0), dt(11, 10)).unwrap();
        let mut state = AllocationState::new(vec![slot], DailyLoad::new());
        let allocation = TimeInterval::new(dt(10, 0), dt(11, 0)).unwrap();

        state.consume(&slot, &allocation, 15);
        assert!(state.slots.is_empty());
    }

    #[test]
    fn test_zero_buffer_consumes_exactly() {
        let slot = TimeInterval::new(dt(9, 0), dt(12, 0)).unwrap();
        let other = TimeInterval::new(dt(13, 0), dt(14, 0)).unwrap();
        let mut state = AllocationState::new(vec![other, slot], DailyLoad::new());
        let allocation = TimeInterval::new(dt(10, 0), dt(11, 0)).unwrap();

        state.consume(&slot, &allocation, 0);
        assert_eq!(
            state.slots,
            vec![
                TimeInterval::new(dt(9, 0), dt(10, 0)).unwrap(),
                TimeInterval::new(dt(11, 0), dt(12, 0)).unwrap(),
                other,
            ]
        );
    }

    #[test]
    fn test_attempt_clone_is_independent() {
        let slot = TimeInterval::new(dt(9, 0), dt(12, 0)).unwrap();
        let state = AllocationState::new(vec![slot], DailyLoad::new());
        let mut attempt = state.clone_for_attempt();
        attempt.commit(&slot, &TimeInterval::new(dt(9, 0), dt(10, 0)).unwrap(), 15);

        assert_eq!(state.slots, vec![slot]);
        assert_eq!(state.load.get(slot.date()), 0);
        assert!(!attempt.contains_slot(&slot));
    }
}
