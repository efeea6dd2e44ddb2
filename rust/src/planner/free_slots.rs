//! Free-slot construction over a date range.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::interval::{sort_slots, split_by_window, BusyTimeline, TimeInterval};

/// Builds the free-slot pool: daily wake windows minus blocked time.
#[derive(Clone, Debug)]
pub struct FreeSlotBuilder {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    /// Time before this instant (and dates before its date) is never free.
    pub not_before: Option<NaiveDateTime>,
    /// Clock windows whose overlap with a slot is tagged preferred.
    pub preferred_windows: Vec<(NaiveTime, NaiveTime)>,
}

impl FreeSlotBuilder {
    pub fn new(day_start: NaiveTime, day_end: NaiveTime) -> Self {
        Self {
            day_start,
            day_end,
            not_before: None,
            preferred_windows: Vec::new(),
        }
    }

    pub fn not_before(mut self, now: NaiveDateTime) -> Self {
        self.not_before = Some(now);
        self
    }

    pub fn with_preferred_windows(mut self, windows: Vec<(NaiveTime, NaiveTime)>) -> Self {
        self.preferred_windows = windows;
        self
    }

    /// Free slots on dates in `[start_date, end_date)`, sorted by start.
    pub fn build(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        blocked: impl IntoIterator<Item = TimeInterval>,
    ) -> Vec<TimeInterval> {
        let timeline = BusyTimeline::new(blocked);
        let mut slots = Vec::new();

        let mut date = start_date;
        while date < end_date {
            if let Some(window) = TimeInterval::on_date(date, self.day_start, self.day_end) {
                slots.extend(
                    timeline
                        .free_within(&window)
                        .into_iter()
                        .filter_map(|slot| self.trim(slot)),
                );
            }
            date += Duration::days(1);
        }

        sort_slots(&mut slots);
        self.apply_preferred_windows(slots)
    }

    fn trim(&self, slot: TimeInterval) -> Option<TimeInterval> {
        match self.not_before {
            Some(now) => slot
                .trim_before(now)
                .filter(|s| s.date() >= now.date()),
            None => Some(slot),
        }
    }

    /// Split every slot against each preferred window of its date.
    pub fn apply_preferred_windows(&self, slots: Vec<TimeInterval>) -> Vec<TimeInterval> {
        if self.preferred_windows.is_empty() {
            return slots;
        }
        let mut result = Vec::with_capacity(slots.len());
        for slot in slots {
            let date = slot.date();
            let mut segments = vec![slot];
            for &(start, end) in &self.preferred_windows {
                let Some(window) = TimeInterval::tagged(date.and_time(start), date.and_time(end), true)
                else {
                    continue;
                };
                segments = segments
                    .iter()
                    .flat_map(|segment| split_by_window(segment, &window))
                    .collect();
            }
            result.extend(segments);
        }
        sort_slots(&mut result);
        result
    }
}
