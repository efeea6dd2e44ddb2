//! Placement of one task into the free-slot pool.
//!
//! A task is first offered every slot long enough to hold it whole; the best
//! scoring one wins. If none fits and splitting is allowed, the task is
//! spread over a bounded number of slots instead. A split either places the
//! full duration or nothing.

use chrono::NaiveDateTime;

use crate::interval::TimeInterval;
use crate::models::Task;
use crate::scoring::{SlotCandidate, SlotScorer};
use crate::{log_changes, log_checks, log_debug};

use super::capacity::{DailyLimits, DailyLoad};
use super::state::AllocationState;

/// Upper bound on segments for a split task of `minutes`.
pub fn max_split_segments(minutes: i64) -> usize {
    if minutes <= 180 {
        2
    } else if minutes <= 300 {
        3
    } else {
        4
    }
}

/// Length of the next split segment when `available` minutes can be taken.
///
/// Keeps the part left for later segments at zero or at least `min_segment`.
pub fn clamp_segment(remaining: i64, available: i64, min_segment: i64) -> i64 {
    let alloc = remaining.min(available);
    if remaining <= 2 * min_segment && alloc >= remaining {
        remaining
    } else if remaining > 2 * min_segment && remaining - alloc < min_segment {
        remaining - min_segment
    } else {
        alloc
    }
}

/// Grow a segment to the end of its slot when the slot would otherwise keep
/// an unusable sliver shorter than `min_segment`.
pub fn widen_to_slot(
    alloc: i64,
    remaining: i64,
    slot_minutes: i64,
    capacity: Option<i64>,
    min_segment: i64,
) -> i64 {
    let leftover = slot_minutes - alloc;
    if leftover <= 0 || leftover >= min_segment {
        return alloc;
    }
    let widened = slot_minutes;
    let rest = remaining - widened;
    let within_capacity = capacity.map_or(true, |c| widened <= c);
    if within_capacity && (rest == 0 || rest >= min_segment) {
        widened
    } else {
        alloc
    }
}

/// What one task asks of the allocator.
#[derive(Clone, Copy, Debug)]
pub struct TaskDemand<'a> {
    pub task: &'a Task,
    pub minutes: i64,
    /// Every allocation must end at or before this.
    pub cutoff: Option<NaiveDateTime>,
    pub preferred_due: Option<NaiveDateTime>,
    /// Daily-capacity checks are skipped for relaxed tasks.
    pub relaxed: bool,
}

#[derive(Clone, Debug)]
pub struct AllocatorOptions {
    pub allow_split: bool,
    pub buffer_minutes: i64,
    pub min_segment_minutes: i64,
    /// Scores closer than this are a tie, resolved by earlier start
    pub tie_epsilon: f64,
    pub verbosity: u8,
}

/// Greedy slot allocator parameterised by a scorer.
pub struct Allocator<'a, S: SlotScorer + ?Sized> {
    scorer: &'a S,
    limits: Option<&'a DailyLimits>,
    options: AllocatorOptions,
}

impl<'a, S: SlotScorer + ?Sized> Allocator<'a, S> {
    /// `limits` of `None` means no daily cap at all.
    pub fn new(scorer: &'a S, limits: Option<&'a DailyLimits>, options: AllocatorOptions) -> Self {
        Self {
            scorer,
            limits,
            options,
        }
    }

    /// Place `demand` and commit it to `state`.
    ///
    /// Returns the allocations in placement order, or `None` with `state`
    /// untouched when the task cannot be placed.
    pub fn allocate(
        &self,
        state: &mut AllocationState,
        demand: &TaskDemand<'_>,
    ) -> Option<Vec<TimeInterval>> {
        if let Some((slot, allocation)) = self.find_whole_slot(state, demand) {
            state.commit(&slot, &allocation, self.options.buffer_minutes);
            log_changes!(
                self.options.verbosity,
                "Placed {} at {} - {}",
                demand.task.id,
                allocation.start,
                allocation.end
            );
            return Some(vec![allocation]);
        }

        if !self.options.allow_split {
            log_checks!(
                self.options.verbosity,
                "No slot holds {} ({} min) whole",
                demand.task.id,
                demand.minutes
            );
            return None;
        }

        let (allocations, next) = self.allocate_split(state, demand)?;
        log_changes!(
            self.options.verbosity,
            "Split {} into {} segments",
            demand.task.id,
            allocations.len()
        );
        *state = next;
        Some(allocations)
    }

    /// Best slot able to hold the whole task, with the allocation inside it.
    pub fn find_whole_slot(
        &self,
        state: &AllocationState,
        demand: &TaskDemand<'_>,
    ) -> Option<(TimeInterval, TimeInterval)> {
        let minutes = demand.minutes;
        let mut best: Option<(TimeInterval, TimeInterval, f64)> = None;

        for slot in &state.slots {
            if slot.duration_minutes() < minutes {
                continue;
            }
            let Some(allocation) = TimeInterval::from_minutes(slot.start, minutes) else {
                continue;
            };
            if demand.cutoff.is_some_and(|cutoff| allocation.end > cutoff) {
                log_checks!(
                    self.options.verbosity,
                    "  slot {} ends past cutoff for {}",
                    slot.start,
                    demand.task.id
                );
                continue;
            }
            if let Some(capacity) = self.capacity_cap(&state.load, slot, demand.relaxed) {
                if capacity < minutes {
                    log_checks!(
                        self.options.verbosity,
                        "  {} has {} min left, {} needs {}",
                        slot.date(),
                        capacity,
                        demand.task.id,
                        minutes
                    );
                    continue;
                }
            }

            let score = self.score(&state.load, slot, allocation, demand);
            log_debug!(
                self.options.verbosity,
                "  slot {} scores {:.3} for {}",
                slot.start,
                score,
                demand.task.id
            );
            let better = match &best {
                None => true,
                Some((best_slot, _, best_score)) => {
                    score > best_score + self.options.tie_epsilon
                        || ((score - best_score).abs() <= self.options.tie_epsilon
                            && slot.start < best_slot.start)
                }
            };
            if better {
                best = Some((*slot, allocation, score));
            }
        }

        best.map(|(slot, allocation, _)| (slot, allocation))
    }

    /// Spread the task over several slots.
    ///
    /// Works on a copy of `state`; returns the allocations together with the
    /// updated copy only if the full duration was placed.
    pub fn allocate_split(
        &self,
        state: &AllocationState,
        demand: &TaskDemand<'_>,
    ) -> Option<(Vec<TimeInterval>, AllocationState)> {
        let min_segment = self.options.min_segment_minutes;
        let mut remaining = demand.minutes;

        // Candidate segments, one per slot, scored against the current state
        let mut candidates: Vec<(TimeInterval, i64, f64)> = Vec::new();
        for slot in &state.slots {
            if demand.cutoff.is_some_and(|cutoff| slot.start > cutoff) {
                continue;
            }
            let capacity = self.capacity_cap(&state.load, slot, demand.relaxed);
            let available = capacity.map_or(slot.duration_minutes(), |c| {
                c.min(slot.duration_minutes())
            });
            let alloc = clamp_segment(remaining, available, min_segment);
            let alloc = widen_to_slot(alloc, remaining, slot.duration_minutes(), capacity, min_segment);
            if (alloc < min_segment && remaining > min_segment) || alloc <= 0 {
                continue;
            }
            let Some(allocation) = TimeInterval::from_minutes(slot.start, alloc) else {
                continue;
            };
            if demand.cutoff.is_some_and(|cutoff| allocation.end > cutoff) {
                continue;
            }
            let score = self.score(&state.load, slot, allocation, demand);
            candidates.push((*slot, alloc, score));
        }

        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
        log_checks!(
            self.options.verbosity,
            "Splitting {} ({} min) over {} candidate slots",
            demand.task.id,
            demand.minutes,
            candidates.len()
        );

        let max_segments = max_split_segments(demand.minutes);
        let mut attempt = state.clone_for_attempt();
        let mut allocations: Vec<TimeInterval> = Vec::new();

        for (slot, candidate_minutes, _) in candidates {
            if remaining <= 0 || allocations.len() >= max_segments {
                break;
            }
            if !attempt.contains_slot(&slot) {
                continue;
            }
            let mut alloc = remaining.min(candidate_minutes);
            if let Some(capacity) = self.capacity_cap(&attempt.load, &slot, demand.relaxed) {
                alloc = alloc.min(capacity);
            }
            if (alloc < min_segment && remaining > min_segment) || alloc <= 0 {
                continue;
            }
            // The last permitted segment has to finish the task
            if allocations.len() + 1 == max_segments && remaining - alloc > 0 {
                continue;
            }
            let Some(allocation) = TimeInterval::from_minutes(slot.start, alloc) else {
                continue;
            };
            if demand.cutoff.is_some_and(|cutoff| allocation.end > cutoff) {
                continue;
            }
            attempt.commit(&slot, &allocation, self.options.buffer_minutes);
            allocations.push(allocation);
            remaining -= alloc;
        }

        if remaining > 0 || allocations.is_empty() {
            log_checks!(
                self.options.verbosity,
                "Split of {} left {} min unplaced",
                demand.task.id,
                remaining
            );
            return None;
        }
        Some((allocations, attempt))
    }

    /// Minutes the slot's date can still take, or `None` when uncapped.
    fn capacity_cap(&self, load: &DailyLoad, slot: &TimeInterval, relaxed: bool) -> Option<i64> {
        if relaxed {
            return None;
        }
        self.limits.map(|limits| limits.remaining(load, slot.date()))
    }

    fn score(
        &self,
        load: &DailyLoad,
        slot: &TimeInterval,
        allocation: TimeInterval,
        demand: &TaskDemand<'_>,
    ) -> f64 {
        let candidate = SlotCandidate {
            slot,
            allocation,
            task: demand.task,
            cutoff: demand.cutoff,
            preferred_due: demand.preferred_due,
            committed_minutes: load.get(slot.date()),
            remaining_capacity: self.limits.map(|limits| limits.remaining(load, slot.date())),
        };
        self.scorer.score(&candidate)
    }
}
