//! Single-plan scheduler.
//!
//! One scheduling run:
//! 1. Expand course rules over the horizon and collect fixed tasks
//! 2. Build the free-slot pool around them
//! 3. Place pending tasks greedily in priority order, splitting if needed
//! 4. If anything is left over, run the relaxation pass once
//!
//! The relaxation pass re-releases the last few placed tasks together with
//! every unplaced one, lifts the daily cap for them, moves them to the end of
//! the order and reruns step 3 from the original pool. Its result replaces the
//! first pass.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::PlannerConfig;
use crate::error::PlannerResult;
use crate::interval::TimeInterval;
use crate::models::{
    BellScheduleNode, CourseDefinition, CourseOccurrence, CourseRule, ScheduleOutcome,
    ScheduledItem, Task,
};
use crate::recurrence::{minutes_by_date, BellSchedule, RecurrenceExpander};
use crate::scoring::{ScoringStrategy, SlotScorer};
use crate::sorting::{sort_task_subset, DurationTieBreak};
use crate::{log_changes, log_debug};

use super::allocator::{Allocator, AllocatorOptions, TaskDemand};
use super::capacity::{DailyLimits, DailyLoad};
use super::free_slots::FreeSlotBuilder;
use super::state::AllocationState;

/// Everything one single-plan run needs.
#[derive(Clone, Debug, Default)]
pub struct PlanningInput {
    pub now: NaiveDateTime,
    pub semester_start: Option<NaiveDate>,
    pub course_rules: Vec<CourseRule>,
    pub bell_schedule: Vec<BellScheduleNode>,
    pub courses: Vec<CourseDefinition>,
    pub tasks: Vec<Task>,
}

impl PlanningInput {
    pub fn new(now: NaiveDateTime, tasks: Vec<Task>) -> Self {
        Self {
            now,
            tasks,
            ..Default::default()
        }
    }
}

/// Exclusive end date of the planning horizon.
///
/// Covers `default_days` from today and every task deadline; without tasks it
/// is just today plus `default_days`.
pub fn schedule_end_date(now: NaiveDateTime, tasks: &[Task], default_days: u64) -> NaiveDate {
    let today = now.date();
    let fallback = today.checked_add_days(Days::new(default_days)).unwrap_or(today);
    if tasks.is_empty() {
        return fallback;
    }
    let latest = tasks
        .iter()
        .filter_map(|t| t.due_at.map(|due| due.date()))
        .fold(fallback, NaiveDate::max);
    latest.checked_add_days(Days::new(1)).unwrap_or(latest)
}

/// Derived, read-only inputs shared by both passes.
struct PlanningContext {
    start_date: NaiveDate,
    end_date: NaiveDate,
    courses: Vec<CourseOccurrence>,
    /// Fixed task index and the interval it occupies
    fixed: Vec<(usize, TimeInterval)>,
    pending: Vec<usize>,
    limits: DailyLimits,
    free_slots: Vec<TimeInterval>,
    fixed_load: DailyLoad,
}

/// Outcome of one ordered allocation pass.
#[derive(Debug, Default)]
struct PassResult {
    allocations: Vec<(usize, Vec<TimeInterval>)>,
    placed: Vec<usize>,
    unplaced: Vec<usize>,
}

/// Order and relaxed set for the second pass.
///
/// The last `k` placed tasks plus every unplaced task are relaxed and moved
/// behind all other tasks, keeping relative order inside both groups.
fn relaxation_order(order: &[usize], first: &PassResult, k: usize) -> (Vec<usize>, FxHashSet<usize>) {
    let skip = first.placed.len().saturating_sub(k);
    let relaxed: FxHashSet<usize> = first.placed[skip..]
        .iter()
        .chain(first.unplaced.iter())
        .copied()
        .collect();

    let mut reordered: Vec<usize> = order.iter().copied().filter(|i| !relaxed.contains(i)).collect();
    reordered.extend(order.iter().copied().filter(|i| relaxed.contains(i)));
    (reordered, relaxed)
}

/// Scheduler for the single-plan variant.
pub struct Planner {
    config: PlannerConfig,
    scorer: ScoringStrategy,
}

impl Planner {
    /// Create a planner; fails only on an invalid configuration.
    pub fn new(config: PlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        let scorer = config.scorer()?;
        Ok(Self { config, scorer })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Run the scheduler.
    pub fn schedule(&self, input: &PlanningInput) -> ScheduleOutcome {
        let verbosity = self.config.verbosity;
        let ctx = self.build_context(input);
        log_debug!(
            verbosity,
            "Horizon {} .. {} ({} scoring): {} courses, {} fixed, {} pending, {} free slots",
            ctx.start_date,
            ctx.end_date,
            self.scorer.name(),
            ctx.courses.len(),
            ctx.fixed.len(),
            ctx.pending.len(),
            ctx.free_slots.len()
        );

        let order = sort_task_subset(
            &input.tasks,
            ctx.pending.iter().copied(),
            DurationTieBreak::LongerFirst,
        );

        let first = self.run_pass(&ctx, &input.tasks, &order, &FxHashSet::default());
        let (result, relaxed) = if first.unplaced.is_empty() {
            (first, false)
        } else {
            let (reordered, relaxed_set) =
                relaxation_order(&order, &first, self.config.max_backtrack_tasks);
            log_changes!(
                verbosity,
                "{} task(s) unplaced, relaxing {} task(s)",
                first.unplaced.len(),
                relaxed_set.len()
            );
            (self.run_pass(&ctx, &input.tasks, &reordered, &relaxed_set), true)
        };

        let mut items: Vec<ScheduledItem> = ctx.courses.iter().map(ScheduledItem::course).collect();
        items.extend(
            ctx.fixed
                .iter()
                .map(|&(index, interval)| ScheduledItem::task(&input.tasks[index], interval, None)),
        );
        for (index, segments) in &result.allocations {
            let count = segments.len();
            for (i, segment) in segments.iter().enumerate() {
                items.push(ScheduledItem::task(
                    &input.tasks[*index],
                    *segment,
                    Some((i + 1, count)),
                ));
            }
        }
        items.sort_by(|a, b| {
            a.interval
                .start
                .cmp(&b.interval.start)
                .then_with(|| a.title.cmp(&b.title))
        });

        ScheduleOutcome {
            items,
            unplaced: result
                .unplaced
                .iter()
                .map(|&i| input.tasks[i].id.clone())
                .collect(),
            relaxed,
        }
    }

    fn build_context(&self, input: &PlanningInput) -> PlanningContext {
        let config = &self.config;
        let now = input.now;
        let start_date = now.date();
        let end_date = schedule_end_date(now, &input.tasks, config.default_horizon_days);

        let bells = BellSchedule::new(input.bell_schedule.iter().copied());
        let expander = RecurrenceExpander::new(
            &input.course_rules,
            &bells,
            &input.courses,
            input.semester_start,
        );
        let courses = expander.expand(start_date, end_date);

        let mut fixed = Vec::new();
        let mut pending = Vec::new();
        for (index, task) in input.tasks.iter().enumerate() {
            match task.fixed_scheduled_at {
                Some(at) => {
                    let minutes = if task.estimated_minutes > 0 {
                        task.estimated_minutes
                    } else {
                        config.min_segment_minutes
                    };
                    if let Some(interval) = TimeInterval::from_minutes(at, minutes) {
                        fixed.push((index, interval));
                    }
                }
                None => pending.push(index),
            }
        }

        let mut fixed_load = DailyLoad::new();
        let mut fixed_minutes: FxHashMap<NaiveDate, i64> = FxHashMap::default();
        for (_, interval) in &fixed {
            fixed_load.add(interval.date(), interval.duration_minutes());
            *fixed_minutes.entry(interval.date()).or_insert(0) += interval.duration_minutes();
        }
        let limits = DailyLimits::new(config.capacity.clone(), minutes_by_date(&courses), fixed_minutes);

        let blocked: Vec<TimeInterval> = courses
            .iter()
            .map(|c| c.interval)
            .chain(fixed.iter().map(|(_, interval)| *interval))
            .collect();
        let free_slots = FreeSlotBuilder::new(config.day_start, config.day_end)
            .not_before(now)
            .with_preferred_windows(bells.windows(config.preferred_nodes.0, config.preferred_nodes.1))
            .build(start_date, end_date, blocked);

        PlanningContext {
            start_date,
            end_date,
            courses,
            fixed,
            pending,
            limits,
            free_slots,
            fixed_load,
        }
    }

    fn allocator_options(&self) -> AllocatorOptions {
        AllocatorOptions {
            allow_split: self.config.allow_split,
            buffer_minutes: self.config.buffer_minutes,
            min_segment_minutes: self.config.min_segment_minutes,
            tie_epsilon: 0.001,
            verbosity: self.config.verbosity,
        }
    }

    /// Hard deadline of a task: its own, or the last horizon day's `day_end`.
    fn cutoff_for(&self, ctx: &PlanningContext, task: &Task) -> NaiveDateTime {
        task.due_at.unwrap_or_else(|| {
            (ctx.end_date - Days::new(1)).and_time(self.config.day_end)
        })
    }

    fn run_pass(
        &self,
        ctx: &PlanningContext,
        tasks: &[Task],
        order: &[usize],
        relaxed: &FxHashSet<usize>,
    ) -> PassResult {
        let mut state = AllocationState::new(ctx.free_slots.clone(), ctx.fixed_load.clone());
        let allocator = Allocator::new(&self.scorer, Some(&ctx.limits), self.allocator_options());
        let lead = Duration::hours(self.config.preferred_due_lead_hours);
        let mut result = PassResult::default();

        for &index in order {
            let task = &tasks[index];
            let cutoff = self.cutoff_for(ctx, task);
            let demand = TaskDemand {
                task,
                minutes: task.estimated_minutes.max(self.config.min_segment_minutes),
                cutoff: Some(cutoff),
                preferred_due: Some(cutoff.checked_sub_signed(lead).unwrap_or(cutoff).min(cutoff)),
                relaxed: relaxed.contains(&index),
            };
            match allocator.allocate(&mut state, &demand) {
                Some(mut segments) => {
                    segments.sort_by_key(|s| s.start);
                    result.allocations.push((index, segments));
                    result.placed.push(index);
                }
                None => {
                    log_changes!(self.config.verbosity, "Could not place {}", task.id);
                    result.unplaced.push(index);
                }
            }
        }
        result
    }
}
