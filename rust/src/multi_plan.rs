//! Multi-plan builder.
//!
//! Builds three alternative plans from the same free-slot pool, one per
//! `SchedulingMode` weighting preset, always in the order Balanced, Urgent,
//! Relaxed. The Balanced plan is the reference for the overload list. Each plan is a single greedy pass with
//! whole-slot placement only: no splitting, no buffer, no daily cap, no
//! relaxation.

use chrono::{Days, NaiveDate};
use rustc_hash::FxHashSet;

use crate::config::AutoPlanConfig;
use crate::interval::TimeInterval;
use crate::log_changes;
use crate::models::{
    AutoPlanResult, PlanItem, SchedulePlan, SchedulingMode, SchedulingPreference, Task,
};
use crate::planner::{AllocationState, Allocator, AllocatorOptions, DailyLoad, FreeSlotBuilder, TaskDemand};
use crate::scoring::WeightedScorer;
use crate::sorting::{sort_tasks, DurationTieBreak};

/// Input of one multi-plan run.
#[derive(Clone, Debug)]
pub struct AutoPlanInput {
    /// Inclusive date range; `None` when missing or unparseable.
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub tasks: Vec<Task>,
    pub blocked: Vec<TimeInterval>,
    pub preference: SchedulingPreference,
}

/// Builds candidate plans for the request/response variant.
#[derive(Clone, Debug, Default)]
pub struct PlanBuilder {
    config: AutoPlanConfig,
}

impl PlanBuilder {
    pub fn new(config: AutoPlanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AutoPlanConfig {
        &self.config
    }

    /// Free slots covering every date of the inclusive range.
    pub fn free_slots(&self, input: &AutoPlanInput) -> Vec<TimeInterval> {
        let Some((start, end)) = input.range else {
            return Vec::new();
        };
        if end < start {
            return Vec::new();
        }
        FreeSlotBuilder::new(input.preference.day_start, input.preference.day_end).build(
            start,
            end.checked_add_days(Days::new(1)).unwrap_or(end),
            input.blocked.iter().copied(),
        )
    }

    /// One plan built with `mode`'s weights over its own copy of `slots`.
    pub fn build_plan(
        &self,
        plan_id: &str,
        mode: SchedulingMode,
        tasks: &[Task],
        slots: &[TimeInterval],
    ) -> SchedulePlan {
        let scorer = WeightedScorer::new(mode);
        let allocator = Allocator::new(
            &scorer,
            None,
            AllocatorOptions {
                allow_split: false,
                buffer_minutes: 0,
                min_segment_minutes: self.config.min_task_minutes,
                tie_epsilon: self.config.tie_epsilon,
                verbosity: self.config.verbosity,
            },
        );
        let mut state = AllocationState::new(slots.to_vec(), DailyLoad::new());
        let mut items = Vec::new();

        for index in sort_tasks(tasks, DurationTieBreak::ShorterFirst) {
            let task = &tasks[index];
            let demand = TaskDemand {
                task,
                minutes: task.estimated_minutes.max(self.config.min_task_minutes),
                cutoff: task.due_at,
                preferred_due: None,
                relaxed: false,
            };
            if let Some(segments) = allocator.allocate(&mut state, &demand) {
                items.extend(segments.into_iter().map(|interval| PlanItem {
                    task_id: task.id.clone(),
                    interval,
                }));
            }
        }

        items.sort_by_key(|item| item.interval.start);
        SchedulePlan {
            plan_id: plan_id.to_string(),
            label: mode.label().to_string(),
            mode,
            items,
        }
    }

    /// Build all three plans and the overload list of the reference plan.
    pub fn plan(&self, input: &AutoPlanInput) -> AutoPlanResult {
        let slots = self.free_slots(input);
        let plans: Vec<SchedulePlan> = SchedulingMode::ALL
            .into_iter()
            .enumerate()
            .map(|(i, mode)| self.build_plan(&format!("p{}", i + 1), mode, &input.tasks, &slots))
            .collect();

        let overload_tasks: Vec<String> = match plans.first() {
            Some(reference) => {
                let placed: FxHashSet<&str> =
                    reference.items.iter().map(|item| item.task_id.as_str()).collect();
                input
                    .tasks
                    .iter()
                    .filter(|t| !placed.contains(t.id.as_str()))
                    .map(|t| t.id.clone())
                    .collect()
            }
            None => input.tasks.iter().map(|t| t.id.clone()).collect(),
        };
        log_changes!(
            self.config.verbosity,
            "Built {} plans over {} slots, {} overload task(s)",
            plans.len(),
            slots.len(),
            overload_tasks.len()
        );

        AutoPlanResult {
            plans,
            overload_tasks,
        }
    }
}
