//! Free-time scheduling engine for student study timetables.
//!
//! Given a weekly course timetable, a bell schedule and a list of tasks, the
//! engine finds free time and places each task into it:
//! - `planner::Planner` produces one schedule, splitting long tasks and
//!   retrying with a relaxed daily cap when something does not fit
//! - `multi_plan::PlanBuilder` produces three alternative plans from the same
//!   free time, one per weighting preset
//!
//! `request` holds the JSON boundary; the optional `python` feature exposes it
//! as a Python extension module.

pub mod config;
pub mod error;
pub mod interval;
pub mod logging;
pub mod models;
pub mod multi_plan;
pub mod planner;
pub mod recurrence;
pub mod request;
pub mod scoring;
pub mod sorting;

#[cfg(feature = "python")]
mod python;

pub use config::{AutoPlanConfig, CapacityPolicy, PlannerConfig};
pub use error::{PlannerError, PlannerResult};
pub use interval::{subtract, subtract_all, BusyTimeline, TimeInterval};
pub use models::{
    AutoPlanResult, BellScheduleNode, CourseDefinition, CourseOccurrence, CourseRule, ItemKind,
    PlanItem, Priority, ScheduleOutcome, SchedulePlan, ScheduledItem, SchedulingMode,
    SchedulingPreference, Task, TaskType, WeekParity,
};
pub use multi_plan::{AutoPlanInput, PlanBuilder};
pub use planner::{Planner, PlanningInput};
pub use request::{generate_auto_plans_json, generate_schedule_json};
pub use scoring::{AdditiveScorer, ScoringStrategy, SlotScorer, WeightedScorer};
