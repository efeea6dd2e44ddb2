//! Configuration types for the planning engine.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};
use crate::models::SchedulingMode;
use crate::request::clock_format;
use crate::scoring::{BonusWeights, ScoringStrategy};

const MINUTES_PER_DAY: i64 = 24 * 60;
const MAX_LEAD_HOURS: i64 = 7 * 24;

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Soft daily effort cap for task work.
///
/// `limit(date) = max(min_daily_limit, daily_limit - course - fixed + bonus)`
/// where the bonus is `weekend_bonus` on Saturday/Sunday and
/// `light_day_bonus` on weekdays with at most `light_day_course_threshold`
/// minutes of class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityPolicy {
    pub daily_limit_minutes: i64,
    pub min_daily_limit_minutes: i64,
    pub weekend_bonus_minutes: i64,
    pub light_day_bonus_minutes: i64,
    pub light_day_course_threshold: i64,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            daily_limit_minutes: 240,
            min_daily_limit_minutes: 120,
            weekend_bonus_minutes: 120,
            light_day_bonus_minutes: 60,
            light_day_course_threshold: 60,
        }
    }
}

/// Configuration of the single-plan (splitting) scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Scoring strategy: "additive" or "weighted"
    pub strategy: String,
    /// Preset used when `strategy` is "weighted"
    pub mode: SchedulingMode,
    /// Global wake window start
    #[serde(with = "clock_format")]
    pub day_start: NaiveTime,
    /// Global sleep window start
    #[serde(with = "clock_format")]
    pub day_end: NaiveTime,
    /// Padding carved out on both sides of every allocation
    pub buffer_minutes: i64,
    /// Shortest split segment; also the minimum effective task duration
    pub min_segment_minutes: i64,
    /// Whether tasks may be split across slots
    pub allow_split: bool,
    /// Placed tasks re-released by the relaxation pass
    pub max_backtrack_tasks: usize,
    /// Horizon when no task deadline extends it
    pub default_horizon_days: u64,
    /// The preferred finish time sits this far ahead of the deadline
    pub preferred_due_lead_hours: i64,
    /// Bell nodes (inclusive) whose periods count as preferred windows
    pub preferred_nodes: (i32, i32),
    /// 0 silent, 1 changes, 2 checks, 3 debug
    pub verbosity: u8,
    pub capacity: CapacityPolicy,
    pub bonuses: BonusWeights,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            strategy: "additive".to_string(),
            mode: SchedulingMode::Balanced,
            day_start: clock(8, 0),
            day_end: clock(23, 0),
            buffer_minutes: 15,
            min_segment_minutes: 45,
            allow_split: true,
            max_backtrack_tasks: 2,
            default_horizon_days: 3,
            preferred_due_lead_hours: 6,
            preferred_nodes: (1, 10),
            verbosity: 0,
            capacity: CapacityPolicy::default(),
            bonuses: BonusWeights::default(),
        }
    }
}

impl PlannerConfig {
    /// Load a configuration from TOML; omitted keys take their defaults.
    pub fn from_toml_str(source: &str) -> PlannerResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> PlannerResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> PlannerResult<()> {
        if !ScoringStrategy::NAMES.contains(&self.strategy.as_str()) {
            return Err(PlannerError::InvalidConfig(format!(
                "unknown scoring strategy: {}",
                self.strategy
            )));
        }
        if self.day_end <= self.day_start {
            return Err(PlannerError::InvalidConfig(
                "day_end must be after day_start".to_string(),
            ));
        }
        if self.min_segment_minutes <= 0 {
            return Err(PlannerError::InvalidConfig(
                "min_segment_minutes must be positive".to_string(),
            ));
        }
        if !(0..=MINUTES_PER_DAY).contains(&self.buffer_minutes) {
            return Err(PlannerError::InvalidConfig(format!(
                "buffer_minutes must be within 0..={}",
                MINUTES_PER_DAY
            )));
        }
        if !(0..=MAX_LEAD_HOURS).contains(&self.preferred_due_lead_hours) {
            return Err(PlannerError::InvalidConfig(format!(
                "preferred_due_lead_hours must be within 0..={}",
                MAX_LEAD_HOURS
            )));
        }
        if self.bonuses.capacity_divisor <= 0 {
            return Err(PlannerError::InvalidConfig(
                "capacity_divisor must be positive".to_string(),
            ));
        }
        if self.preferred_nodes.0 > self.preferred_nodes.1 {
            return Err(PlannerError::InvalidConfig(format!(
                "preferred_nodes range is inverted: {:?}",
                self.preferred_nodes
            )));
        }
        Ok(())
    }

    /// Build the scorer this configuration selects.
    pub fn scorer(&self) -> PlannerResult<ScoringStrategy> {
        ScoringStrategy::from_name(&self.strategy, &self.bonuses, self.mode)
    }
}

/// Defaults applied when reading multi-plan requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPlanConfig {
    #[serde(with = "clock_format")]
    pub day_start: NaiveTime,
    /// Also the fallback when a requested window does not end after it starts
    #[serde(with = "clock_format")]
    pub day_end: NaiveTime,
    pub default_task_minutes: i64,
    pub min_task_minutes: i64,
    pub default_importance: i32,
    /// Scores closer than this count as tied; the earlier start wins
    pub tie_epsilon: f64,
    pub verbosity: u8,
}

impl Default for AutoPlanConfig {
    fn default() -> Self {
        Self {
            day_start: clock(8, 0),
            day_end: clock(23, 30),
            default_task_minutes: 60,
            min_task_minutes: 15,
            default_importance: 1,
            tie_epsilon: 0.001,
            verbosity: 0,
        }
    }
}
