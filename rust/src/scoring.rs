//! Slot scoring strategies.
//!
//! Two scorers rate a candidate allocation; higher is better:
//! - `additive`: bonus sum over preferred windows, deadline slack, daily
//!   capacity and daytime placement (single-plan scheduler default)
//! - `weighted`: weighted blend of type match, deadline urgency and daily
//!   balance, parameterised by a `SchedulingMode` preset (multi-plan builder)

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};
use crate::interval::TimeInterval;
use crate::models::{SchedulingMode, Task, TaskType};
use crate::request::clock_format;

/// Everything a scorer may look at for one (slot, task) pairing.
#[derive(Clone, Copy, Debug)]
pub struct SlotCandidate<'a> {
    /// Free slot the allocation is carved from.
    pub slot: &'a TimeInterval,
    /// The allocation itself, starting at `slot.start`.
    pub allocation: TimeInterval,
    pub task: &'a Task,
    /// Hard deadline the allocation must end by.
    pub cutoff: Option<NaiveDateTime>,
    /// Softer "finish by" time ahead of the deadline.
    pub preferred_due: Option<NaiveDateTime>,
    /// Task minutes already committed on the slot's date.
    pub committed_minutes: i64,
    /// Minutes left under the slot date's daily limit; `None` when unlimited.
    pub remaining_capacity: Option<i64>,
}

/// Rates candidate allocations. Strictly higher scores are preferred.
pub trait SlotScorer {
    fn score(&self, candidate: &SlotCandidate<'_>) -> f64;

    fn name(&self) -> &'static str;
}

/// Bonus values of the additive scorer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusWeights {
    pub preferred_slot: i64,
    pub preferred_due: i64,
    pub cutoff_closeness: i64,
    pub daytime: i64,
    #[serde(with = "clock_format")]
    pub daytime_start: NaiveTime,
    #[serde(with = "clock_format")]
    pub daytime_end: NaiveTime,
    /// Daytime bonus needs at least this much remaining daily capacity.
    pub daytime_min_capacity: i64,
    /// Remaining capacity is divided by this before being added.
    pub capacity_divisor: i64,
}

impl Default for BonusWeights {
    fn default() -> Self {
        Self {
            preferred_slot: 600,
            preferred_due: 250,
            cutoff_closeness: 300,
            daytime: 200,
            daytime_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            daytime_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            daytime_min_capacity: 180,
            capacity_divisor: 5,
        }
    }
}

/// Additive-bonus scorer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdditiveScorer {
    pub bonuses: BonusWeights,
}

impl AdditiveScorer {
    pub fn new(bonuses: BonusWeights) -> Self {
        Self { bonuses }
    }

    fn is_daytime(&self, time: NaiveTime) -> bool {
        time >= self.bonuses.daytime_start && time < self.bonuses.daytime_end
    }
}

impl SlotScorer for AdditiveScorer {
    fn score(&self, candidate: &SlotCandidate<'_>) -> f64 {
        let b = &self.bonuses;
        let end = candidate.allocation.end;
        let mut score: i64 = 0;

        if candidate.slot.preferred {
            score += b.preferred_slot;
        }
        if let Some(preferred_due) = candidate.preferred_due {
            if end <= preferred_due {
                score += b.preferred_due;
            }
        }
        if let Some(cutoff) = candidate.cutoff {
            let minutes_to_cutoff = (cutoff - end).num_minutes();
            if minutes_to_cutoff >= 0 {
                score += (b.cutoff_closeness - minutes_to_cutoff).max(0);
            }
        }
        match candidate.remaining_capacity {
            Some(remaining) => {
                score += remaining / b.capacity_divisor.max(1);
                if remaining >= b.daytime_min_capacity && self.is_daytime(candidate.slot.start.time())
                {
                    score += b.daytime;
                }
            }
            None => {
                if self.is_daytime(candidate.slot.start.time()) {
                    score += b.daytime;
                }
            }
        }

        score as f64
    }

    fn name(&self) -> &'static str {
        "additive"
    }
}

/// Blend weights of the weighted scorer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringWeights {
    pub type_weight: f64,
    pub urgency_weight: f64,
    pub balance_weight: f64,
}

impl ScoringWeights {
    /// Preset weights for a scheduling mode.
    pub fn for_mode(mode: SchedulingMode) -> Self {
        let (type_weight, urgency_weight, balance_weight) = match mode {
            SchedulingMode::Urgent => (0.2, 0.6, 0.2),
            SchedulingMode::Relaxed => (0.5, 0.2, 0.3),
            SchedulingMode::Balanced => (0.4, 0.4, 0.2),
        };
        Self {
            type_weight,
            urgency_weight,
            balance_weight,
        }
    }
}

/// Weighted scorer: `type·typeMatch + urgency·ddlUrgency + balance·balance`.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedScorer {
    pub weights: ScoringWeights,
    /// Starts at or after this clock time count as evening.
    pub evening_start: NaiveTime,
}

impl WeightedScorer {
    pub fn new(mode: SchedulingMode) -> Self {
        Self {
            weights: ScoringWeights::for_mode(mode),
            evening_start: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// How well the start time suits the kind of work.
    pub fn type_match(&self, kind: TaskType, start: NaiveTime) -> f64 {
        let daytime = start < self.evening_start;
        match (kind, daytime) {
            (TaskType::Focus, true) => 1.0,
            (TaskType::Focus, false) => 0.5,
            (TaskType::Light, true) => 0.7,
            (TaskType::Light, false) => 1.0,
        }
    }

    /// `1 / (1 + days until deadline)`, or 0.2 without a deadline.
    pub fn deadline_urgency(deadline: Option<NaiveDateTime>, start: NaiveDateTime) -> f64 {
        match deadline {
            Some(ddl) => {
                let days = (ddl.date() - start.date()).num_days().max(0);
                1.0 / (1.0 + days as f64)
            }
            None => 0.2,
        }
    }

    /// `1 / (1 + hours already loaded that day)`.
    pub fn balance(committed_minutes: i64) -> f64 {
        1.0 / (1.0 + committed_minutes as f64 / 60.0)
    }
}

impl SlotScorer for WeightedScorer {
    fn score(&self, candidate: &SlotCandidate<'_>) -> f64 {
        let start = candidate.allocation.start;
        let type_match = self.type_match(candidate.task.kind(), start.time());
        let urgency = Self::deadline_urgency(candidate.task.due_at, start);
        let balance = Self::balance(candidate.committed_minutes);

        self.weights.type_weight * type_match
            + self.weights.urgency_weight * urgency
            + self.weights.balance_weight * balance
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}

/// Runtime-selectable scorer.
#[derive(Clone, Debug, PartialEq)]
pub enum ScoringStrategy {
    Additive(AdditiveScorer),
    Weighted(WeightedScorer),
}

impl ScoringStrategy {
    /// Strategy names accepted by `from_name`.
    pub const NAMES: [&'static str; 2] = ["additive", "weighted"];

    /// Select a strategy by name. `bonuses` feed the additive scorer and
    /// `mode` picks the weighted preset.
    pub fn from_name(
        name: &str,
        bonuses: &BonusWeights,
        mode: SchedulingMode,
    ) -> PlannerResult<Self> {
        match name {
            "additive" => Ok(Self::Additive(AdditiveScorer::new(bonuses.clone()))),
            "weighted" => Ok(Self::Weighted(WeightedScorer::new(mode))),
            other => Err(PlannerError::InvalidConfig(format!(
                "unknown scoring strategy: {}",
                other
            ))),
        }
    }
}

impl SlotScorer for ScoringStrategy {
    fn score(&self, candidate: &SlotCandidate<'_>) -> f64 {
        match self {
            Self::Additive(s) => s.score(candidate),
            Self::Weighted(s) => s.score(candidate),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Additive(s) => s.name(),
            Self::Weighted(s) => s.name(),
        }
    }
}
