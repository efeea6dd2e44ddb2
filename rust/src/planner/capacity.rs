//! Daily task load and the per-date soft limit.

use chrono::{Datelike, NaiveDate, Weekday};
use rustc_hash::FxHashMap;

use crate::config::CapacityPolicy;

/// Minutes already committed to tasks, per date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DailyLoad {
    minutes: FxHashMap<NaiveDate, i64>,
}

impl DailyLoad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate) -> i64 {
        self.minutes.get(&date).copied().unwrap_or(0)
    }

    pub fn add(&mut self, date: NaiveDate, minutes: i64) {
        *self.minutes.entry(date).or_insert(0) += minutes;
    }
}

/// Per-date limit on task minutes for one scheduling run.
#[derive(Clone, Debug, Default)]
pub struct DailyLimits {
    policy: CapacityPolicy,
    course_minutes: FxHashMap<NaiveDate, i64>,
    fixed_minutes: FxHashMap<NaiveDate, i64>,
}

impl DailyLimits {
    pub fn new(
        policy: CapacityPolicy,
        course_minutes: FxHashMap<NaiveDate, i64>,
        fixed_minutes: FxHashMap<NaiveDate, i64>,
    ) -> Self {
        Self {
            policy,
            course_minutes,
            fixed_minutes,
        }
    }

    /// Task-minute limit for `date`, never below the policy floor.
    pub fn limit_for(&self, date: NaiveDate) -> i64 {
        let p = &self.policy;
        let course = self.course_minutes.get(&date).copied().unwrap_or(0);
        let fixed = self.fixed_minutes.get(&date).copied().unwrap_or(0);
        let mut limit = p.daily_limit_minutes - course - fixed;
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            limit += p.weekend_bonus_minutes;
        } else if course <= p.light_day_course_threshold {
            limit += p.light_day_bonus_minutes;
        }
        limit.max(p.min_daily_limit_minutes)
    }

    /// Minutes still available on `date` given `load`; never negative.
    pub fn remaining(&self, load: &DailyLoad, date: NaiveDate) -> i64 {
        (self.limit_for(date) - load.get(date)).max(0)
    }

    pub fn can_fit(&self, load: &DailyLoad, date: NaiveDate, minutes: i64) -> bool {
        self.remaining(load, date) >= minutes
    }
}
