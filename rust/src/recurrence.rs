//! Expansion of weekly course rules into dated occurrences.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use rustc_hash::FxHashMap;

use crate::interval::TimeInterval;
use crate::models::{BellScheduleNode, CourseDefinition, CourseOccurrence, CourseRule};

/// Teaching week of `date`, counted from 1 at `semester_start`.
///
/// Without a known semester start every date is week 1. Dates before the
/// semester start return `None`.
pub fn week_number(semester_start: Option<NaiveDate>, date: NaiveDate) -> Option<i64> {
    let Some(start) = semester_start else {
        return Some(1);
    };
    let days = (date - start).num_days();
    if days < 0 {
        return None;
    }
    Some(days / 7 + 1)
}

/// True when `rule` meets on an ISO weekday `day_of_week` of week `week`.
pub fn rule_matches(rule: &CourseRule, week: i64, day_of_week: u32) -> bool {
    rule.day_of_week == day_of_week
        && week >= rule.start_week
        && week <= rule.end_week
        && rule.parity.matches(week)
}

/// Node index to clock-time lookup.
#[derive(Clone, Debug, Default)]
pub struct BellSchedule {
    nodes: FxHashMap<i32, BellScheduleNode>,
}

impl BellSchedule {
    /// Build the lookup; a repeated node index keeps the last entry.
    pub fn new(nodes: impl IntoIterator<Item = BellScheduleNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.node, n)).collect(),
        }
    }

    pub fn get(&self, node: i32) -> Option<&BellScheduleNode> {
        self.nodes.get(&node)
    }

    /// Clock span covered by `step` consecutive nodes starting at `start_node`.
    ///
    /// `None` if either end node is missing.
    pub fn span(&self, start_node: i32, step: i32) -> Option<(NaiveTime, NaiveTime)> {
        let first = self.get(start_node)?;
        let last = self.get(start_node.checked_add(step.max(1) - 1)?)?;
        Some((first.start_time, last.end_time))
    }

    /// Clock windows of nodes `first..=last`, by node order, skipping
    /// windows that do not end after they start.
    pub fn windows(&self, first: i32, last: i32) -> Vec<(NaiveTime, NaiveTime)> {
        let mut nodes: Vec<&BellScheduleNode> = self
            .nodes
            .values()
            .filter(|n| n.node >= first && n.node <= last)
            .collect();
        nodes.sort_by_key(|n| n.node);
        nodes
            .into_iter()
            .filter(|n| n.end_time > n.start_time)
            .map(|n| (n.start_time, n.end_time))
            .collect()
    }
}

/// Concrete interval of `rule` on `date`.
///
/// An end clock time not after the start clock time crosses midnight.
pub fn resolve_interval(
    rule: &CourseRule,
    date: NaiveDate,
    bells: &BellSchedule,
) -> Option<TimeInterval> {
    let (start, end) = bells.span(rule.start_node, rule.step_node_count)?;
    let start_at = date.and_time(start);
    let mut end_at = date.and_time(end);
    if end <= start {
        end_at = end_at.checked_add_signed(Duration::days(1))?;
    }
    TimeInterval::new(start_at, end_at)
}

/// Expands course rules over a date range.
pub struct RecurrenceExpander<'a> {
    rules: &'a [CourseRule],
    bells: &'a BellSchedule,
    course_names: FxHashMap<i32, &'a str>,
    semester_start: Option<NaiveDate>,
}

impl<'a> RecurrenceExpander<'a> {
    pub fn new(
        rules: &'a [CourseRule],
        bells: &'a BellSchedule,
        courses: &'a [CourseDefinition],
        semester_start: Option<NaiveDate>,
    ) -> Self {
        Self {
            rules,
            bells,
            course_names: courses.iter().map(|c| (c.id, c.name.as_str())).collect(),
            semester_start,
        }
    }

    /// Every occurrence on dates in `[start_date, end_date)`, by date then rule order.
    pub fn expand(&self, start_date: NaiveDate, end_date: NaiveDate) -> Vec<CourseOccurrence> {
        let mut occurrences = Vec::new();
        let mut date = start_date;
        while date < end_date {
            occurrences.extend(self.expand_date(date));
            date += Duration::days(1);
        }
        occurrences
    }

    /// Occurrences on a single date.
    pub fn expand_date(&self, date: NaiveDate) -> Vec<CourseOccurrence> {
        let Some(week) = week_number(self.semester_start, date) else {
            return Vec::new();
        };
        let weekday = date.weekday().number_from_monday();

        self.rules
            .iter()
            .filter(|rule| rule_matches(rule, week, weekday))
            .filter_map(|rule| {
                let interval = resolve_interval(rule, date, self.bells)?;
                Some(CourseOccurrence {
                    title: self.title_of(rule),
                    details: course_details(rule),
                    interval,
                })
            })
            .collect()
    }

    fn title_of(&self, rule: &CourseRule) -> String {
        self.course_names
            .get(&rule.course_ref)
            .map(|name| name.to_string())
            .unwrap_or_else(|| "Course".to_string())
    }
}

/// `room · teacher`, leaving out blank parts.
fn course_details(rule: &CourseRule) -> String {
    [rule.room.as_deref(), rule.teacher.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" · ")
}

/// Minutes of course time per start date.
pub fn minutes_by_date(occurrences: &[CourseOccurrence]) -> FxHashMap<NaiveDate, i64> {
    let mut totals: FxHashMap<NaiveDate, i64> = FxHashMap::default();
    for occurrence in occurrences {
        *totals.entry(occurrence.interval.date()).or_insert(0) +=
            occurrence.interval.duration_minutes();
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeekParity;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn bells() -> BellSchedule {
        BellSchedule::new([
            BellScheduleNode { node: 1, start_time: t(8, 30), end_time: t(9, 15) },
            BellScheduleNode { node: 2, start_time: t(9, 25), end_time: t(10, 10) },
            BellScheduleNode { node: 3, start_time: t(10, 30), end_time: t(11, 15) },
            BellScheduleNode { node: 11, start_time: t(22, 0), end_time: t(0, 30) },
        ])
    }

    fn rule(day_of_week: u32, start_node: i32, step: i32) -> CourseRule {
        CourseRule {
            day_of_week,
            start_week: 1,
            end_week: 16,
            parity: WeekParity::Every,
            start_node,
            step_node_count: step,
            room: Some("A101".to_string()),
            teacher: Some("Dr. Lin".to_string()),
            course_ref: 7,
        }
    }

    #[test]
    fn test_week_number() {
        // 2025-09-01 is a Monday
        let start = Some(d(9, 1));
        assert_eq!(week_number(start, d(9, 1)), Some(1));
        assert_eq!(week_number(start, d(9, 7)), Some(1));
        assert_eq!(week_number(start, d(9, 8)), Some(2));
        assert_eq!(week_number(start, d(8, 31)), None);
        assert_eq!(week_number(None, d(3, 3)), Some(1));
    }

    #[test]
    fn test_rule_matches_parity_and_range() {
        let mut r = rule(3, 1, 2);
        r.parity = WeekParity::Odd;
        assert!(rule_matches(&r, 3, 3));
        assert!(!rule_matches(&r, 4, 3));
        assert!(!rule_matches(&r, 3, 4));
        assert!(!rule_matches(&r, 17, 3));
    }

    #[test]
    fn test_expand_resolves_bell_span() {
        let rules = vec![rule(3, 1, 2)];
        let bells = bells();
        let courses = vec![CourseDefinition { id: 7, name: "Linear Algebra".to_string() }];
        let expander = RecurrenceExpander::new(&rules, &bells, &courses, Some(d(9, 1)));

        let occurrences = expander.expand(d(9, 8), d(9, 15));
        assert_eq!(occurrences.len(), 1);
        let occ = &occurrences[0];
        assert_eq!(occ.title, "Linear Algebra");
        assert_eq!(occ.details, "A101 · Dr. Lin");
        assert_eq!(occ.interval.start, d(9, 10).and_time(t(8, 30)));
        assert_eq!(occ.interval.end, d(9, 10).and_time(t(10, 10)));
    }

    #[test]
    fn test_missing_node_skips_rule() {
        let rules = vec![rule(3, 3, 2)];
        let bells = bells();
        let expander = RecurrenceExpander::new(&rules, &bells, &[], None);
        assert!(expander.expand(d(9, 8), d(9, 15)).is_empty());
    }

    #[test]
    fn test_oversized_node_span_skips_rule() {
        let rules = vec![rule(3, i32::MAX, i32::MAX)];
        let bells = bells();
        let expander = RecurrenceExpander::new(&rules, &bells, &[], None);
        assert!(expander.expand(d(9, 8), d(9, 15)).is_empty());
    }

    #[test]
    fn test_midnight_crossing() {
        let r = rule(3, 11, 1);
        let interval = resolve_interval(&r, d(9, 10), &bells()).unwrap();
        assert_eq!(interval.end, d(9, 11).and_time(t(0, 30)));
        assert_eq!(interval.duration_minutes(), 150);
    }

    #[test]
    fn test_defaults_for_unknown_course_and_blank_details() {
        let mut r = rule(3, 1, 1);
        r.room = Some("  ".to_string());
        r.teacher = None;
        let rules = vec![r];
        let bells = bells();
        let expander = RecurrenceExpander::new(&rules, &bells, &[], None);
        let occurrences = expander.expand_date(d(9, 10));
        assert_eq!(occurrences[0].title, "Course");
        assert_eq!(occurrences[0].details, "");
    }

    #[test]
    fn test_before_semester_yields_nothing() {
        let rules = vec![rule(3, 1, 2)];
        let bells = bells();
        let expander = RecurrenceExpander::new(&rules, &bells, &[], Some(d(9, 15)));
        assert!(expander.expand(d(9, 8), d(9, 15)).is_empty());
    }

    #[test]
    fn test_preferred_windows_sorted_and_filtered() {
        let windows = bells().windows(1, 10);
        assert_eq!(
            windows,
            vec![(t(8, 30), t(9, 15)), (t(9, 25), t(10, 10)), (t(10, 30), t(11, 15))]
        );
    }

    #[test]
    fn test_minutes_by_date() {
        let rules = vec![rule(3, 1, 2), rule(3, 3, 1)];
        let bells = bells();
        let expander = RecurrenceExpander::new(&rules, &bells, &[], None);
        let totals = minutes_by_date(&expander.expand_date(d(9, 10)));
        assert_eq!(totals.get(&d(9, 10)), Some(&(100 + 45)));
    }
}
