//! Task ordering for placement.
//!
//! Tasks are placed greedily in sort-key order:
//! 1. priority weight, higher first
//! 2. deadline, earlier first, tasks without one last
//! 3. duration, direction chosen by `DurationTieBreak`
//! 4. input position
//!
//! The single-plan scheduler breaks duration ties longer-first so large tasks
//! get first pick of contiguous slots; the multi-plan builder goes
//! shorter-first to pack more items.

use chrono::NaiveDateTime;
use std::cmp::Ordering;

use crate::models::{priority_weight, Task};

/// Direction of the duration tie-break.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurationTieBreak {
    ShorterFirst,
    LongerFirst,
}

/// Sort key for task placement order (lower = placed earlier).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSortKey {
    pub neg_weight: i32,
    pub due_at: Option<NaiveDateTime>,
    /// Signed so that `LongerFirst` can store the negated duration.
    pub duration_key: i64,
    pub index: usize,
}

impl Ord for TaskSortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.neg_weight
            .cmp(&other.neg_weight)
            .then_with(|| cmp_due(self.due_at, other.due_at))
            .then(self.duration_key.cmp(&other.duration_key))
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for TaskSortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deadlines ascending; a missing deadline sorts after every present one.
fn cmp_due(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Compute the sort key of the task at `index`.
pub fn compute_sort_key(task: &Task, index: usize, tie_break: DurationTieBreak) -> TaskSortKey {
    let duration_key = match tie_break {
        DurationTieBreak::ShorterFirst => task.estimated_minutes,
        DurationTieBreak::LongerFirst => task.estimated_minutes.saturating_neg(),
    };
    TaskSortKey {
        neg_weight: -priority_weight(task.priority_level()),
        due_at: task.due_at,
        duration_key,
        index,
    }
}

/// Indices of `tasks` in placement order.
pub fn sort_tasks(tasks: &[Task], tie_break: DurationTieBreak) -> Vec<usize> {
    sort_task_subset(tasks, 0..tasks.len(), tie_break)
}

/// Placement order of a subset of `tasks`, given by index.
pub fn sort_task_subset(
    tasks: &[Task],
    indices: impl IntoIterator<Item = usize>,
    tie_break: DurationTieBreak,
) -> Vec<usize> {
    let mut keys: Vec<TaskSortKey> = indices
        .into_iter()
        .filter_map(|i| tasks.get(i).map(|t| compute_sort_key(t, i, tie_break)))
        .collect();
    keys.sort();
    keys.into_iter().map(|k| k.index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::NaiveDate;

    fn due(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_priority_dominates() {
        let tasks = vec![
            Task::new("low", "Low", 30).with_priority(Priority::Low).with_due(due(10)),
            Task::new("urgent", "Urgent", 30)
                .with_priority(Priority::Urgent)
                .with_due(due(20)),
            Task::new("none", "None", 30).with_due(due(9)),
        ];
        let order = sort_tasks(&tasks, DurationTieBreak::ShorterFirst);
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn test_missing_deadline_sorts_last() {
        let tasks = vec![
            Task::new("a", "A", 30).with_priority(Priority::High),
            Task::new("b", "B", 30)
                .with_priority(Priority::High)
                .with_due(due(25)),
        ];
        assert_eq!(sort_tasks(&tasks, DurationTieBreak::ShorterFirst), vec![1, 0]);
    }

    #[test]
    fn test_duration_tie_break_direction() {
        let tasks = vec![
            Task::new("long", "Long", 120).with_due(due(12)),
            Task::new("short", "Short", 30).with_due(due(12)),
        ];
        assert_eq!(sort_tasks(&tasks, DurationTieBreak::ShorterFirst), vec![1, 0]);
        assert_eq!(sort_tasks(&tasks, DurationTieBreak::LongerFirst), vec![0, 1]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let tasks = vec![
            Task::new("x", "X", 60),
            Task::new("y", "Y", 60),
            Task::new("z", "Z", 60),
        ];
        assert_eq!(sort_tasks(&tasks, DurationTieBreak::LongerFirst), vec![0, 1, 2]);
    }

    #[test]
    fn test_extreme_durations_do_not_overflow() {
        let tasks = vec![
            Task::new("min", "Min", i64::MIN),
            Task::new("max", "Max", i64::MAX),
        ];
        assert_eq!(sort_tasks(&tasks, DurationTieBreak::LongerFirst), vec![1, 0]);
        assert_eq!(sort_tasks(&tasks, DurationTieBreak::ShorterFirst), vec![0, 1]);
    }

    #[test]
    fn test_unknown_priority_label_weighs_zero() {
        let mut unknown = Task::new("x", "X", 60);
        unknown.priority = Some("someday".to_string());
        let tasks = vec![unknown, Task::new("low", "Low", 60).with_priority(Priority::Low)];
        assert_eq!(sort_tasks(&tasks, DurationTieBreak::ShorterFirst), vec![1, 0]);
    }

    #[test]
    fn test_subset_ordering() {
        let tasks = vec![
            Task::new("a", "A", 60).with_priority(Priority::Low),
            Task::new("b", "B", 60).with_priority(Priority::Medium),
            Task::new("c", "C", 60).with_priority(Priority::Urgent),
        ];
        let order = sort_task_subset(&tasks, [0, 1], DurationTieBreak::ShorterFirst);
        assert_eq!(order, vec![1, 0]);
    }
}
