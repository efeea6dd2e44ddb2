//! Core data types for the planning engine.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::interval::TimeInterval;

/// Task priority. Ordered from least to most pressing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Parse a priority label case-insensitively. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "urgent" => Some(Self::Urgent),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Map a numeric importance onto the priority scale (1 Low .. 4+ Urgent).
    pub fn from_importance(importance: i32) -> Self {
        match importance {
            i32::MIN..=1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::Urgent,
        }
    }

    pub fn weight(self) -> i32 {
        match self {
            Self::Urgent => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Sort weight of an optional priority; a missing or unknown priority weighs 0.
pub fn priority_weight(priority: Option<Priority>) -> i32 {
    priority.map(Priority::weight).unwrap_or(0)
}

/// Kind of effort a task needs, used by the weighted scorer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    /// Deep work, best placed in daytime.
    #[default]
    Focus,
    /// Light work, fine for evenings.
    Light,
}

impl TaskType {
    /// Parse a type label case-insensitively; anything unknown is `Focus`.
    pub fn parse(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()) {
            Some(l) if l == "light" => Self::Light,
            _ => Self::Focus,
        }
    }
}

/// A pending work item.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub due_at: Option<NaiveDateTime>,
    pub estimated_minutes: i64,
    /// Priority label as supplied by the caller; unknown labels weigh 0.
    pub priority: Option<String>,
    /// Free-form type label as supplied by the caller ("focus", "light", ...).
    pub task_type: Option<String>,
    pub course_ref: Option<String>,
    /// When present the task is already placed and only blocks time.
    pub fixed_scheduled_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, estimated_minutes: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            due_at: None,
            estimated_minutes,
            priority: None,
            task_type: None,
            course_ref: None,
            fixed_scheduled_at: None,
        }
    }

    pub fn with_due(mut self, due_at: NaiveDateTime) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority.label().to_string());
        self
    }

    pub fn with_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn with_course(mut self, course_ref: impl Into<String>) -> Self {
        self.course_ref = Some(course_ref.into());
        self
    }

    pub fn fixed_at(mut self, at: NaiveDateTime) -> Self {
        self.fixed_scheduled_at = Some(at);
        self
    }

    /// Parsed priority, `None` when missing or unknown.
    pub fn priority_level(&self) -> Option<Priority> {
        self.priority.as_deref().and_then(Priority::parse)
    }

    pub fn kind(&self) -> TaskType {
        TaskType::parse(self.task_type.as_deref())
    }
}

/// Odd/even week restriction of a course rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekParity {
    #[default]
    Every,
    Odd,
    Even,
}

impl WeekParity {
    /// Decode the numeric parity code used by timetable exports (0 every, 1 odd, 2 even).
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Odd,
            2 => Self::Even,
            _ => Self::Every,
        }
    }

    pub fn matches(self, week_number: i64) -> bool {
        match self {
            Self::Every => true,
            Self::Odd => week_number % 2 != 0,
            Self::Even => week_number % 2 == 0,
        }
    }
}

/// Recurring weekly course meeting.
#[derive(Clone, Debug, PartialEq)]
pub struct CourseRule {
    /// ISO day of week, 1 = Monday .. 7 = Sunday.
    pub day_of_week: u32,
    pub start_week: i64,
    pub end_week: i64,
    pub parity: WeekParity,
    pub start_node: i32,
    pub step_node_count: i32,
    pub room: Option<String>,
    pub teacher: Option<String>,
    pub course_ref: i32,
}

/// One entry of the bell schedule: node index to clock-time interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BellScheduleNode {
    pub node: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Course metadata referenced by rules.
#[derive(Clone, Debug, PartialEq)]
pub struct CourseDefinition {
    pub id: i32,
    pub name: String,
}

/// One concrete meeting of a course rule.
#[derive(Clone, Debug, PartialEq)]
pub struct CourseOccurrence {
    pub title: String,
    pub details: String,
    pub interval: TimeInterval,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Course,
    Task,
}

/// A course occurrence or a task allocation in the output calendar.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledItem {
    pub id: String,
    pub kind: ItemKind,
    pub title: String,
    pub details: String,
    pub interval: TimeInterval,
    pub due_at: Option<NaiveDateTime>,
    pub priority: Option<String>,
    pub estimated_minutes: i64,
}

impl ScheduledItem {
    pub fn course(occurrence: &CourseOccurrence) -> Self {
        Self {
            id: format!(
                "COURSE-{}-{}",
                occurrence.interval.date(),
                occurrence.title
            ),
            kind: ItemKind::Course,
            title: occurrence.title.clone(),
            details: occurrence.details.clone(),
            interval: occurrence.interval,
            due_at: None,
            priority: None,
            estimated_minutes: 0,
        }
    }

    /// Task allocation; `segment` is `(index, count)` for split tasks.
    pub fn task(task: &Task, interval: TimeInterval, segment: Option<(usize, usize)>) -> Self {
        let id = if task.id.trim().is_empty() {
            format!("TASK-{}", interval.start.format("%Y-%m-%dT%H:%M"))
        } else {
            task.id.clone()
        };
        let base = if task.title.is_empty() {
            "Task"
        } else {
            task.title.as_str()
        };
        let title = match segment {
            Some((index, count)) if count > 1 => format!("{} ({}/{})", base, index, count),
            _ => base.to_string(),
        };
        Self {
            id,
            kind: ItemKind::Task,
            title,
            details: task_details(task),
            interval,
            due_at: task.due_at,
            priority: task.priority.clone(),
            estimated_minutes: task.estimated_minutes,
        }
    }
}

fn task_details(task: &Task) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(priority) = task.priority.as_deref().filter(|p| !p.trim().is_empty()) {
        parts.push(format!("Priority:{}", priority));
    }
    if let Some(course) = task.course_ref.as_deref().filter(|c| !c.trim().is_empty()) {
        parts.push(format!("Course:{}", course));
    }
    if let Some(kind) = task.task_type.as_deref().filter(|t| !t.trim().is_empty()) {
        parts.push(format!("Type:{}", kind));
    }
    parts.join(" · ")
}

/// Result of a single-plan scheduling run.
#[derive(Clone, Debug, Default)]
pub struct ScheduleOutcome {
    /// Courses, fixed tasks and allocations ordered by start, then title.
    pub items: Vec<ScheduledItem>,
    /// Ids of pending tasks that could not be placed in the horizon.
    pub unplaced: Vec<String>,
    /// Whether the relaxation pass produced this result.
    pub relaxed: bool,
}

/// Weighting preset of the multi-plan builder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulingMode {
    Urgent,
    #[default]
    Balanced,
    Relaxed,
}

impl SchedulingMode {
    /// Canonical plan order: Balanced, Urgent, Relaxed.
    pub const ALL: [SchedulingMode; 3] = [Self::Balanced, Self::Urgent, Self::Relaxed];

    pub fn label(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::Balanced => "Balanced",
            Self::Relaxed => "Relaxed",
        }
    }
}

/// Day window for the multi-plan variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulingPreference {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
}

impl SchedulingPreference {
    /// Build a preference; a window that does not end after it starts falls
    /// back to `fallback_end`.
    pub fn new(day_start: NaiveTime, day_end: NaiveTime, fallback_end: NaiveTime) -> Self {
        let day_end = if day_end > day_start {
            day_end
        } else {
            fallback_end
        };
        Self { day_start, day_end }
    }
}

/// A single allocation inside a candidate plan.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanItem {
    pub task_id: String,
    pub interval: TimeInterval,
}

/// One candidate plan of the multi-plan builder.
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulePlan {
    pub plan_id: String,
    pub label: String,
    pub mode: SchedulingMode,
    pub items: Vec<PlanItem>,
}

/// Output of the multi-plan builder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoPlanResult {
    pub plans: Vec<SchedulePlan>,
    /// Tasks missing from the reference (first) plan.
    pub overload_tasks: Vec<String>,
}
