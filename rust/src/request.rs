//! Request and response documents at the engine boundary.
//!
//! Field names follow the camelCase JSON the timetable front end sends.
//! Parsing is lenient: a malformed optional value is treated as absent and a
//! malformed record is skipped, so only a structurally broken document fails.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::{AutoPlanConfig, PlannerConfig};
use crate::error::PlannerResult;
use crate::interval::TimeInterval;
use crate::models::{
    AutoPlanResult, BellScheduleNode, CourseDefinition, CourseRule, ItemKind, Priority,
    ScheduleOutcome, ScheduledItem, SchedulingPreference, Task, TaskType,
    WeekParity,
};
use crate::multi_plan::{AutoPlanInput, PlanBuilder};
use crate::planner::{Planner, PlanningInput};

/// Serde adapter for `HH:MM` clock fields.
pub mod clock_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_clock(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid clock time: {}", raw)))
    }
}

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

/// Parse an ISO-8601 date-time.
///
/// Offset forms keep their local wall-clock time; a bare date means midnight.
pub fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.naive_local());
        }
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Parse a 24-hour clock time, `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

fn opt_date_time(raw: Option<&str>) -> Option<NaiveDateTime> {
    raw.and_then(parse_date_time)
}

fn format_date_time(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateScheduleRequest {
    pub current_date_time: Option<String>,
    pub course_table: Option<CourseTablePayload>,
    pub tasks: Vec<TaskPayload>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseTablePayload {
    pub table_config: Option<TableConfigPayload>,
    pub time_nodes: Vec<TimeNodePayload>,
    pub courses: Vec<CoursePayload>,
    pub course_times: Vec<CourseTimePayload>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfigPayload {
    /// Semester start date, `YYYY-MM-DD`
    pub start_date: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeNodePayload {
    pub node: i32,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoursePayload {
    pub id: i32,
    pub course_name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseTimePayload {
    /// ISO weekday, 1 = Monday
    pub day: u32,
    pub start_week: i64,
    pub end_week: i64,
    /// 0 every week, 1 odd weeks, 2 even weeks
    #[serde(rename = "type")]
    pub parity: i32,
    pub start_node: i32,
    pub step: i32,
    pub room: Option<String>,
    pub teacher: Option<String>,
    /// Id of the course definition
    pub id: i32,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPayload {
    pub id: String,
    pub title: String,
    pub due_date_time: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub course_id: Option<String>,
    pub scheduled_date_time: Option<String>,
}

impl TaskPayload {
    pub fn to_task(&self) -> Task {
        Task {
            id: self.id.clone(),
            title: self.title.clone(),
            due_at: opt_date_time(self.due_date_time.as_deref()),
            estimated_minutes: self.estimated_minutes.unwrap_or(0),
            priority: self.priority.clone(),
            task_type: self.task_type.clone(),
            course_ref: self.course_id.clone(),
            fixed_scheduled_at: opt_date_time(self.scheduled_date_time.as_deref()),
        }
    }
}

impl GenerateScheduleRequest {
    /// Domain input; `now` is used when `currentDateTime` is missing or unparseable.
    pub fn to_input(&self, now: NaiveDateTime) -> PlanningInput {
        let now = opt_date_time(self.current_date_time.as_deref()).unwrap_or(now);
        let mut input = PlanningInput::new(now, self.tasks.iter().map(TaskPayload::to_task).collect());

        if let Some(table) = &self.course_table {
            input.semester_start = table
                .table_config
                .as_ref()
                .and_then(|c| c.start_date.as_deref())
                .and_then(parse_date);
            input.bell_schedule = table
                .time_nodes
                .iter()
                .filter_map(|n| {
                    Some(BellScheduleNode {
                        node: n.node,
                        start_time: parse_clock(n.start_time.as_deref()?)?,
                        end_time: parse_clock(n.end_time.as_deref()?)?,
                    })
                })
                .collect();
            input.courses = table
                .courses
                .iter()
                .map(|c| CourseDefinition {
                    id: c.id,
                    name: c.course_name.clone(),
                })
                .collect();
            input.course_rules = table
                .course_times
                .iter()
                .map(|r| CourseRule {
                    day_of_week: r.day,
                    start_week: r.start_week,
                    end_week: r.end_week,
                    parity: WeekParity::from_code(r.parity),
                    start_node: r.start_node,
                    step_node_count: r.step,
                    room: r.room.clone(),
                    teacher: r.teacher.clone(),
                    course_ref: r.id,
                })
                .collect();
        }
        input
    }
}

/// A scheduled item with everything a client needs to render it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub id: String,
    pub title: String,
    pub day: String,
    pub date: String,
    pub start_time: String,
    pub start_date_time: String,
    pub end_date_time: String,
    pub due_date_time: String,
    pub priority: String,
    pub estimated_minutes: i64,
    pub details: String,
}

impl From<&ScheduledItem> for ScheduleEntry {
    fn from(item: &ScheduledItem) -> Self {
        let start = item.interval.start;
        Self {
            kind: item.kind,
            id: item.id.clone(),
            title: item.title.clone(),
            day: weekday_name(start.weekday()).to_string(),
            date: start.date().format("%Y-%m-%d").to_string(),
            start_time: start.format("%H:%M").to_string(),
            start_date_time: format_date_time(start),
            end_date_time: format_date_time(item.interval.end),
            due_date_time: item.due_at.map(format_date_time).unwrap_or_default(),
            priority: item.priority.clone().unwrap_or_default(),
            estimated_minutes: item.estimated_minutes,
            details: item.details.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateScheduleResponse {
    pub items: Vec<ScheduleEntry>,
    pub unplaced_tasks: Vec<String>,
}

impl From<&ScheduleOutcome> for GenerateScheduleResponse {
    fn from(outcome: &ScheduleOutcome) -> Self {
        Self {
            items: outcome.items.iter().map(ScheduleEntry::from).collect(),
            unplaced_tasks: outcome.unplaced.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleAutoRequest {
    pub range: Option<RangePayload>,
    pub tasks: Vec<AutoTaskPayload>,
    pub timetable_blocked: Vec<BlockedPayload>,
    pub preferences: Option<PreferencePayload>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RangePayload {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoTaskPayload {
    pub id: Option<String>,
    pub ddl: Option<String>,
    pub duration_min: Option<i64>,
    pub importance: Option<i32>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub course_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlockedPayload {
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencePayload {
    /// Accepted and ignored; plans always come as Balanced, Urgent, Relaxed.
    pub mode: Option<String>,
    pub day_start: Option<String>,
    pub day_end: Option<String>,
}

impl ScheduleAutoRequest {
    /// Domain input with the defaults of `config` filled in.
    pub fn to_input(&self, config: &AutoPlanConfig) -> AutoPlanInput {
        let pref = self.preferences.clone().unwrap_or_default();
        let clock_or = |raw: Option<&str>, default: NaiveTime| raw.and_then(parse_clock).unwrap_or(default);
        let preference = SchedulingPreference::new(
            clock_or(pref.day_start.as_deref(), config.day_start),
            clock_or(pref.day_end.as_deref(), config.day_end),
            config.day_end,
        );
        // A start at or after the fallback end takes the whole default window
        let preference = if preference.day_end > preference.day_start {
            preference
        } else {
            SchedulingPreference {
                day_start: config.day_start,
                day_end: config.day_end,
                ..preference
            }
        };

        let range = self.range.as_ref().and_then(|r| {
            let start = r.start.as_deref().and_then(parse_date)?;
            let end = r.end.as_deref().and_then(parse_date)?;
            Some((start, end))
        });

        let tasks = self
            .tasks
            .iter()
            .enumerate()
            .map(|(index, t)| {
                let kind = TaskType::parse(t.task_type.as_deref());
                let importance = t.importance.unwrap_or(config.default_importance).max(1);
                Task {
                    id: t.id.clone().unwrap_or_else(|| format!("task-{}", index)),
                    title: String::new(),
                    due_at: opt_date_time(t.ddl.as_deref()),
                    estimated_minutes: t
                        .duration_min
                        .unwrap_or(config.default_task_minutes)
                        .max(config.min_task_minutes),
                    priority: Some(Priority::from_importance(importance).label().to_string()),
                    task_type: Some(
                        match kind {
                            TaskType::Focus => "focus",
                            TaskType::Light => "light",
                        }
                        .to_string(),
                    ),
                    course_ref: t.course_id.clone(),
                    fixed_scheduled_at: None,
                }
            })
            .collect();

        let blocked = self
            .timetable_blocked
            .iter()
            .filter_map(|b| {
                let start = opt_date_time(b.start.as_deref())?;
                let end = opt_date_time(b.end.as_deref())?;
                TimeInterval::new(start, end)
            })
            .collect();

        AutoPlanInput {
            range,
            tasks,
            blocked,
            preference,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItemView {
    pub task_id: String,
    pub start: String,
    pub end: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub plan_id: String,
    pub label: String,
    pub items: Vec<PlanItemView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAutoResponse {
    pub plans: Vec<PlanView>,
    pub overload_tasks: Vec<String>,
}

impl From<&AutoPlanResult> for ScheduleAutoResponse {
    fn from(result: &AutoPlanResult) -> Self {
        Self {
            plans: result
                .plans
                .iter()
                .map(|plan| PlanView {
                    plan_id: plan.plan_id.clone(),
                    label: plan.label.clone(),
                    items: plan
                        .items
                        .iter()
                        .map(|item| PlanItemView {
                            task_id: item.task_id.clone(),
                            start: format_date_time(item.interval.start),
                            end: format_date_time(item.interval.end),
                        })
                        .collect(),
                })
                .collect(),
            overload_tasks: result.overload_tasks.clone(),
        }
    }
}

/// Run the single-plan scheduler on a JSON request with `config`.
pub fn generate_schedule_json_with(request_json: &str, config: PlannerConfig) -> PlannerResult<String> {
    let request: GenerateScheduleRequest = serde_json::from_str(request_json)?;
    let planner = Planner::new(config)?;
    let input = request.to_input(Local::now().naive_local());
    let outcome = planner.schedule(&input);
    Ok(serde_json::to_string(&GenerateScheduleResponse::from(&outcome))?)
}

/// Run the single-plan scheduler on a JSON request with default settings.
pub fn generate_schedule_json(request_json: &str) -> PlannerResult<String> {
    generate_schedule_json_with(request_json, PlannerConfig::default())
}

/// Build the three candidate plans for a JSON request.
pub fn generate_auto_plans_json(request_json: &str) -> PlannerResult<String> {
    let request: ScheduleAutoRequest = serde_json::from_str(request_json)?;
    let builder = PlanBuilder::default();
    let result = builder.plan(&request.to_input(builder.config()));
    Ok(serde_json::to_string(&ScheduleAutoResponse::from(&result))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;

    fn dt(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_date_time_forms() {
        assert_eq!(parse_date_time("2025-09-10T18:00:00"), Some(dt(10, 18, 0)));
        assert_eq!(parse_date_time("2025-09-10T18:00"), Some(dt(10, 18, 0)));
        assert_eq!(parse_date_time("2025-09-10T18:00:00+08:00"), Some(dt(10, 18, 0)));
        assert_eq!(parse_date_time("2025-09-10T18:00+08:00"), Some(dt(10, 18, 0)));
        assert_eq!(parse_date_time("2025-09-10T18:00:00.000Z"), Some(dt(10, 18, 0)));
        assert_eq!(parse_date_time(" 2025-09-10 "), Some(dt(10, 0, 0)));
        assert_eq!(parse_date_time("next tuesday"), None);
        assert_eq!(parse_date_time(""), None);
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("08:30"), NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(parse_clock("08:30:15"), NaiveTime::from_hms_opt(8, 30, 15));
        assert_eq!(parse_clock("8h30"), None);
    }

    #[test]
    fn test_task_payload_conversion() {
        let payload: TaskPayload = serde_json::from_str(
            r#"{"id":"t1","title":"Essay","dueDateTime":"bogus","estimatedMinutes":90,
                "priority":"HIGH","type":"focus","courseId":"ENG"}"#,
        )
        .unwrap();
        let task = payload.to_task();
        assert_eq!(task.due_at, None);
        assert_eq!(task.priority.as_deref(), Some("HIGH"));
        assert_eq!(task.priority_level(), Some(Priority::High));
        assert_eq!(task.course_ref.as_deref(), Some("ENG"));
        assert_eq!(task.fixed_scheduled_at, None);
    }

    #[test]
    fn test_entry_rendering() {
        let task = Task::new("t1", "Essay", 90)
            .with_due(dt(10, 18, 0))
            .with_priority(Priority::Urgent);
        let item = ScheduledItem::task(&task, TimeInterval::new(dt(10, 10, 10), dt(10, 11, 40)).unwrap(), None);
        let entry = ScheduleEntry::from(&item);
        assert_eq!(entry.day, "Wednesday");
        assert_eq!(entry.date, "2025-09-10");
        assert_eq!(entry.start_time, "10:10");
        assert_eq!(entry.start_date_time, "2025-09-10T10:10:00");
        assert_eq!(entry.end_date_time, "2025-09-10T11:40:00");
        assert_eq!(entry.due_date_time, "2025-09-10T18:00:00");
        assert_eq!(entry.priority, "Urgent");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "TASK");
        assert_eq!(json["estimatedMinutes"], 90);
    }

    #[test]
    fn test_auto_request_defaults() {
        let request: ScheduleAutoRequest = serde_json::from_str(
            r#"{"range":{"start":"2025-09-10","end":"2025-09-11"},
                "tasks":[{"durationMin":5,"importance":0},{"id":"x","type":"LIGHT","importance":3}],
                "timetableBlocked":[{"start":"2025-09-10T09:00","end":"2025-09-10T08:00"}],
                "preferences":{"mode":"relaxed","dayStart":"22:00","dayEnd":"07:00"}}"#,
        )
        .unwrap();
        let config = AutoPlanConfig::default();
        let input = request.to_input(&config);

        assert_eq!(input.range, Some((dt(10, 0, 0).date(), dt(11, 0, 0).date())));
        // Only the end falls back when the window is inverted
        assert_eq!(input.preference.day_start, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(input.preference.day_end, config.day_end);
        assert!(input.blocked.is_empty());

        assert_eq!(input.tasks[0].id, "task-0");
        assert_eq!(input.tasks[0].estimated_minutes, 15);
        assert_eq!(input.tasks[0].priority.as_deref(), Some("Low"));
        assert_eq!(input.tasks[1].estimated_minutes, 60);
        assert_eq!(input.tasks[1].kind(), TaskType::Light);
        assert_eq!(input.tasks[1].priority.as_deref(), Some("High"));
    }

    #[test]
    fn test_generate_auto_plans_json() {
        let response = generate_auto_plans_json(
            r#"{"range":{"start":"2025-09-10","end":"2025-09-10"},
                "tasks":[{"id":"a","ddl":"2025-09-10T12:00","durationMin":60}],
                "preferences":{"mode":"URGENT"}}"#,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["plans"].as_array().unwrap().len(), 3);
        assert_eq!(value["plans"][0]["planId"], "p1");
        assert_eq!(value["plans"][0]["label"], "Balanced");
        assert_eq!(value["plans"][1]["label"], "Urgent");
        assert_eq!(value["plans"][2]["label"], "Relaxed");
        assert_eq!(value["plans"][0]["items"][0]["taskId"], "a");
        assert_eq!(value["plans"][0]["items"][0]["start"], "2025-09-10T08:00:00");
        assert_eq!(value["overloadTasks"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_generate_schedule_json() {
        let response = generate_schedule_json(
            r#"{"currentDateTime":"2025-09-10T07:00:00",
                "tasks":[{"id":"t1","title":"Essay","estimatedMinutes":60,
                          "dueDateTime":"2025-09-10T12:00:00","priority":"high"}]}"#,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        let items = value["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "t1");
        assert_eq!(items[0]["type"], "TASK");
        assert_eq!(items[0]["details"], "Priority:high");
        assert_eq!(items[0]["priority"], "high");
        assert!(value["unplacedTasks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_priority_label_is_echoed() {
        let response = generate_schedule_json(
            r#"{"currentDateTime":"2025-09-10T07:00:00",
                "tasks":[{"id":"t1","title":"Read","estimatedMinutes":60,"priority":"Critical"}]}"#,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["items"][0]["priority"], "Critical");
        assert_eq!(value["items"][0]["details"], "Priority:Critical");
    }

    #[test]
    fn test_extreme_estimates_do_not_panic() {
        let response = generate_schedule_json(
            r#"{"currentDateTime":"2025-09-10T07:00:00",
                "tasks":[
                    {"id":"huge","title":"Huge","estimatedMinutes":1000000000000,
                     "scheduledDateTime":"2025-09-10T09:00:00"},
                    {"id":"neg","title":"Neg","estimatedMinutes":-9223372036854775808}
                ]}"#,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        let items = value["items"].as_array().unwrap();
        // The unrepresentable fixed task is dropped; the other gets the minimum length
        assert!(items.iter().all(|i| i["id"] != "huge"));
        let neg = items.iter().find(|i| i["id"] == "neg").unwrap();
        assert_eq!(neg["estimatedMinutes"], i64::MIN);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            generate_schedule_json("{\"tasks\": 3}"),
            Err(PlannerError::Json(_))
        ));
    }
}
