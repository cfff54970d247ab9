use chrono::{NaiveDate, NaiveTime, Weekday};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::week_dates;
use crate::error::PlannerError;

/// How important a task is.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// Progress of a single task instance.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Todo,
    #[value(name = "inprogress")]
    InProgress,
    Done,
}

impl Status {
    /// The next status in the todo -> inprogress -> done cycle.
    pub fn next(self) -> Status {
        match self {
            Status::Todo => Status::InProgress,
            Status::InProgress => Status::Done,
            Status::Done => Status::Todo,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "inprogress",
            Status::Done => "done",
        }
    }

    /// One-character marker used in compact views.
    pub fn marker(self) -> &'static str {
        match self {
            Status::Todo => "●",
            Status::InProgress => "▲",
            Status::Done => "✓",
        }
    }
}

/// Part of the day a task belongs to when it has no explicit time.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    #[default]
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Evening];

    pub fn label(self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        }
    }
}

/// Kind of work a task represents.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Plan,
    Meeting,
    Course,
}

impl TaskType {
    pub fn label(self) -> &'static str {
        match self {
            TaskType::Plan => "plan",
            TaskType::Meeting => "meeting",
            TaskType::Course => "course",
        }
    }
}

/// A single task placed on a day or waiting in the unassigned pool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique within its day bucket and within the unassigned pool.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub time_slot: TimeSlot,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_flexible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Link to a template or to the shared identity of a recurring series.
    /// Not enforced: the referenced template may no longer exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_recurring: bool,
}

impl Task {
    /// Creates a todo task with a fresh id and defaults for everything else.
    pub fn new(title: impl Into<String>, time_slot: TimeSlot) -> Self {
        Self {
            id: new_task_id(),
            title: title.into(),
            priority: Priority::default(),
            status: Status::Todo,
            time_slot,
            start_time: None,
            end_time: None,
            is_flexible: false,
            notes: None,
            template_id: None,
            task_type: TaskType::default(),
            is_recurring: false,
        }
    }

    /// Materializes a task from a template: fresh id, todo, linked back to the template.
    pub fn from_template(template: &Template) -> Self {
        let mut task = Task::new(template.title.clone(), template.time_slot);
        task.template_id = Some(template.id.clone());
        task.sync_from_template(template);
        task
    }

    /// Copies the template-owned fields onto this task. `id` and `status` are untouched.
    pub fn sync_from_template(&mut self, template: &Template) {
        self.title = template.title.clone();
        self.priority = template.priority;
        self.time_slot = template.time_slot;
        self.start_time = template.start_time;
        self.end_time = template.end_time;
        self.notes = template.notes.clone();
        self.task_type = template.task_type;
        self.is_recurring = template.is_recurring;
    }

    /// Replaces every field with `edited`'s, keeping this instance's `id` and `status`.
    pub fn overwrite_from(&mut self, edited: &Task) {
        let id = std::mem::take(&mut self.id);
        let status = self.status;
        *self = edited.clone();
        self.id = id;
        self.status = status;
    }

    /// Identity used to recognise copies of the same recurring task.
    pub fn propagation_identity(&self) -> &str {
        self.template_id.as_deref().unwrap_or(&self.id)
    }
}

/// A reusable task blueprint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub time_slot: TimeSlot,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_recurring: bool,
    /// Advisory only; used to preselect days when batch-creating tasks.
    #[serde(default, with = "weekday_index", skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<Weekday>,
}

impl Template {
    pub fn new(title: impl Into<String>, time_slot: TimeSlot) -> Self {
        Self {
            id: new_template_id(),
            title: title.into(),
            priority: Priority::default(),
            time_slot,
            start_time: None,
            end_time: None,
            notes: None,
            task_type: TaskType::default(),
            is_recurring: false,
            weekdays: Vec::new(),
        }
    }
}

/// The tasks of one calendar day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DayBucket {
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl DayBucket {
    pub fn empty(date: NaiveDate) -> Self {
        Self { date, tasks: Vec::new() }
    }

    pub fn find(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Tasks whose title contains `query`, ignoring case. A blank query matches everything.
    pub fn matching<'a>(&'a self, query: &str) -> Vec<&'a Task> {
        let needle = query.trim().to_lowercase();
        self.tasks
            .iter()
            .filter(|t| needle.is_empty() || t.title.to_lowercase().contains(&needle))
            .collect()
    }

    /// Tasks in `slot`, in stored order.
    pub fn slot_tasks(&self, slot: TimeSlot) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.time_slot == slot)
    }
}

/// One week, keyed by its Monday.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeekRecord {
    #[serde(rename = "weekStartISO")]
    pub week_start: NaiveDate,
    #[serde(default)]
    pub days: Vec<DayBucket>,
}

impl WeekRecord {
    /// Seven empty buckets, Monday to Sunday.
    pub fn empty(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            days: week_dates(week_start).into_iter().map(DayBucket::empty).collect(),
        }
    }

    /// Re-aligns the buckets to the canonical Monday..Sunday sequence.
    ///
    /// Buckets are matched by date, not position. Dates missing from `self`
    /// come back empty; buckets for dates outside the week are dropped.
    pub fn aligned(&self) -> WeekRecord {
        let days = week_dates(self.week_start)
            .into_iter()
            .map(|date| {
                self.days
                    .iter()
                    .find(|d| d.date == date)
                    .cloned()
                    .unwrap_or_else(|| DayBucket::empty(date))
            })
            .collect();
        WeekRecord { week_start: self.week_start, days }
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayBucket> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn day_mut(&mut self, date: NaiveDate) -> Option<&mut DayBucket> {
        self.days.iter_mut().find(|d| d.date == date)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.days.iter().flat_map(|d| d.tasks.iter())
    }

    /// `(done, total)` over the whole week.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.tasks().count();
        let done = self.tasks().filter(|t| t.status == Status::Done).count();
        (done, total)
    }
}

pub fn new_task_id() -> String {
    format!("task_{}", Uuid::new_v4().simple())
}

pub fn new_template_id() -> String {
    format!("tpl_{}", Uuid::new_v4().simple())
}

/// Parses a 24-hour `HH:MM` string.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, PlannerError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| PlannerError::InvalidTime(s.to_string()))
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Serde helper for optional `HH:MM` times. Empty strings read as `None`.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveTime::parse_from_str(s, "%H:%M")
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid time '{}': {}", s, e))),
        }
    }
}

/// Serde helper storing weekdays as 0 (Monday) .. 6 (Sunday).
mod weekday_index {
    use chrono::Weekday;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use crate::dates::weekday_from_index;

    pub fn serialize<S>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let idx: Vec<u32> = days.iter().map(|d| d.num_days_from_monday()).collect();
        idx.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Weekday>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let idx: Vec<u32> = Vec::deserialize(deserializer)?;
        idx.into_iter()
            .map(|i| {
                weekday_from_index(i)
                    .ok_or_else(|| de::Error::custom(format!("weekday index {} out of range", i)))
            })
            .collect()
    }
}
