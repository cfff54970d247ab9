//! The week/task store.
//!
//! `WeekStore` exclusively owns the three collections (weeks map, templates,
//! unassigned pool) and exposes every mutation the presentation layer may
//! perform. Mutations never fail: a lookup miss is `Outcome::NoOp`, and an
//! edit or delete whose scope is ambiguous comes back as
//! `Outcome::NeedsDecision`, to be completed with [`WeekStore::resolve`].
//!
//! Changed collections are recorded in a [`Dirty`] set which the caller
//! drains with [`WeekStore::take_dirty`] and hands to the storage adapter.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, Local, NaiveDate};
use clap::ValueEnum;
use tracing::{debug, info};

use crate::dates::{start_of_week, week_dates, week_start_for_offset};
use crate::models::{new_task_id, DayBucket, Status, Task, Template, TimeSlot, WeekRecord};

/// Week records keyed by their Monday.
pub type WeekMap = BTreeMap<NaiveDate, WeekRecord>;

/// Which persisted collections changed since the last [`WeekStore::take_dirty`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dirty {
    pub weeks: bool,
    pub templates: bool,
    pub unassigned: bool,
}

impl Dirty {
    pub fn any(&self) -> bool {
        self.weeks || self.templates || self.unassigned
    }
}

/// Result of comparing a stored task against an edited copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    StatusOnly,
    FullChange,
}

/// Compares the user-editable fields one by one.
///
/// `StatusOnly` means every field except `status` is equal and `status`
/// differs. Absent notes equal empty notes; the same holds for `template_id`.
pub fn classify_change(stored: &Task, edited: &Task) -> ChangeKind {
    let blank = |s: &Option<String>| s.as_deref().unwrap_or("").to_string();
    let same_except_status = stored.title == edited.title
        && stored.priority == edited.priority
        && stored.time_slot == edited.time_slot
        && stored.start_time == edited.start_time
        && stored.end_time == edited.end_time
        && stored.is_flexible == edited.is_flexible
        && blank(&stored.notes) == blank(&edited.notes)
        && stored.task_type == edited.task_type
        && stored.is_recurring == edited.is_recurring
        && blank(&stored.template_id) == blank(&edited.template_id);

    if same_except_status && stored.status != edited.status {
        ChangeKind::StatusOnly
    } else {
        ChangeKind::FullChange
    }
}

/// How far a recurring edit or delete reaches.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every instance sharing the identity (for templates: also delete linked tasks).
    All,
    /// Only the instance the caller pointed at (for templates: keep linked tasks).
    One,
}

/// A mutation that is waiting for the caller to pick a [`Scope`].
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    UpdateRecurring {
        date: NaiveDate,
        task: Task,
    },
    DeleteRecurring {
        date: NaiveDate,
        task_id: String,
        template_id: String,
    },
    DeleteTemplate {
        template_id: String,
        references: usize,
    },
}

impl Decision {
    /// Question to show the user. "Yes" maps to [`Scope::All`].
    pub fn prompt(&self) -> String {
        match self {
            Decision::UpdateRecurring { task, .. } => format!(
                "'{}' repeats every week. Apply this edit to all weeks? (no = this week only)",
                task.title
            ),
            Decision::DeleteRecurring { .. } => {
                "This task repeats every week. Delete it from all weeks? (no = this week only)"
                    .to_string()
            }
            Decision::DeleteTemplate { references, .. } => format!(
                "{} task(s) were created from this template. Delete them too? (no = keep them)",
                references
            ),
        }
    }
}

/// What a store operation did.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    NoOp,
    NeedsDecision(Decision),
}

impl Outcome {
    fn from_changed(changed: bool) -> Outcome {
        if changed {
            Outcome::Applied
        } else {
            Outcome::NoOp
        }
    }
}

/// Owner of all planner state.
#[derive(Debug, Clone)]
pub struct WeekStore {
    weeks: WeekMap,
    templates: Vec<Template>,
    unassigned: Vec<Task>,
    viewed: NaiveDate,
    dirty: Dirty,
}

impl Default for WeekStore {
    fn default() -> Self {
        WeekStore::from_parts(WeekMap::new(), Vec::new(), Vec::new())
    }
}

/// Builds the view record for the week `offset` weeks from the one holding `today`.
///
/// Stored buckets are matched by date; missing dates come back empty. Pure.
/// `None` when the offset leaves the representable calendar.
pub fn materialize_week(weeks: &WeekMap, today: NaiveDate, offset: i64) -> Option<WeekRecord> {
    week_start_for_offset(today, offset).map(|week_start| materialize(weeks, week_start))
}

fn materialize(weeks: &WeekMap, week_start: NaiveDate) -> WeekRecord {
    match weeks.get(&week_start) {
        Some(stored) => WeekRecord {
            week_start,
            ..stored.clone()
        }
        .aligned(),
        None => WeekRecord::empty(week_start),
    }
}

impl WeekStore {
    /// Wraps loaded collections. The viewed week starts as the current calendar week.
    pub fn from_parts(weeks: WeekMap, templates: Vec<Template>, unassigned: Vec<Task>) -> Self {
        Self {
            weeks,
            templates,
            unassigned,
            viewed: start_of_week(Local::now().date_naive()),
            dirty: Dirty::default(),
        }
    }

    pub fn weeks(&self) -> &WeekMap {
        &self.weeks
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn unassigned(&self) -> &[Task] {
        &self.unassigned
    }

    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Monday of the week currently being viewed.
    pub fn viewed_week_start(&self) -> NaiveDate {
        self.viewed
    }

    /// Drains the set of collections changed since the previous call.
    pub fn take_dirty(&mut self) -> Dirty {
        std::mem::take(&mut self.dirty)
    }

    /// Canonical seven-day view of the week starting at `week_start`.
    pub fn materialize(&self, week_start: NaiveDate) -> WeekRecord {
        materialize(&self.weeks, start_of_week(week_start))
    }

    /// The viewed week as a view record.
    pub fn current_view(&self) -> WeekRecord {
        self.materialize(self.viewed)
    }

    /// Navigates to the week `offset` weeks from `today`, propagating recurring tasks.
    pub fn view_week(&mut self, today: NaiveDate, offset: i64) -> Option<WeekRecord> {
        week_start_for_offset(today, offset).map(|week_start| self.view(week_start))
    }

    /// Makes the week holding `date` the viewed week and propagates recurring tasks into it.
    pub fn view(&mut self, date: NaiveDate) -> WeekRecord {
        self.viewed = start_of_week(date);
        self.propagate_recurring(self.viewed);
        self.current_view()
    }

    /// Copies last week's recurring tasks into the week starting at `week_start`.
    ///
    /// Only the immediately preceding week is consulted. A copy is made for
    /// each recurring task whose identity (`template_id`, else its own `id`)
    /// is not yet present on the same weekday; copies get a fresh id, status
    /// todo and `template_id` set to that identity, and are placed ahead of
    /// the day's existing tasks. Returns whether anything was written.
    pub fn propagate_recurring(&mut self, week_start: NaiveDate) -> bool {
        let week_start = start_of_week(week_start);
        let Some(prev_start) = week_start.checked_sub_signed(Duration::days(7)) else {
            return false;
        };
        if !self.weeks.contains_key(&prev_start) {
            debug!(
                week = %week_start,
                previous = %prev_start,
                "no previous week stored, nothing to propagate"
            );
            return false;
        }
        let prev = materialize(&self.weeks, prev_start);
        let recurring_by_day: Vec<Vec<&Task>> = prev
            .days
            .iter()
            .map(|d| d.tasks.iter().filter(|t| t.is_recurring).collect())
            .collect();
        if recurring_by_day.iter().all(|day| day.is_empty()) {
            debug!(week = %week_start, "previous week holds no recurring tasks");
            return false;
        }

        let current = materialize(&self.weeks, week_start);
        let mut copied = 0usize;
        let days: Vec<DayBucket> = current
            .days
            .into_iter()
            .zip(recurring_by_day)
            .map(|(day, recurring)| {
                let mut present: HashSet<String> =
                    day.tasks.iter().filter_map(|t| t.template_id.clone()).collect();
                let mut tasks: Vec<Task> = Vec::new();
                for source in recurring {
                    let identity = source.propagation_identity().to_string();
                    if !present.insert(identity.clone()) {
                        continue;
                    }
                    tasks.push(Task {
                        id: new_task_id(),
                        status: Status::Todo,
                        template_id: Some(identity),
                        ..source.clone()
                    });
                }
                copied += tasks.len();
                tasks.extend(day.tasks);
                DayBucket { date: day.date, tasks }
            })
            .collect();

        if copied == 0 {
            debug!(week = %week_start, "recurring tasks already present");
            return false;
        }
        debug!(week = %week_start, copied, "propagated recurring tasks");
        self.weeks.insert(week_start, WeekRecord { week_start, days });
        self.dirty.weeks = true;
        true
    }

    /// Stored task `task_id` on `date`, if any.
    pub fn find_task(&self, date: NaiveDate, task_id: &str) -> Option<&Task> {
        self.weeks
            .get(&start_of_week(date))
            .and_then(|w| w.day(date))
            .and_then(|d| d.find(task_id))
    }

    /// Number of tasks, across all weeks and the unassigned pool, linked to `template_id`.
    pub fn references(&self, template_id: &str) -> usize {
        let linked = |t: &&Task| t.template_id.as_deref() == Some(template_id);
        let in_weeks: usize = self.weeks.values().map(|w| w.tasks().filter(linked).count()).sum();
        in_weeks + self.unassigned.iter().filter(linked).count()
    }

    /// Mutable bucket for `date`, creating and re-aligning its week record as needed.
    fn day_entry(&mut self, date: NaiveDate) -> &mut DayBucket {
        let week_start = start_of_week(date);
        let record = self
            .weeks
            .entry(week_start)
            .or_insert_with(|| WeekRecord::empty(week_start));
        let canonical = week_dates(week_start);
        if record.week_start != week_start
            || record.days.len() != 7
            || record.days.iter().zip(&canonical).any(|(d, c)| d.date != *c)
        {
            record.week_start = week_start;
            *record = record.aligned();
        }
        &mut record.days[date.weekday().num_days_from_monday() as usize]
    }

    fn stored_day_mut(&mut self, date: NaiveDate) -> Option<&mut DayBucket> {
        self.weeks.get_mut(&start_of_week(date)).and_then(|w| w.day_mut(date))
    }

    fn all_tasks_mut(&mut self) -> impl Iterator<Item = (NaiveDate, &mut Task)> {
        self.weeks
            .values_mut()
            .flat_map(|w| w.days.iter_mut())
            .flat_map(|d| {
                let date = d.date;
                d.tasks.iter_mut().map(move |t| (date, t))
            })
    }

    fn take_from_day(&mut self, date: NaiveDate, task_id: &str) -> Option<Task> {
        let day = self.stored_day_mut(date)?;
        let idx = day.tasks.iter().position(|t| t.id == task_id)?;
        Some(day.tasks.remove(idx))
    }

    /// Appends `task` to the bucket for `date`. No-op if that bucket already holds its id.
    pub fn add_task(&mut self, date: NaiveDate, task: Task) -> Outcome {
        if self.find_task(date, &task.id).is_some() {
            return Outcome::NoOp;
        }
        self.day_entry(date).tasks.push(task);
        self.dirty.weeks = true;
        Outcome::Applied
    }

    /// Applies an edit to the task with `task.id` on `date`.
    ///
    /// A pure status change is applied in place. Otherwise a recurring task
    /// without a `template_id` is promoted to its own identity, and a
    /// recurring task with one needs a [`Scope`] decision.
    pub fn update_task(&mut self, date: NaiveDate, task: Task) -> Outcome {
        let Some(stored) = self.find_task(date, &task.id) else {
            return Outcome::NoOp;
        };
        if classify_change(stored, &task) == ChangeKind::StatusOnly {
            return Outcome::from_changed(self.replace_task(date, task));
        }

        let mut task = task;
        if task.is_recurring && task.template_id.is_none() {
            debug!(task = %task.id, "promoting recurring task to its own identity");
            task.template_id = Some(task.id.clone());
        }
        if task.is_recurring && task.template_id.is_some() {
            return Outcome::NeedsDecision(Decision::UpdateRecurring { date, task });
        }
        Outcome::from_changed(self.replace_task(date, task))
    }

    /// Convenience for the status fast path.
    pub fn set_status(&mut self, date: NaiveDate, task_id: &str, status: Status) -> Outcome {
        let Some(stored) = self.find_task(date, task_id) else {
            return Outcome::NoOp;
        };
        if stored.status == status {
            return Outcome::NoOp;
        }
        let edited = Task { status, ..stored.clone() };
        self.update_task(date, edited)
    }

    fn replace_task(&mut self, date: NaiveDate, task: Task) -> bool {
        let Some(slot) = self
            .stored_day_mut(date)
            .and_then(|d| d.tasks.iter_mut().find(|t| t.id == task.id))
        else {
            return false;
        };
        if *slot == task {
            return false;
        }
        *slot = task;
        self.dirty.weeks = true;
        true
    }

    /// Deletes a task. Recurring tasks with an identity need a [`Scope`] decision.
    pub fn delete_task(&mut self, date: NaiveDate, task_id: &str) -> Outcome {
        let Some(task) = self.find_task(date, task_id) else {
            return Outcome::NoOp;
        };
        if task.is_recurring {
            if let Some(template_id) = task.template_id.clone() {
                return Outcome::NeedsDecision(Decision::DeleteRecurring {
                    date,
                    task_id: task_id.to_string(),
                    template_id,
                });
            }
        }
        let removed = self.take_from_day(date, task_id).is_some();
        self.dirty.weeks |= removed;
        Outcome::from_changed(removed)
    }

    /// Completes a pending mutation with the caller's choice.
    pub fn resolve(&mut self, decision: Decision, scope: Scope) -> Outcome {
        debug!(?scope, "resolving pending decision");
        match decision {
            Decision::UpdateRecurring { date, task } => match scope {
                Scope::All => {
                    let Some(identity) = task.template_id.clone() else {
                        return Outcome::from_changed(self.replace_task(date, task));
                    };
                    let mut changed = false;
                    for (day, t) in self.all_tasks_mut() {
                        if day == date && t.id == task.id {
                            if *t != task {
                                *t = task.clone();
                                changed = true;
                            }
                        } else if t.template_id.as_deref() == Some(identity.as_str()) {
                            let before = t.clone();
                            t.overwrite_from(&task);
                            changed |= *t != before;
                        }
                    }
                    self.dirty.weeks |= changed;
                    Outcome::from_changed(changed)
                }
                Scope::One => Outcome::from_changed(self.replace_task(date, task)),
            },
            Decision::DeleteRecurring { date, task_id, template_id } => match scope {
                Scope::All => {
                    let mut removed = 0usize;
                    for week in self.weeks.values_mut() {
                        for day in week.days.iter_mut() {
                            let before = day.tasks.len();
                            day.tasks
                                .retain(|t| t.template_id.as_deref() != Some(template_id.as_str()));
                            removed += before - day.tasks.len();
                        }
                    }
                    debug!(template = %template_id, removed, "deleted recurring series");
                    self.dirty.weeks |= removed > 0;
                    Outcome::from_changed(removed > 0)
                }
                Scope::One => {
                    let removed = self.take_from_day(date, &task_id).is_some();
                    self.dirty.weeks |= removed;
                    Outcome::from_changed(removed)
                }
            },
            Decision::DeleteTemplate { template_id, .. } => {
                let mut changed = self.remove_template(&template_id);
                if scope == Scope::All {
                    let linked = |t: &Task| t.template_id.as_deref() == Some(template_id.as_str());
                    let mut removed = 0usize;
                    for week in self.weeks.values_mut() {
                        for day in week.days.iter_mut() {
                            let before = day.tasks.len();
                            day.tasks.retain(|t| !linked(t));
                            removed += before - day.tasks.len();
                        }
                    }
                    if removed > 0 {
                        self.dirty.weeks = true;
                    }
                    let before = self.unassigned.len();
                    self.unassigned.retain(|t| !linked(t));
                    let pooled = before - self.unassigned.len();
                    if pooled > 0 {
                        self.dirty.unassigned = true;
                    }
                    info!(
                        template = %template_id,
                        removed = removed + pooled,
                        "deleted tasks linked to template"
                    );
                    changed |= removed + pooled > 0;
                }
                Outcome::from_changed(changed)
            }
        }
    }

    fn remove_template(&mut self, template_id: &str) -> bool {
        let before = self.templates.len();
        self.templates.retain(|t| t.id != template_id);
        let removed = self.templates.len() != before;
        self.dirty.templates |= removed;
        removed
    }

    /// Adds a new template, or overwrites an existing one and syncs every linked task.
    ///
    /// Linked tasks in every stored week and in the unassigned pool receive the
    /// template's content; their `id` and `status` are left alone. Re-saving an
    /// unchanged template still pulls drifted linked tasks back in line.
    pub fn save_template(&mut self, template: Template) -> Outcome {
        let Some(idx) = self.templates.iter().position(|t| t.id == template.id) else {
            self.templates.push(template);
            self.dirty.templates = true;
            return Outcome::Applied;
        };
        let replaced = self.templates[idx] != template;
        if replaced {
            self.templates[idx] = template.clone();
            self.dirty.templates = true;
        }

        let mut synced_weeks = false;
        for (_, task) in self.all_tasks_mut() {
            if task.template_id.as_deref() == Some(template.id.as_str()) {
                let before = task.clone();
                task.sync_from_template(&template);
                synced_weeks |= *task != before;
            }
        }
        let mut synced_pool = false;
        for task in self.unassigned.iter_mut() {
            if task.template_id.as_deref() == Some(template.id.as_str()) {
                let before = task.clone();
                task.sync_from_template(&template);
                synced_pool |= *task != before;
            }
        }
        self.dirty.weeks |= synced_weeks;
        self.dirty.unassigned |= synced_pool;
        debug!(template = %template.id, replaced, synced_weeks, synced_pool, "template saved");
        Outcome::from_changed(replaced || synced_weeks || synced_pool)
    }

    /// Removes a template. If tasks still link to it the caller decides whether they go too.
    pub fn delete_template(&mut self, template_id: &str) -> Outcome {
        if self.template(template_id).is_none() {
            return Outcome::NoOp;
        }
        let references = self.references(template_id);
        if references > 0 {
            return Outcome::NeedsDecision(Decision::DeleteTemplate {
                template_id: template_id.to_string(),
                references,
            });
        }
        Outcome::from_changed(self.remove_template(template_id))
    }

    /// Creates a task from `template` on the first day of the viewed week.
    pub fn use_template(&mut self, template: &Template) -> Outcome {
        let monday = self.viewed;
        self.add_task(monday, Task::from_template(template))
    }

    /// Creates one task per selected template and date, all in `slot`.
    ///
    /// Unknown template ids are skipped. Returns how many tasks were added.
    pub fn batch_add(
        &mut self,
        template_ids: &[String],
        dates: &[NaiveDate],
        slot: TimeSlot,
    ) -> usize {
        let templates: Vec<Template> = template_ids
            .iter()
            .filter_map(|id| self.template(id).cloned())
            .collect();
        let mut added = 0;
        for template in &templates {
            for date in dates {
                let mut task = Task::from_template(template);
                task.time_slot = slot;
                if self.add_task(*date, task) == Outcome::Applied {
                    added += 1;
                }
            }
        }
        added
    }

    pub fn add_unassigned(&mut self, task: Task) -> Outcome {
        if self.unassigned.iter().any(|t| t.id == task.id) {
            return Outcome::NoOp;
        }
        self.unassigned.push(task);
        self.dirty.unassigned = true;
        Outcome::Applied
    }

    pub fn update_unassigned(&mut self, task: Task) -> Outcome {
        let Some(idx) = self.unassigned.iter().position(|t| t.id == task.id) else {
            return Outcome::NoOp;
        };
        if self.unassigned[idx] == task {
            return Outcome::NoOp;
        }
        self.unassigned[idx] = task;
        self.dirty.unassigned = true;
        Outcome::Applied
    }

    pub fn delete_unassigned(&mut self, task_id: &str) -> Outcome {
        let before = self.unassigned.len();
        self.unassigned.retain(|t| t.id != task_id);
        let removed = self.unassigned.len() != before;
        self.dirty.unassigned |= removed;
        Outcome::from_changed(removed)
    }

    /// Moves a task from the unassigned pool onto `date`, in `slot`.
    pub fn assign_task(&mut self, task_id: &str, date: NaiveDate, slot: TimeSlot) -> Outcome {
        let Some(idx) = self.unassigned.iter().position(|t| t.id == task_id) else {
            return Outcome::NoOp;
        };
        if self.find_task(date, task_id).is_some() {
            return Outcome::NoOp;
        }
        let mut task = self.unassigned.remove(idx);
        task.time_slot = slot;
        self.day_entry(date).tasks.push(task);
        self.dirty.unassigned = true;
        self.dirty.weeks = true;
        Outcome::Applied
    }

    /// Moves a task from `date` back into the unassigned pool.
    pub fn unassign_task(&mut self, date: NaiveDate, task_id: &str) -> Outcome {
        if self.unassigned.iter().any(|t| t.id == task_id) {
            return Outcome::NoOp;
        }
        let Some(task) = self.take_from_day(date, task_id) else {
            return Outcome::NoOp;
        };
        self.unassigned.push(task);
        self.dirty.unassigned = true;
        self.dirty.weeks = true;
        Outcome::Applied
    }

    /// Relocates a task to `to` in `slot`. A `from` of `None` means the unassigned pool.
    ///
    /// Moving within the same day is a no-op.
    pub fn move_task(
        &mut self,
        from: Option<NaiveDate>,
        to: NaiveDate,
        task_id: &str,
        slot: TimeSlot,
    ) -> Outcome {
        let Some(from) = from else {
            return self.assign_task(task_id, to, slot);
        };
        if from == to || self.find_task(to, task_id).is_some() {
            return Outcome::NoOp;
        }
        let Some(mut task) = self.take_from_day(from, task_id) else {
            return Outcome::NoOp;
        };
        task.time_slot = slot;
        self.day_entry(to).tasks.push(task);
        self.dirty.weeks = true;
        Outcome::Applied
    }

    /// Re-sequences the tasks of `slot` on `date` named in `ordered_ids`.
    ///
    /// The named tasks trade places among the positions they already occupy,
    /// so every other task keeps both its position and relative order. Ids
    /// that are unknown or belong to another slot are ignored.
    pub fn reorder_tasks(
        &mut self,
        date: NaiveDate,
        slot: TimeSlot,
        ordered_ids: &[String],
    ) -> Outcome {
        let Some(day) = self.stored_day_mut(date) else {
            return Outcome::NoOp;
        };
        let mut seen = HashSet::new();
        let wanted: Vec<&String> = ordered_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter(|id| day.tasks.iter().any(|t| &t.id == *id && t.time_slot == slot))
            .collect();
        let positions: Vec<usize> = day
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.time_slot == slot && wanted.iter().any(|id| **id == t.id))
            .map(|(i, _)| i)
            .collect();

        let reordered: Vec<Task> = wanted
            .iter()
            .filter_map(|id| day.tasks.iter().find(|t| &t.id == *id).cloned())
            .collect();
        let mut changed = false;
        for (pos, task) in positions.into_iter().zip(reordered) {
            if day.tasks[pos].id != task.id {
                day.tasks[pos] = task;
                changed = true;
            }
        }
        self.dirty.weeks |= changed;
        Outcome::from_changed(changed)
    }
}
