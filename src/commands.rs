use std::io::{self, Write};

use chrono::{Datelike, Local, NaiveDate, NaiveTime, Weekday};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::dates::{holiday, iso_week_number, short_date, week_range_label, weekday_name};
use crate::error::{PlannerError, Result};
use crate::layout::{layout_day, TICK_HEIGHT};
use crate::models::{Priority, Status, Task, TaskType, Template, TimeSlot, WeekRecord};
use crate::storage::Storage;
use crate::store::{Outcome, Scope, WeekStore};

/// Optional field overrides shared by task and template commands.
#[derive(Debug, Clone, Default)]
pub struct TaskFields {
    pub title: Option<String>,
    pub slot: Option<TimeSlot>,
    pub priority: Option<Priority>,
    pub task_type: Option<TaskType>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    /// Drop both start and end time.
    pub clear_times: bool,
    pub notes: Option<String>,
    pub recurring: Option<bool>,
    pub flexible: Option<bool>,
}

impl TaskFields {
    pub fn apply_to_task(&self, t: &mut Task) {
        if let Some(v) = &self.title {
            t.title = v.clone();
        }
        if let Some(v) = self.slot {
            t.time_slot = v;
        }
        if let Some(v) = self.priority {
            t.priority = v;
        }
        if let Some(v) = self.task_type {
            t.task_type = v;
        }
        if self.clear_times {
            t.start_time = None;
            t.end_time = None;
        }
        if let Some(v) = self.start {
            t.start_time = Some(v);
        }
        if let Some(v) = self.end {
            t.end_time = Some(v);
        }
        if let Some(v) = &self.notes {
            t.notes = if v.is_empty() { None } else { Some(v.clone()) };
        }
        if let Some(v) = self.recurring {
            t.is_recurring = v;
        }
        if let Some(v) = self.flexible {
            t.is_flexible = v;
        }
    }

    pub fn apply_to_template(&self, t: &mut Template) {
        if let Some(v) = &self.title {
            t.title = v.clone();
        }
        if let Some(v) = self.slot {
            t.time_slot = v;
        }
        if let Some(v) = self.priority {
            t.priority = v;
        }
        if let Some(v) = self.task_type {
            t.task_type = v;
        }
        if self.clear_times {
            t.start_time = None;
            t.end_time = None;
        }
        if let Some(v) = self.start {
            t.start_time = Some(v);
        }
        if let Some(v) = self.end {
            t.end_time = Some(v);
        }
        if let Some(v) = &self.notes {
            t.notes = if v.is_empty() { None } else { Some(v.clone()) };
        }
        if let Some(v) = self.recurring {
            t.is_recurring = v;
        }
    }
}

/// Accepts `YYYY-MM-DD` or `today`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if s.eq_ignore_ascii_case("today") {
        return Ok(today());
    }
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| PlannerError::InvalidDate(s.to_string()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Display form of an id: the first eight characters after its prefix.
pub fn short_id(id: &str) -> &str {
    let tail = id.split_once('_').map(|(_, rest)| rest).unwrap_or(id);
    tail.get(..8).unwrap_or(tail)
}

fn id_matches(id: &str, reference: &str) -> bool {
    id == reference
        || id.starts_with(reference)
        || id.split_once('_').is_some_and(|(_, rest)| rest.starts_with(reference))
}

/// Resolves a full id or unique id prefix against `tasks`.
fn resolve_task(tasks: &[Task], reference: &str, location: &str) -> Result<String> {
    if let Some(t) = tasks.iter().find(|t| t.id == reference) {
        return Ok(t.id.clone());
    }
    let mut hits = tasks.iter().filter(|t| id_matches(&t.id, reference));
    match (hits.next(), hits.next()) {
        (Some(t), None) => Ok(t.id.clone()),
        (Some(_), Some(_)) => Err(PlannerError::AmbiguousId(reference.to_string())),
        (None, _) => Err(PlannerError::TaskNotFound {
            id: reference.to_string(),
            location: location.to_string(),
        }),
    }
}

fn resolve_day_task(store: &WeekStore, date: NaiveDate, reference: &str) -> Result<String> {
    let view = store.materialize(date);
    let tasks = view.day(date).map(|d| d.tasks.as_slice()).unwrap_or(&[]);
    resolve_task(tasks, reference, &date.to_string())
}

fn resolve_pool_task(store: &WeekStore, reference: &str) -> Result<String> {
    resolve_task(store.unassigned(), reference, "the unassigned pool")
}

/// Resolves a template by id, unique id prefix, or title (case-insensitive).
fn resolve_template(store: &WeekStore, reference: &str) -> Result<Template> {
    let templates = store.templates();
    if let Some(t) = templates.iter().find(|t| t.id == reference) {
        return Ok(t.clone());
    }
    let by_title: Vec<&Template> = templates
        .iter()
        .filter(|t| t.title.eq_ignore_ascii_case(reference))
        .collect();
    if by_title.len() == 1 {
        return Ok(by_title[0].clone());
    }
    let by_id: Vec<&Template> = templates.iter().filter(|t| id_matches(&t.id, reference)).collect();
    match (by_id.len(), by_title.len()) {
        (1, _) => Ok(by_id[0].clone()),
        (0, 0) => Err(PlannerError::TemplateNotFound(reference.to_string())),
        _ => Err(PlannerError::AmbiguousId(reference.to_string())),
    }
}

/// Asks a yes/no question on the terminal. Anything but `y` means no.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Completes a pending decision with `scope`, or by asking.
///
/// When silent and no scope is given the narrower choice is taken.
fn settle(
    store: &mut WeekStore,
    outcome: Outcome,
    scope: Option<Scope>,
    silent: bool,
) -> Result<Outcome> {
    let Outcome::NeedsDecision(decision) = outcome else {
        return Ok(outcome);
    };
    let scope = match scope {
        Some(s) => s,
        None if silent => Scope::One,
        None => {
            if confirm(&decision.prompt())? {
                Scope::All
            } else {
                Scope::One
            }
        }
    };
    Ok(store.resolve(decision, scope))
}

fn report(outcome: &Outcome, done: &str, silent: bool) {
    if silent {
        return;
    }
    match outcome {
        Outcome::Applied => println!("{}", done),
        _ => println!("Nothing changed."),
    }
}

/// Shows a week as a day × slot grid, propagating recurring tasks into it first.
pub fn cmd_week(storage: &Storage, offset: i64, search: Option<String>) -> Result<()> {
    let mut store = storage.load_store();
    let view = store
        .view_week(today(), offset)
        .ok_or(PlannerError::OffsetOutOfRange(offset))?;
    storage.persist(&mut store);

    let (done, total) = view.progress();
    println!(
        "Week {} · {} · {}/{} done",
        iso_week_number(view.week_start),
        week_range_label(view.week_start),
        done,
        total
    );
    println!("{}", render_week(&view, search.as_deref().unwrap_or("")));
    Ok(())
}

/// Renders the grid used by `week`.
pub fn render_week(view: &WeekRecord, search: &str) -> Table {
    let now = today();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("").add_attribute(Attribute::Bold)];
    for day in &view.days {
        let mut label = format!("{} {}", weekday_name(day.date), short_date(day.date));
        if let Some(name) = holiday(day.date) {
            label.push('\n');
            label.push_str(name);
        }
        let mut cell = Cell::new(label).add_attribute(Attribute::Bold);
        if day.date == now {
            cell = cell.fg(Color::Cyan);
        } else if holiday(day.date).is_some() {
            cell = cell.fg(Color::Red);
        }
        header.push(cell);
    }
    table.set_header(header);

    for slot in TimeSlot::ALL {
        let mut row = vec![Cell::new(slot.label()).add_attribute(Attribute::Bold)];
        for day in &view.days {
            let lines: Vec<String> = day
                .matching(search)
                .into_iter()
                .filter(|t| t.time_slot == slot)
                .map(task_line)
                .collect();
            row.push(Cell::new(lines.join("\n")));
        }
        table.add_row(row);
    }
    table
}

fn task_line(t: &Task) -> String {
    let mut line = format!("{} {} ", short_id(&t.id), t.status.marker());
    if let Some(start) = t.start_time {
        line.push_str(&start.format("%H:%M").to_string());
        if let Some(end) = t.end_time {
            line.push('-');
            line.push_str(&end.format("%H:%M").to_string());
        }
        line.push(' ');
    }
    line.push_str(&t.title);
    if t.is_recurring {
        line.push_str(" ↻");
    }
    line
}

/// Adds a task on `date`, or to the unassigned pool when no date is given.
pub fn cmd_add(
    storage: &Storage,
    title: String,
    date: Option<NaiveDate>,
    fields: &TaskFields,
    silent: bool,
) -> Result<String> {
    let mut store = storage.load_store();
    let mut task = Task::new(title, fields.slot.unwrap_or_default());
    fields.apply_to_task(&mut task);
    let id = task.id.clone();

    let outcome = match date {
        Some(date) => {
            store.view(date);
            store.add_task(date, task)
        }
        None => store.add_unassigned(task),
    };
    storage.persist(&mut store);
    report(&outcome, &format!("Task added (id = {})", short_id(&id)), silent);
    Ok(id)
}

/// Sets a task's status, or advances it one step when `status` is `None`.
pub fn cmd_status(
    storage: &Storage,
    date: NaiveDate,
    task_ref: &str,
    status: Option<Status>,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    store.view(date);
    let id = resolve_day_task(&store, date, task_ref)?;
    let current = store.find_task(date, &id).map(|t| t.status).unwrap_or_default();
    let target = status.unwrap_or_else(|| current.next());
    let outcome = store.set_status(date, &id, target);
    storage.persist(&mut store);
    report(&outcome, &format!("Task {} is now {}.", short_id(&id), target.label()), silent);
    Ok(())
}

/// Edits a task on `date`, or in the unassigned pool when no date is given.
pub fn cmd_edit(
    storage: &Storage,
    date: Option<NaiveDate>,
    task_ref: &str,
    fields: &TaskFields,
    scope: Option<Scope>,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    let outcome = match date {
        Some(date) => {
            store.view(date);
            let id = resolve_day_task(&store, date, task_ref)?;
            let mut task = store
                .find_task(date, &id)
                .cloned()
                .ok_or_else(|| PlannerError::TaskNotFound {
                    id: id.clone(),
                    location: date.to_string(),
                })?;
            fields.apply_to_task(&mut task);
            let outcome = store.update_task(date, task);
            settle(&mut store, outcome, scope, silent)?
        }
        None => {
            let id = resolve_pool_task(&store, task_ref)?;
            let mut task = store
                .unassigned()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| PlannerError::TaskNotFound {
                    id: id.clone(),
                    location: "the unassigned pool".into(),
                })?;
            fields.apply_to_task(&mut task);
            store.update_unassigned(task)
        }
    };
    storage.persist(&mut store);
    report(&outcome, "Task updated.", silent);
    Ok(())
}

/// Removes a task from `date`, or from the unassigned pool when no date is given.
pub fn cmd_remove(
    storage: &Storage,
    date: Option<NaiveDate>,
    task_ref: &str,
    scope: Option<Scope>,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    let outcome = match date {
        Some(date) => {
            store.view(date);
            let id = resolve_day_task(&store, date, task_ref)?;
            let outcome = store.delete_task(date, &id);
            settle(&mut store, outcome, scope, silent)?
        }
        None => {
            let id = resolve_pool_task(&store, task_ref)?;
            store.delete_unassigned(&id)
        }
    };
    storage.persist(&mut store);
    report(&outcome, "Task removed.", silent);
    Ok(())
}

pub fn cmd_assign(
    storage: &Storage,
    task_ref: &str,
    date: NaiveDate,
    slot: TimeSlot,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    store.view(date);
    let id = resolve_pool_task(&store, task_ref)?;
    let outcome = store.assign_task(&id, date, slot);
    storage.persist(&mut store);
    report(
        &outcome,
        &format!("Task {} assigned to {} {}.", short_id(&id), date, slot.label()),
        silent,
    );
    Ok(())
}

/// Moves a task between days. A missing `from` means the unassigned pool.
pub fn cmd_move(
    storage: &Storage,
    from: Option<NaiveDate>,
    to: NaiveDate,
    task_ref: &str,
    slot: TimeSlot,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    let id = match from {
        Some(from) => {
            store.view(from);
            resolve_day_task(&store, from, task_ref)?
        }
        None => resolve_pool_task(&store, task_ref)?,
    };
    store.view(to);
    let outcome = store.move_task(from, to, &id, slot);
    storage.persist(&mut store);
    report(&outcome, &format!("Task {} moved to {} {}.", short_id(&id), to, slot.label()), silent);
    Ok(())
}

pub fn cmd_unassign(
    storage: &Storage,
    date: NaiveDate,
    task_ref: &str,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    store.view(date);
    let id = resolve_day_task(&store, date, task_ref)?;
    let outcome = store.unassign_task(date, &id);
    storage.persist(&mut store);
    report(&outcome, &format!("Task {} moved to the unassigned pool.", short_id(&id)), silent);
    Ok(())
}

pub fn cmd_reorder(
    storage: &Storage,
    date: NaiveDate,
    slot: TimeSlot,
    task_refs: &[String],
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    store.view(date);
    let ids = task_refs
        .iter()
        .map(|r| resolve_day_task(&store, date, r))
        .collect::<Result<Vec<String>>>()?;
    let outcome = store.reorder_tasks(date, slot, &ids);
    storage.persist(&mut store);
    report(&outcome, "Tasks reordered.", silent);
    Ok(())
}

/// Prints the timeline placement of a day's timed tasks.
pub fn cmd_layout(storage: &Storage, date: NaiveDate) -> Result<()> {
    let mut store = storage.load_store();
    let view = store.view(date);
    storage.persist(&mut store);
    let tasks = view.day(date).map(|d| d.tasks.as_slice()).unwrap_or(&[]);
    let placements = layout_day(tasks);
    if placements.is_empty() {
        println!("No timed tasks on {}.", date);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Time").add_attribute(Attribute::Bold),
        Cell::new("Top (ticks)").add_attribute(Attribute::Bold),
        Cell::new("Height (ticks)").add_attribute(Attribute::Bold),
        Cell::new("Column").add_attribute(Attribute::Bold),
    ]);
    for p in placements {
        let Some(task) = tasks.iter().find(|t| t.id == p.task_id) else {
            continue;
        };
        let time = match (task.start_time, task.end_time) {
            (Some(s), Some(e)) => format!("{}-{}", s.format("%H:%M"), e.format("%H:%M")),
            (Some(s), None) => s.format("%H:%M").to_string(),
            _ => String::new(),
        };
        table.add_row(vec![
            Cell::new(short_id(&task.id)),
            Cell::new(&task.title),
            Cell::new(time),
            Cell::new(format!("{:.1}", p.top / TICK_HEIGHT)),
            Cell::new(format!("{:.1}", p.height / TICK_HEIGHT)),
            Cell::new(format!("{}/{}", p.column + 1, p.columns)),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Lists the unassigned pool.
pub fn cmd_unassigned_list(storage: &Storage) -> Result<()> {
    let store = storage.load_store();
    if store.unassigned().is_empty() {
        println!("No unassigned tasks.");
        return Ok(());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Slot").add_attribute(Attribute::Bold),
        Cell::new("Priority").add_attribute(Attribute::Bold),
        Cell::new("Type").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
    ]);
    for t in store.unassigned() {
        let priority_color = match t.priority {
            Priority::High => Color::Red,
            Priority::Medium => Color::Yellow,
            Priority::Low => Color::Green,
        };
        table.add_row(vec![
            Cell::new(short_id(&t.id)),
            Cell::new(&t.title),
            Cell::new(t.time_slot.label()),
            Cell::new(format!("{:?}", t.priority).to_lowercase()).fg(priority_color),
            Cell::new(t.task_type.label()),
            Cell::new(t.status.label()),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_template_add(
    storage: &Storage,
    title: String,
    fields: &TaskFields,
    weekdays: Vec<Weekday>,
    silent: bool,
) -> Result<String> {
    let mut store = storage.load_store();
    let mut template = Template::new(title, fields.slot.unwrap_or_default());
    fields.apply_to_template(&mut template);
    template.weekdays = weekdays;
    let id = template.id.clone();
    let outcome = store.save_template(template);
    storage.persist(&mut store);
    report(&outcome, &format!("Template added (id = {}).", short_id(&id)), silent);
    Ok(id)
}

/// Lists all templates.
pub fn cmd_template_list(storage: &Storage) -> Result<()> {
    let store = storage.load_store();
    if store.templates().is_empty() {
        println!("No templates found.");
        return Ok(());
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Title", "Slot", "Time", "Type", "Recurring", "Days", "Linked"]);
    for t in store.templates() {
        let time = match (t.start_time, t.end_time) {
            (Some(s), Some(e)) => format!("{}-{}", s.format("%H:%M"), e.format("%H:%M")),
            (Some(s), None) => s.format("%H:%M").to_string(),
            _ => "-".into(),
        };
        let days: Vec<String> = t.weekdays.iter().map(|d| d.to_string()).collect();
        table.add_row(vec![
            short_id(&t.id).to_string(),
            t.title.clone(),
            t.time_slot.label().to_string(),
            time,
            t.task_type.label().to_string(),
            if t.is_recurring { "yes".into() } else { "no".into() },
            if days.is_empty() { "-".into() } else { days.join(",") },
            store.references(&t.id).to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Edits a template; every linked task picks up the new content.
pub fn cmd_template_edit(
    storage: &Storage,
    template_ref: &str,
    fields: &TaskFields,
    weekdays: Option<Vec<Weekday>>,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    let mut template = resolve_template(&store, template_ref)?;
    fields.apply_to_template(&mut template);
    if let Some(days) = weekdays {
        template.weekdays = days;
    }
    let linked = store.references(&template.id);
    let outcome = store.save_template(template);
    storage.persist(&mut store);
    report(&outcome, &format!("Template updated ({} linked task(s) synced).", linked), silent);
    Ok(())
}

pub fn cmd_template_remove(
    storage: &Storage,
    template_ref: &str,
    scope: Option<Scope>,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    let template = resolve_template(&store, template_ref)?;
    let outcome = store.delete_template(&template.id);
    let outcome = settle(&mut store, outcome, scope, silent)?;
    storage.persist(&mut store);
    report(&outcome, &format!("Template '{}' removed.", template.title), silent);
    Ok(())
}

/// Creates a task from a template on the Monday of the week at `offset`.
pub fn cmd_template_use(
    storage: &Storage,
    template_ref: &str,
    offset: i64,
    silent: bool,
) -> Result<()> {
    let mut store = storage.load_store();
    let template = resolve_template(&store, template_ref)?;
    store
        .view_week(today(), offset)
        .ok_or(PlannerError::OffsetOutOfRange(offset))?;
    let outcome = store.use_template(&template);
    storage.persist(&mut store);
    report(
        &outcome,
        &format!("Task '{}' added on {}.", template.title, store.viewed_week_start()),
        silent,
    );
    Ok(())
}

/// Creates tasks from several templates across the chosen weekdays of one week.
///
/// With no weekdays given, each template's own advisory weekdays are used.
pub fn cmd_template_batch(
    storage: &Storage,
    template_refs: &[String],
    offset: i64,
    weekdays: &[Weekday],
    slot: TimeSlot,
    silent: bool,
) -> Result<usize> {
    let mut store = storage.load_store();
    let templates = template_refs
        .iter()
        .map(|r| resolve_template(&store, r))
        .collect::<Result<Vec<Template>>>()?;
    let view = store
        .view_week(today(), offset)
        .ok_or(PlannerError::OffsetOutOfRange(offset))?;

    let mut added = 0;
    for template in &templates {
        let days = if weekdays.is_empty() { template.weekdays.as_slice() } else { weekdays };
        let dates: Vec<NaiveDate> = view
            .days
            .iter()
            .map(|d| d.date)
            .filter(|date| days.contains(&date.weekday()))
            .collect();
        added += store.batch_add(std::slice::from_ref(&template.id), &dates, slot);
    }
    storage.persist(&mut store);
    if !silent {
        println!("{} task(s) added.", added);
    }
    Ok(added)
}

/// Deletes every data file after confirmation.
pub fn cmd_reset(storage: &Storage, force: bool) -> Result<()> {
    let prompt = "Delete all weeks, templates and unassigned tasks? This cannot be undone.";
    if !force && !confirm(prompt)? {
        println!("Aborted.");
        return Ok(());
    }
    storage.delete_all()?;
    println!("All planner data deleted.");
    Ok(())
}
