use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime};
use ratatui::widgets::TableState;
use tracing::debug;

use crate::dates::start_of_week;
use crate::models::{parse_hhmm, Task, Template, TimeSlot, WeekRecord};
use crate::storage::Storage;
use crate::store::{Decision, Outcome, Scope, WeekStore};

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum InputMode {
    Normal,
    Adding,
    Editing,
    Searching,
    /// A recurring edit or delete is waiting for y/n.
    Confirming,
}

/// Which list the cursor keys act on.
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Pane {
    Day,
    Unassigned,
    Templates,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum InputField {
    None,
    Title,
    Times,
    Notes,
}

/// State for the multi-step "Add" wizard.
#[derive(Default)]
pub struct AddState {
    pub title: String,
    pub slot: TimeSlot,
    pub step: usize, // 0: Title, 1: Slot, 2: Times
}

pub struct App {
    storage: Storage,
    pub store: WeekStore,
    pub today: NaiveDate,
    pub offset: i64,
    pub view: WeekRecord,
    /// Selected day within the viewed week, 0 = Monday.
    pub day: usize,
    pub pane: Pane,
    pub state: TableState,
    pub unassigned_state: TableState,
    pub template_state: TableState,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub add_state: AddState,
    pub search: String,
    pub pending: Option<Decision>,
    pub message: Option<String>,
}

impl App {
    /// Loads all data and opens the current week on today's column.
    pub fn new(storage: Storage) -> App {
        let today = Local::now().date_naive();
        let mut store = storage.load_store();
        let view = store.view(today);
        storage.persist(&mut store);

        let mut app = App {
            storage,
            store,
            today,
            offset: 0,
            view,
            day: today.weekday().num_days_from_monday() as usize,
            pane: Pane::Day,
            state: TableState::default(),
            unassigned_state: TableState::default(),
            template_state: TableState::default(),
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            add_state: AddState::default(),
            search: String::new(),
            pending: None,
            message: None,
        };
        app.refresh();
        app
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.view.week_start + Duration::days(self.day as i64)
    }

    /// The selected day's tasks that match the search, grouped by slot.
    pub fn day_tasks(&self) -> Vec<Task> {
        let Some(bucket) = self.view.day(self.selected_date()) else {
            return Vec::new();
        };
        let matching = bucket.matching(&self.search);
        TimeSlot::ALL
            .iter()
            .flat_map(|slot| matching.iter().filter(move |t| t.time_slot == *slot))
            .map(|t| (*t).clone())
            .collect()
    }

    fn selected_task(&self) -> Option<Task> {
        self.state.selected().and_then(|i| self.day_tasks().get(i).cloned())
    }

    fn selected_unassigned(&self) -> Option<Task> {
        self.unassigned_state
            .selected()
            .and_then(|i| self.store.unassigned().get(i).cloned())
    }

    fn selected_template(&self) -> Option<Template> {
        self.template_state
            .selected()
            .and_then(|i| self.store.templates().get(i).cloned())
    }

    /// Re-reads the viewed week from the store and clamps every selection.
    pub fn refresh(&mut self) {
        self.view = self.store.current_view();
        let lens = [
            self.day_tasks().len(),
            self.store.unassigned().len(),
            self.store.templates().len(),
        ];
        for (state, len) in [&mut self.state, &mut self.unassigned_state, &mut self.template_state]
            .into_iter()
            .zip(lens)
        {
            match state.selected() {
                _ if len == 0 => state.select(None),
                Some(i) if i >= len => state.select(Some(len - 1)),
                None => state.select(Some(0)),
                _ => {}
            }
        }
    }

    fn save(&mut self) {
        self.storage.persist(&mut self.store);
    }

    /// Persists an applied change, or parks a decision for the y/n popup.
    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Applied => {
                self.message = None;
                self.save();
            }
            Outcome::NoOp => self.message = Some("Nothing changed".into()),
            Outcome::NeedsDecision(decision) => {
                debug!(?decision, "waiting for scope decision");
                self.pending = Some(decision);
                self.input_mode = InputMode::Confirming;
            }
        }
        self.refresh();
    }

    pub fn resolve_pending(&mut self, scope: Scope) {
        self.input_mode = InputMode::Normal;
        if let Some(decision) = self.pending.take() {
            let outcome = self.store.resolve(decision, scope);
            self.apply(outcome);
        }
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
        self.input_mode = InputMode::Normal;
        self.message = Some("Cancelled".into());
    }

    fn load_week(&mut self, offset: i64) {
        match self.store.view_week(self.today, offset) {
            Some(view) => {
                self.offset = offset;
                self.view = view;
                self.save();
                self.refresh();
            }
            None => self.message = Some("No further weeks".into()),
        }
    }

    pub fn next_week(&mut self) {
        self.load_week(self.offset.saturating_add(1));
    }

    pub fn prev_week(&mut self) {
        self.load_week(self.offset.saturating_sub(1));
    }

    pub fn this_week(&mut self) {
        self.day = self.today.weekday().num_days_from_monday() as usize;
        self.load_week(0);
    }

    pub fn next_day(&mut self) {
        self.day = (self.day + 1) % 7;
        self.refresh();
    }

    pub fn prev_day(&mut self) {
        self.day = (self.day + 6) % 7;
        self.refresh();
    }

    pub fn cycle_pane(&mut self) {
        self.pane = match self.pane {
            Pane::Day => Pane::Unassigned,
            Pane::Unassigned => Pane::Templates,
            Pane::Templates => Pane::Day,
        };
    }

    fn active(&mut self) -> (&mut TableState, usize) {
        match self.pane {
            Pane::Day => {
                let len = self.day_tasks().len();
                (&mut self.state, len)
            }
            Pane::Unassigned => (&mut self.unassigned_state, self.store.unassigned().len()),
            Pane::Templates => (&mut self.template_state, self.store.templates().len()),
        }
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let (state, len) = self.active();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let (state, len) = self.active();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Advances the selected task's status one step.
    pub fn cycle_status(&mut self) {
        let date = self.selected_date();
        match self.pane {
            Pane::Day => {
                if let Some(t) = self.selected_task() {
                    let outcome = self.store.set_status(date, &t.id, t.status.next());
                    self.apply(outcome);
                }
            }
            Pane::Unassigned => {
                if let Some(mut t) = self.selected_unassigned() {
                    t.status = t.status.next();
                    let outcome = self.store.update_unassigned(t);
                    self.apply(outcome);
                }
            }
            Pane::Templates => {}
        }
    }

    pub fn toggle_recurring(&mut self) {
        let date = self.selected_date();
        match self.pane {
            Pane::Day => {
                if let Some(mut t) = self.selected_task() {
                    t.is_recurring = !t.is_recurring;
                    let outcome = self.store.update_task(date, t);
                    self.apply(outcome);
                }
            }
            Pane::Templates => {
                if let Some(mut t) = self.selected_template() {
                    t.is_recurring = !t.is_recurring;
                    let outcome = self.store.save_template(t);
                    self.apply(outcome);
                }
            }
            Pane::Unassigned => {}
        }
    }

    /// Deletes the selected task or template.
    pub fn delete_selected(&mut self) {
        let date = self.selected_date();
        let outcome = match self.pane {
            Pane::Day => match self.selected_task() {
                Some(t) => self.store.delete_task(date, &t.id),
                None => return,
            },
            Pane::Unassigned => match self.selected_unassigned() {
                Some(t) => self.store.delete_unassigned(&t.id),
                None => return,
            },
            Pane::Templates => match self.selected_template() {
                Some(t) => self.store.delete_template(&t.id),
                None => return,
            },
        };
        self.apply(outcome);
    }

    /// Sends the selected day task to the unassigned pool.
    pub fn unassign_selected(&mut self) {
        if self.pane != Pane::Day {
            return;
        }
        let date = self.selected_date();
        if let Some(t) = self.selected_task() {
            let outcome = self.store.unassign_task(date, &t.id);
            self.apply(outcome);
        }
    }

    /// Puts the selected pool task on the selected day, keeping its slot.
    pub fn assign_selected(&mut self) {
        let date = self.selected_date();
        if let Some(t) = self.selected_unassigned() {
            let outcome = self.store.assign_task(&t.id, date, t.time_slot);
            self.apply(outcome);
        }
    }

    /// Moves the selected day task `days` days over and follows it.
    pub fn move_selected(&mut self, days: i64) {
        if self.pane != Pane::Day {
            return;
        }
        let Some(t) = self.selected_task() else {
            return;
        };
        let from = self.selected_date();
        let to = from + Duration::days(days);
        let outcome = self.store.move_task(Some(from), to, &t.id, t.time_slot);
        if outcome == Outcome::Applied && start_of_week(to) != self.view.week_start {
            let offset = self.offset + days.signum();
            if self.store.view_week(self.today, offset).is_some() {
                self.offset = offset;
            }
        }
        self.day = to.weekday().num_days_from_monday() as usize;
        self.apply(outcome);
    }

    /// Moves the selected task one place up or down within its slot.
    pub fn shift_selected(&mut self, up: bool) {
        if self.pane != Pane::Day {
            return;
        }
        let (Some(t), Some(selected)) = (self.selected_task(), self.state.selected()) else {
            return;
        };
        let date = self.selected_date();
        let Some(bucket) = self.view.day(date) else {
            return;
        };
        let mut ids: Vec<String> = bucket.slot_tasks(t.time_slot).map(|t| t.id.clone()).collect();
        let Some(pos) = ids.iter().position(|id| *id == t.id) else {
            return;
        };
        let target = if up { pos.checked_sub(1) } else { Some(pos + 1).filter(|p| *p < ids.len()) };
        let Some(target) = target else {
            return;
        };
        ids.swap(pos, target);
        let outcome = self.store.reorder_tasks(date, t.time_slot, &ids);
        if outcome == Outcome::Applied && self.search.is_empty() {
            self.state.select(Some(if up { selected - 1 } else { selected + 1 }));
        }
        self.apply(outcome);
    }

    /// Creates a task from the selected template on Monday of the viewed week.
    pub fn use_selected_template(&mut self) {
        if let Some(t) = self.selected_template() {
            let outcome = self.store.use_template(&t);
            self.day = 0;
            self.apply(outcome);
            self.message = Some(format!("Added '{}' on Monday", t.title));
        }
    }

    /// Initiates the "Add" wizard for the current pane.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    /// Initiates editing of one field of the selected task or template.
    pub fn start_edit(&mut self, field: InputField) {
        let (title, notes, start, end) = match self.pane {
            Pane::Day | Pane::Unassigned => {
                let task = if self.pane == Pane::Day {
                    self.selected_task()
                } else {
                    self.selected_unassigned()
                };
                let Some(t) = task else { return };
                (t.title, t.notes, t.start_time, t.end_time)
            }
            Pane::Templates => {
                let Some(t) = self.selected_template() else { return };
                (t.title, t.notes, t.start_time, t.end_time)
            }
        };
        self.input_buffer = match field {
            InputField::Title => title,
            InputField::Notes => notes.unwrap_or_default(),
            InputField::Times => format_range(start, end),
            InputField::None => String::new(),
        };
        self.input_field = field;
        self.input_mode = InputMode::Editing;
    }

    pub fn start_search(&mut self) {
        self.input_buffer = self.search.clone();
        self.input_mode = InputMode::Searching;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    /// Handles Enter based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Searching => {
                self.search = self.input_buffer.trim().to_string();
                self.cancel_input();
                self.refresh();
            }
            _ => {}
        }
    }

    fn handle_adding_input(&mut self) {
        match self.add_state.step {
            0 => {
                // Title
                if !self.input_buffer.trim().is_empty() {
                    self.add_state.title = self.input_buffer.trim().to_string();
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            1 => {
                // Slot
                match parse_slot(&self.input_buffer) {
                    Some(slot) => {
                        self.add_state.slot = slot;
                        self.add_state.step += 1;
                        self.input_buffer.clear();
                    }
                    None => self.message = Some("Slot must be m, a or e".into()),
                }
            }
            2 => {
                // Times
                let Ok((start, end)) = parse_range(&self.input_buffer) else {
                    self.message = Some("Times must look like 09:00-10:30".into());
                    return;
                };
                let title = std::mem::take(&mut self.add_state.title);
                let slot = self.add_state.slot;
                let date = self.selected_date();
                let outcome = match self.pane {
                    Pane::Templates => {
                        let mut t = Template::new(title, slot);
                        t.start_time = start;
                        t.end_time = end;
                        self.store.save_template(t)
                    }
                    pane => {
                        let mut t = Task::new(title, slot);
                        t.start_time = start;
                        t.end_time = end;
                        if pane == Pane::Unassigned {
                            self.store.add_unassigned(t)
                        } else {
                            self.store.add_task(date, t)
                        }
                    }
                };
                self.cancel_input();
                self.apply(outcome);
            }
            _ => {}
        }
    }

    fn handle_editing_input(&mut self) {
        let field = self.input_field;
        let value = self.input_buffer.trim().to_string();
        let times = if field == InputField::Times {
            match parse_range(&value) {
                Ok(range) => Some(range),
                Err(_) => {
                    self.message = Some("Times must look like 09:00-10:30".into());
                    return;
                }
            }
        } else {
            None
        };
        if field == InputField::Title && value.is_empty() {
            return;
        }
        self.cancel_input();

        let date = self.selected_date();
        let outcome = match self.pane {
            Pane::Day | Pane::Unassigned => {
                let task = if self.pane == Pane::Day {
                    self.selected_task()
                } else {
                    self.selected_unassigned()
                };
                let Some(mut t) = task else { return };
                match field {
                    InputField::Title => t.title = value,
                    InputField::Notes => t.notes = Some(value).filter(|s| !s.is_empty()),
                    InputField::Times => {
                        if let Some((start, end)) = times {
                            t.start_time = start;
                            t.end_time = end;
                        }
                    }
                    InputField::None => return,
                }
                if self.pane == Pane::Day {
                    self.store.update_task(date, t)
                } else {
                    self.store.update_unassigned(t)
                }
            }
            Pane::Templates => {
                let Some(mut t) = self.selected_template() else { return };
                match field {
                    InputField::Title => t.title = value,
                    InputField::Notes => t.notes = Some(value).filter(|s| !s.is_empty()),
                    InputField::Times => {
                        if let Some((start, end)) = times {
                            t.start_time = start;
                            t.end_time = end;
                        }
                    }
                    InputField::None => return,
                }
                self.store.save_template(t)
            }
        };
        self.apply(outcome);
    }
}

fn parse_slot(input: &str) -> Option<TimeSlot> {
    match input.trim().to_lowercase().as_str() {
        "" | "m" | "morning" => Some(TimeSlot::Morning),
        "a" | "afternoon" => Some(TimeSlot::Afternoon),
        "e" | "evening" => Some(TimeSlot::Evening),
        _ => None,
    }
}

/// Parses `""`, `HH:MM` or `HH:MM-HH:MM`.
pub fn parse_range(input: &str) -> crate::error::Result<(Option<NaiveTime>, Option<NaiveTime>)> {
    let input = input.trim();
    if input.is_empty() {
        return Ok((None, None));
    }
    match input.split_once('-') {
        Some((start, end)) => Ok((Some(parse_hhmm(start)?), Some(parse_hhmm(end)?))),
        None => Ok((Some(parse_hhmm(input)?), None)),
    }
}

pub fn format_range(start: Option<NaiveTime>, end: Option<NaiveTime>) -> String {
    match (start, end) {
        (Some(s), Some(e)) => format!("{}-{}", s.format("%H:%M"), e.format("%H:%M")),
        (Some(s), None) => s.format("%H:%M").to_string(),
        _ => String::new(),
    }
}
