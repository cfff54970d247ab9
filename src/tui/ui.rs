use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::commands::short_id;
use crate::dates::{holiday, iso_week_number, short_date, week_range_label, weekday_name};
use crate::layout::{layout_day, tick_count, ticks, TICK_HEIGHT};
use crate::models::{Priority, Status, Task, TaskType, TimeSlot};
use super::app::{format_range, App, InputField, InputMode, Pane};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Length(14), // Week grid
            Constraint::Min(0),     // Day / timeline / side list
            Constraint::Length(3),  // Help
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_week(f, app, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(25),
            Constraint::Percentage(30),
        ])
        .split(chunks[2]);
    render_day(f, app, body[0]);
    render_timeline(f, app, body[1]);
    match app.pane {
        Pane::Templates => render_templates(f, app, body[2]),
        _ => render_unassigned(f, app, body[2]),
    }

    render_help(f, app, chunks[3]);

    match app.input_mode {
        InputMode::Adding | InputMode::Editing | InputMode::Searching => render_input(f, app),
        InputMode::Confirming => render_confirm(f, app),
        InputMode::Normal => {}
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).border_style(style).title(title)
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Todo => Style::default(),
        Status::InProgress => Style::default().fg(Color::Yellow),
        Status::Done => Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn type_color(task_type: TaskType) -> Color {
    match task_type {
        TaskType::Plan => Color::Blue,
        TaskType::Meeting => Color::Magenta,
        TaskType::Course => Color::Green,
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let (done, total) = app.view.progress();
    let percent = if total == 0 { 0 } else { done * 100 / total };
    let mut spans = vec![
        Span::styled(
            format!("Week {} ", iso_week_number(app.view.week_start)),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "{}   {}/{} done ({}%)",
            week_range_label(app.view.week_start),
            done,
            total,
            percent
        )),
    ];
    if !app.search.is_empty() {
        spans.push(Span::styled(
            format!("   search: {}", app.search),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(msg) = &app.message {
        spans.push(Span::styled(format!("   {}", msg), Style::default().fg(Color::Gray)));
    }
    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Weekplan"));
    f.render_widget(header, area);
}

fn render_week(f: &mut Frame, app: &App, area: Rect) {
    let selected = app.selected_date();
    let mut header = vec![Cell::from("")];
    for day in &app.view.days {
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if holiday(day.date).is_some() {
            style = style.fg(Color::Red);
        }
        if day.date == app.today {
            style = style.fg(Color::Cyan);
        }
        if day.date == selected {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let mut lines = vec![Line::from(format!(
            "{} {}",
            weekday_name(day.date),
            short_date(day.date)
        ))];
        if let Some(name) = holiday(day.date) {
            lines.push(Line::from(name));
        }
        header.push(Cell::from(lines).style(style));
    }

    let rows: Vec<Row> = TimeSlot::ALL
        .iter()
        .map(|slot| {
            let mut height = 1;
            let mut cells =
                vec![Cell::from(slot.label()).style(Style::default().add_modifier(Modifier::BOLD))];
            for day in &app.view.days {
                let lines: Vec<Line> = day
                    .matching(&app.search)
                    .into_iter()
                    .filter(|t| t.time_slot == *slot)
                    .map(|t| {
                        Line::styled(
                            format!("{} {}", t.status.marker(), t.title),
                            status_style(t.status),
                        )
                    })
                    .collect();
                height = height.max(lines.len() as u16);
                cells.push(Cell::from(lines));
            }
            Row::new(cells).height(height.min(3)).bottom_margin(1)
        })
        .collect();

    let mut widths = vec![Constraint::Length(10)];
    widths.extend(std::iter::repeat(Constraint::Ratio(1, 7)).take(7));
    let table = Table::new(rows, widths)
        .header(Row::new(header).height(2).bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title("Week"));
    f.render_widget(table, area);
}

fn render_day(f: &mut Frame, app: &mut App, area: Rect) {
    let date = app.selected_date();
    let rows: Vec<Row> = app
        .day_tasks()
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.status.marker()),
                Cell::from(t.time_slot.label()),
                Cell::from(format_range(t.start_time, t.end_time)),
                Cell::from(format!("{}{}", t.title, if t.is_recurring { " ↻" } else { "" })),
                Cell::from(t.task_type.label()).style(Style::default().fg(type_color(t.task_type))),
                Cell::from(format!("{:?}", t.priority).to_lowercase())
                    .style(Style::default().fg(priority_color(t.priority))),
            ])
            .style(status_style(t.status))
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(7),
    ];
    let title = match holiday(date) {
        Some(name) => format!("{} {} · {}", weekday_name(date), short_date(date), name),
        None => format!("{} {}", weekday_name(date), short_date(date)),
    };
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["", "Slot", "Time", "Title", "Type", "Prio"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(pane_block(title, app.pane == Pane::Day))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.state);
}

/// One text row per tick; overlapping tasks sit side by side in their columns.
fn render_timeline(f: &mut Frame, app: &App, area: Rect) {
    let tasks = app.day_tasks();
    let placements = layout_day(&tasks);
    let columns = placements.iter().map(|p| p.columns).max().unwrap_or(1);
    let inner_width = area.width.saturating_sub(9) as usize;
    let col_width = (inner_width / columns).max(1);

    let mut lines = Vec::with_capacity(tick_count() as usize);
    for (i, (time, slot)) in ticks().into_iter().enumerate() {
        let tick = i as f32 * TICK_HEIGHT;
        let mut cells = vec![String::new(); columns];
        for p in &placements {
            if p.top < tick + TICK_HEIGHT && p.top + p.height > tick {
                let text = if p.top >= tick {
                    tasks
                        .iter()
                        .find(|t| t.id == p.task_id)
                        .map(|t| t.title.clone())
                        .unwrap_or_default()
                } else {
                    "┆".to_string()
                };
                if let Some(cell) = cells.get_mut(p.column) {
                    *cell = text;
                }
            }
        }
        let body: String = cells
            .iter()
            .map(|c| {
                let clipped: String = c.chars().take(col_width.saturating_sub(1)).collect();
                format!("{:<width$}", clipped, width = col_width)
            })
            .collect();
        let label_style = match slot {
            TimeSlot::Morning => Style::default().fg(Color::Yellow),
            TimeSlot::Afternoon => Style::default().fg(Color::Blue),
            TimeSlot::Evening => Style::default().fg(Color::Magenta),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} │", time.format("%H:%M")), label_style),
            Span::raw(body),
        ]));
    }
    let timeline =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Timeline"));
    f.render_widget(timeline, area);
}

fn render_unassigned(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .store
        .unassigned()
        .iter()
        .map(|t: &Task| {
            Row::new(vec![
                Cell::from(t.status.marker()),
                Cell::from(t.title.clone()),
                Cell::from(t.time_slot.label()),
            ])
            .style(status_style(t.status))
        })
        .collect();
    let widths = [Constraint::Length(2), Constraint::Min(12), Constraint::Length(10)];
    let title = format!("Unassigned ({})", app.store.unassigned().len());
    let table = Table::new(rows, widths)
        .block(pane_block(title, app.pane == Pane::Unassigned))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.unassigned_state);
}

fn render_templates(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .store
        .templates()
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(short_id(&t.id).to_string()),
                Cell::from(format!("{}{}", t.title, if t.is_recurring { " ↻" } else { "" })),
                Cell::from(t.time_slot.label()),
                Cell::from(format_range(t.start_time, t.end_time)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(8),
        Constraint::Min(12),
        Constraint::Length(10),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["ID", "Title", "Slot", "Time"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .block(pane_block("Templates".to_string(), app.pane == Pane::Templates))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.template_state);
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.input_mode {
        InputMode::Normal => match app.pane {
            Pane::Day => concat!(
                "q: Quit | ←/→: Day | [/]: Week | t: Today | Tab: Pane | a: Add | ",
                "Space: Status | n/o/T: Title/Notes/Times | r: Recurring | d: Del | ",
                "u: Unassign | </>: Move | ",
                "J/K: Reorder | /: Search",
            ),
            Pane::Unassigned => concat!(
                "q: Quit | Tab: Pane | a: Add | Enter: Assign to selected day | Space: Status | ",
                "n/o/T: Edit | d: Del",
            ),
            Pane::Templates => concat!(
                "q: Quit | Tab: Pane | a: Add | Enter: Use on Monday | n/o/T: Edit | ",
                "r: Recurring | d: Del",
            ),
        },
        InputMode::Editing | InputMode::Searching => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
        InputMode::Confirming => "y: All | n: Just this one | Esc: Cancel",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, area);
}

fn render_input(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 3, f.area());
    f.render_widget(Clear, area);

    let noun = if app.pane == Pane::Templates { "Template" } else { "Task" };
    let title = match app.input_mode {
        InputMode::Adding => match app.add_state.step {
            0 => format!("Add {}: Enter Title", noun),
            1 => format!("Add {}: Slot (m)orning / (a)fternoon / (e)vening", noun),
            _ => format!("Add {}: Time HH:MM or HH:MM-HH:MM (Optional)", noun),
        },
        InputMode::Searching => "Search titles".to_string(),
        _ => match app.input_field {
            InputField::Title => "Edit Title".to_string(),
            InputField::Notes => "Edit Notes".to_string(),
            InputField::Times => "Edit Time (HH:MM-HH:MM, empty to clear)".to_string(),
            InputField::None => "Edit".to_string(),
        },
    };
    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, area);
}

fn render_confirm(f: &mut Frame, app: &App) {
    let Some(decision) = &app.pending else {
        return;
    };
    let area = centered_rect(60, 5, f.area());
    f.render_widget(Clear, area);
    let popup = Paragraph::new(decision.prompt())
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Confirm (y/n, Esc to cancel)"));
    f.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
