pub mod app;
pub mod ui;

use std::io;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info};

use crate::storage::Storage;
use crate::store::Scope;
use app::{App, InputField, InputMode, Pane};
use ui::ui;

pub fn run_tui(storage: Storage) -> io::Result<()> {
    info!(dir = %storage.dir().display(), "starting TUI");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(storage);
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "TUI loop failed");
        eprintln!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Right | KeyCode::Char('l') => app.next_day(),
                KeyCode::Left | KeyCode::Char('h') => app.prev_day(),
                KeyCode::Char(']') => app.next_week(),
                KeyCode::Char('[') => app.prev_week(),
                KeyCode::Char('t') => app.this_week(),
                KeyCode::Tab => app.cycle_pane(),
                KeyCode::Char(' ') => app.cycle_status(),
                KeyCode::Char('a') => app.start_add(),
                KeyCode::Char('n') => app.start_edit(InputField::Title),
                KeyCode::Char('o') => app.start_edit(InputField::Notes),
                KeyCode::Char('T') => app.start_edit(InputField::Times),
                KeyCode::Char('r') => app.toggle_recurring(),
                KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                KeyCode::Char('u') => app.unassign_selected(),
                KeyCode::Char('<') => app.move_selected(-1),
                KeyCode::Char('>') => app.move_selected(1),
                KeyCode::Char('K') => app.shift_selected(true),
                KeyCode::Char('J') => app.shift_selected(false),
                KeyCode::Char('/') => app.start_search(),
                KeyCode::Enter => match app.pane {
                    Pane::Unassigned => app.assign_selected(),
                    Pane::Templates => app.use_selected_template(),
                    Pane::Day => {}
                },
                _ => {}
            },
            InputMode::Confirming => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.resolve_pending(Scope::All),
                KeyCode::Char('n') | KeyCode::Char('N') => app.resolve_pending(Scope::One),
                KeyCode::Esc => app.cancel_pending(),
                _ => {}
            },
            InputMode::Editing | InputMode::Adding | InputMode::Searching => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => {
                    app.input_buffer.push(c);
                }
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
}
