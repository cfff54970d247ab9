//! # Weekplan
//!
//! A weekly planner for the terminal. Tasks live on the days of a Monday-based
//! week, split into morning, afternoon and evening. A CLI covers scripting and
//! quick entry; a TUI shows the whole week at once.
//!
//! ## Features
//!
//! *   **Recurring tasks**: a task marked recurring is copied into the following
//!     week the first time that week is opened.
//! *   **Templates**: reusable blueprints. Editing a template updates every task
//!     created from it.
//! *   **Unassigned pool**: park tasks without a date and assign them later.
//! *   **Timeline**: timed tasks are laid out on a half-hour grid with
//!     overlapping tasks placed side by side.
//!
//! ## Usage
//!
//! ```bash
//! # Open the TUI
//! weekplan
//!
//! # Show this week, next week
//! weekplan week
//! weekplan week --offset 1
//!
//! # Add a recurring meeting on a day
//! weekplan add "Standup" --date 2025-06-02 --slot morning \
//!     --start 09:00 --end 09:30 --type meeting --recurring
//!
//! # Park a task, then assign it
//! weekplan add "Read paper"
//! weekplan assign <ID> 2025-06-04 --slot afternoon
//!
//! # Edit every week's copy of a recurring task without being asked
//! weekplan edit <ID> --date 2025-06-09 --title "Daily standup" --scope all
//!
//! # Templates
//! weekplan template add "Gym" --slot evening --weekdays mon,wed,fri
//! weekplan template batch Gym
//! ```
//!
//! Ids can be shortened to any unique prefix; templates can also be named by title.
//!
//! ## Data Storage
//!
//! Three JSON files live in your local data directory under `weekplan/`
//! (`~/.local/share/weekplan` on Linux). Set `WEEKPLAN_DATA_DIR` to use another
//! directory, `WEEKPLAN_LOG` to change log verbosity and `WEEKPLAN_LOG_FILE` to
//! send logs to a file.

use std::fs::OpenOptions;
use std::io;
use std::process::ExitCode;
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveTime, Weekday};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing::error;
use tracing_subscriber::EnvFilter;

use weekplan::commands::*;
use weekplan::config::Config;
use weekplan::error::PlannerError;
use weekplan::models::{parse_hhmm, Priority, Status, TaskType, TimeSlot};
use weekplan::storage::Storage;
use weekplan::store::Scope;
use weekplan::tui::run_tui;

#[derive(Parser)]
#[command(name = "weekplan")]
#[command(about = "Weekly task planner for the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Task fields shared by `add`, `edit` and the template commands.
#[derive(clap::Args)]
struct FieldArgs {
    /// Time slot
    #[arg(short, long, value_enum)]
    slot: Option<TimeSlot>,
    /// Priority
    #[arg(short, long, value_enum)]
    priority: Option<Priority>,
    /// Task type
    #[arg(short = 'k', long = "type", value_enum)]
    task_type: Option<TaskType>,
    /// Start time, HH:MM
    #[arg(long, value_parser = parse_time)]
    start: Option<NaiveTime>,
    /// End time, HH:MM
    #[arg(long, value_parser = parse_time)]
    end: Option<NaiveTime>,
    /// Notes (empty string clears them)
    #[arg(short, long)]
    notes: Option<String>,
    /// Repeat every week (`--recurring=false` to stop)
    #[arg(short, long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    recurring: Option<bool>,
}

impl FieldArgs {
    fn into_fields(
        self,
        title: Option<String>,
        clear_times: bool,
        flexible: Option<bool>,
    ) -> TaskFields {
        TaskFields {
            title,
            slot: self.slot,
            priority: self.priority,
            task_type: self.task_type,
            start: self.start,
            end: self.end,
            clear_times,
            notes: self.notes,
            recurring: self.recurring,
            flexible,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show a week as a grid
    Week {
        /// Weeks from the current one (negative for past weeks)
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
        /// Only show tasks whose title contains this text
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    /// Add a task to a day, or to the unassigned pool when no date is given
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Day, YYYY-MM-DD or "today"
        #[arg(short, long, value_parser = parse_day)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        fields: FieldArgs,
        /// Time is only a preference
        #[arg(long)]
        flexible: bool,
    },
    /// Set a task's status, or advance it one step
    Status {
        #[arg(value_parser = parse_day)]
        date: NaiveDate,
        id: String,
        #[arg(value_enum)]
        status: Option<Status>,
    },
    /// Edit a task on a day, or in the unassigned pool when no date is given
    Edit {
        id: String,
        /// Day holding the task
        #[arg(short, long, value_parser = parse_day)]
        date: Option<NaiveDate>,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
        /// Remove start and end time
        #[arg(long)]
        clear_times: bool,
        /// Mark the time as flexible (`--flexible=false` for fixed)
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        flexible: Option<bool>,
        /// For recurring tasks: apply to all weeks or only this one
        #[arg(long, value_enum)]
        scope: Option<Scope>,
    },
    /// Remove a task from a day, or from the unassigned pool when no date is given
    Remove {
        id: String,
        /// Day holding the task
        #[arg(short, long, value_parser = parse_day)]
        date: Option<NaiveDate>,
        /// For recurring tasks: remove from all weeks or only this one
        #[arg(long, value_enum)]
        scope: Option<Scope>,
    },
    /// Move a task from the unassigned pool onto a day
    Assign {
        id: String,
        #[arg(value_parser = parse_day)]
        date: NaiveDate,
        #[arg(short, long, value_enum, default_value_t = TimeSlot::Morning)]
        slot: TimeSlot,
    },
    /// Move a task to another day
    Move {
        id: String,
        /// Target day
        #[arg(value_parser = parse_day)]
        to: NaiveDate,
        /// Current day; omit to take the task from the unassigned pool
        #[arg(short, long, value_parser = parse_day)]
        from: Option<NaiveDate>,
        #[arg(short, long, value_enum, default_value_t = TimeSlot::Morning)]
        slot: TimeSlot,
    },
    /// Move a task from a day back to the unassigned pool
    Unassign {
        #[arg(value_parser = parse_day)]
        date: NaiveDate,
        id: String,
    },
    /// Reorder tasks within a slot
    Reorder {
        #[arg(value_parser = parse_day)]
        date: NaiveDate,
        #[arg(value_enum)]
        slot: TimeSlot,
        /// Task ids in the new order
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show the timeline placement of a day's timed tasks
    Layout {
        #[arg(value_parser = parse_day)]
        date: NaiveDate,
    },
    /// List the unassigned pool
    Unassigned,
    /// Manage templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Reset the planner (delete all weeks, templates and unassigned tasks)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Add a new template
    Add {
        title: String,
        #[command(flatten)]
        fields: FieldArgs,
        /// Suggested weekdays, e.g. mon,wed,fri
        #[arg(short, long, value_delimiter = ',')]
        weekdays: Vec<Weekday>,
    },
    /// List templates
    List,
    /// Edit a template and every task created from it
    Edit {
        /// Template id, id prefix or title
        template: String,
        #[arg(short, long)]
        title: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long)]
        clear_times: bool,
        #[arg(short, long, value_delimiter = ',')]
        weekdays: Option<Vec<Weekday>>,
    },
    /// Remove a template
    Remove {
        template: String,
        /// all: also delete tasks created from it; one: keep them
        #[arg(long, value_enum)]
        scope: Option<Scope>,
    },
    /// Create a task from a template on Monday of a week
    Use {
        template: String,
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
    },
    /// Create tasks from templates on several days of a week
    Batch {
        #[arg(required = true)]
        templates: Vec<String>,
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
        /// Days to fill; defaults to each template's suggested weekdays
        #[arg(short, long, value_delimiter = ',')]
        weekdays: Vec<Weekday>,
        #[arg(short, long, value_enum, default_value_t = TimeSlot::Morning)]
        slot: TimeSlot,
    },
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    parse_hhmm(s).map_err(|e| e.to_string())
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

/// Installs the global subscriber. The TUI owns the terminal, so it always logs to a file.
fn init_tracing(config: &Config, tui: bool) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_file = if tui { Some(config.tui_log_file()) } else { config.log_file.clone() };

    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        OpenOptions::new().create(true).append(true).open(&path).ok()
    });
    let result = match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None if tui => return,
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("failed to initialise logging: {}", e);
    }
}

fn run(command: Commands, storage: &Storage) -> Result<(), PlannerError> {
    match command {
        Commands::Week { offset, search } => cmd_week(storage, offset, search),
        Commands::Add { title, date, fields, flexible } => {
            let fields = fields.into_fields(None, false, Some(flexible));
            cmd_add(storage, title, date, &fields, false).map(|_| ())
        }
        Commands::Status { date, id, status } => cmd_status(storage, date, &id, status, false),
        Commands::Edit { id, date, title, fields, clear_times, flexible, scope } => {
            let fields = fields.into_fields(title, clear_times, flexible);
            cmd_edit(storage, date, &id, &fields, scope, false)
        }
        Commands::Remove { id, date, scope } => cmd_remove(storage, date, &id, scope, false),
        Commands::Assign { id, date, slot } => cmd_assign(storage, &id, date, slot, false),
        Commands::Move { id, to, from, slot } => cmd_move(storage, from, to, &id, slot, false),
        Commands::Unassign { date, id } => cmd_unassign(storage, date, &id, false),
        Commands::Reorder { date, slot, ids } => cmd_reorder(storage, date, slot, &ids, false),
        Commands::Layout { date } => cmd_layout(storage, date),
        Commands::Unassigned => cmd_unassigned_list(storage),
        Commands::Template { command } => match command {
            TemplateCommands::Add { title, fields, weekdays } => {
                let fields = fields.into_fields(None, false, None);
                cmd_template_add(storage, title, &fields, weekdays, false).map(|_| ())
            }
            TemplateCommands::List => cmd_template_list(storage),
            TemplateCommands::Edit { template, title, fields, clear_times, weekdays } => {
                let fields = fields.into_fields(title, clear_times, None);
                cmd_template_edit(storage, &template, &fields, weekdays, false)
            }
            TemplateCommands::Remove { template, scope } => {
                cmd_template_remove(storage, &template, scope, false)
            }
            TemplateCommands::Use { template, offset } => {
                cmd_template_use(storage, &template, offset, false)
            }
            TemplateCommands::Batch { templates, offset, weekdays, slot } => {
                cmd_template_batch(storage, &templates, offset, &weekdays, slot, false).map(|_| ())
            }
        },
        Commands::Reset { force } => cmd_reset(storage, force),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "weekplan", &mut io::stdout());
            Ok(())
        }
        Commands::Ui => Ok(run_tui(storage.clone())?),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from_env();
    let storage = Storage::from_config(&config);

    let command = cli.command.unwrap_or(Commands::Ui);
    init_tracing(&config, matches!(command, Commands::Ui));
    match run(command, &storage) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
