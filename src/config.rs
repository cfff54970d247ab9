use std::path::PathBuf;

/// Runtime settings, all taken from the environment.
///
/// | Variable | Meaning | Default |
/// |---|---|---|
/// | `WEEKPLAN_DATA_DIR` | directory holding the JSON files | `<local data dir>/weekplan` |
/// | `WEEKPLAN_LOG` | `tracing` env-filter directive | `warn` |
/// | `WEEKPLAN_LOG_FILE` | append logs to this file instead of stderr | unset |
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("WEEKPLAN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let log_filter = std::env::var("WEEKPLAN_LOG").unwrap_or_else(|_| "warn".to_string());
        let log_file = std::env::var("WEEKPLAN_LOG_FILE").ok().map(PathBuf::from);
        Self { data_dir, log_filter, log_file }
    }

    /// Where the TUI writes logs, since it owns the terminal.
    pub fn tui_log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("weekplan.log"))
    }
}

fn default_data_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(mut p) => {
            p.push("weekplan");
            p
        }
        None => PathBuf::from("./weekplan-data"),
    }
}
