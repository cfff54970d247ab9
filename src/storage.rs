use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::models::{Task, Template};
use crate::store::{WeekMap, WeekStore};

/// Weekly task map, `{ "<monday>": WeekRecord }`.
pub const WEEKS_FILE: &str = "weekly-planner-data-v1.json";
/// Template list.
pub const TEMPLATES_FILE: &str = "weekly-planner-templates-v1.json";
/// Template list written by older versions; migrated once into `TEMPLATES_FILE`.
pub const LEGACY_TEMPLATES_FILE: &str = "weekly-planner-templates.json";
/// Unassigned task pool.
pub const UNASSIGNED_FILE: &str = "weekly-planner-unassigned-tasks.json";

/// Durable home of the three planner collections, one JSON file each.
///
/// Loading never fails: a missing, unreadable or malformed file yields an
/// empty collection and a warning. Saving reports errors to the caller,
/// except through [`Storage::persist`], which only logs them.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Contents of `name`, or `None` when absent, blank or unreadable.
    fn read_raw(&self, name: &str) -> Option<String> {
        let path = self.path(name);
        let mut f = match OpenOptions::new().read(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to open data file");
                return None;
            }
        };
        let mut s = String::new();
        if let Err(e) = f.read_to_string(&mut s) {
            warn!(path = %path.display(), error = %e, "failed to read data file");
            return None;
        }
        if s.trim().is_empty() {
            None
        } else {
            Some(s)
        }
    }

    fn write_raw(&self, name: &str, contents: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path(name))?;
        f.write_all(contents.as_bytes())?;
        Ok(())
    }

    fn parse_or_default<T: DeserializeOwned + Default>(
        &self,
        name: &str,
        raw: Option<String>,
    ) -> T {
        let Some(raw) = raw else {
            return T::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(file = name, error = %e, "stored data is malformed, starting empty");
            T::default()
        })
    }

    fn save_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let s = serde_json::to_string_pretty(value)?;
        self.write_raw(name, &s)?;
        Ok(())
    }

    pub fn load_weeks(&self) -> WeekMap {
        self.parse_or_default(WEEKS_FILE, self.read_raw(WEEKS_FILE))
    }

    /// Loads templates, first moving a legacy template file into place if needed.
    pub fn load_templates(&self) -> Vec<Template> {
        let mut raw = self.read_raw(TEMPLATES_FILE);
        if raw.is_none() {
            if let Some(old) = self.read_raw(LEGACY_TEMPLATES_FILE) {
                match self.write_raw(TEMPLATES_FILE, &old) {
                    Ok(()) => {
                        if let Err(e) = fs::remove_file(self.path(LEGACY_TEMPLATES_FILE)) {
                            warn!(
                                error = %e,
                                "migrated templates but could not remove legacy file"
                            );
                        }
                        info!(
                            from = LEGACY_TEMPLATES_FILE,
                            to = TEMPLATES_FILE,
                            "migrated templates"
                        );
                    }
                    Err(e) => error!(error = %e, "failed to migrate legacy templates"),
                }
                raw = Some(old);
            }
        }
        self.parse_or_default(TEMPLATES_FILE, raw)
    }

    pub fn load_unassigned(&self) -> Vec<Task> {
        self.parse_or_default(UNASSIGNED_FILE, self.read_raw(UNASSIGNED_FILE))
    }

    pub fn save_weeks(&self, weeks: &WeekMap) -> Result<()> {
        self.save_json(WEEKS_FILE, weeks)
    }

    pub fn save_templates(&self, templates: &[Template]) -> Result<()> {
        self.save_json(TEMPLATES_FILE, templates)
    }

    pub fn save_unassigned(&self, tasks: &[Task]) -> Result<()> {
        self.save_json(UNASSIGNED_FILE, tasks)
    }

    /// Builds a store from whatever is on disk.
    pub fn load_store(&self) -> WeekStore {
        WeekStore::from_parts(self.load_weeks(), self.load_templates(), self.load_unassigned())
    }

    /// Writes every collection the store reports as changed.
    ///
    /// Failures are logged and otherwise ignored; the in-memory state stays
    /// authoritative and the next successful write catches the file up.
    pub fn persist(&self, store: &mut WeekStore) {
        let dirty = store.take_dirty();
        if dirty.weeks {
            if let Err(e) = self.save_weeks(store.weeks()) {
                error!(error = %e, "failed to save weekly tasks");
            }
        }
        if dirty.templates {
            if let Err(e) = self.save_templates(store.templates()) {
                error!(error = %e, "failed to save templates");
            }
        }
        if dirty.unassigned {
            if let Err(e) = self.save_unassigned(store.unassigned()) {
                error!(error = %e, "failed to save unassigned tasks");
            }
        }
    }

    /// Deletes all data files.
    pub fn delete_all(&self) -> std::io::Result<()> {
        for name in [WEEKS_FILE, TEMPLATES_FILE, LEGACY_TEMPLATES_FILE, UNASSIGNED_FILE] {
            let path = self.path(name);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
