use std::fs;

use chrono::{NaiveDate, NaiveTime, Weekday};
use tempfile::tempdir;
use weekplan::models::{Status, Task, Template, TimeSlot};
use weekplan::storage::{Storage, LEGACY_TEMPLATES_FILE, TEMPLATES_FILE, UNASSIGNED_FILE, WEEKS_FILE};
use weekplan::store::{Outcome, WeekStore};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn test_missing_files_load_empty() {
    let dir = tempdir().unwrap();
    let storage = Storage::new(dir.path());
    assert!(storage.load_weeks().is_empty());
    assert!(storage.load_templates().is_empty());
    assert!(storage.load_unassigned().is_empty());
}

#[test]
fn test_malformed_data_degrades_to_empty() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(WEEKS_FILE), "{ not json").unwrap();
    fs::write(dir.path().join(TEMPLATES_FILE), "[{\"title\": 3}]").unwrap();
    fs::write(dir.path().join(UNASSIGNED_FILE), "   ").unwrap();

    let storage = Storage::new(dir.path());
    let store = storage.load_store();
    assert!(store.weeks().is_empty());
    assert!(store.templates().is_empty());
    assert!(store.unassigned().is_empty());
}

#[test]
fn test_round_trip_uses_camel_case_keys() {
    let dir = tempdir().unwrap();
    let storage = Storage::new(dir.path());

    let mut store = WeekStore::default();
    let mut task = Task::new("Standup", TimeSlot::Morning);
    task.start_time = NaiveTime::from_hms_opt(9, 0, 0);
    task.end_time = NaiveTime::from_hms_opt(9, 30, 0);
    task.is_recurring = true;
    task.template_id = Some(task.id.clone());
    task.status = Status::InProgress;
    assert_eq!(store.add_task(d("2025-06-03"), task.clone()), Outcome::Applied);
    storage.persist(&mut store);

    let raw = fs::read_to_string(dir.path().join(WEEKS_FILE)).unwrap();
    for key in ["\"2025-06-02\"", "weekStartISO", "dateISO", "timeSlot", "startTime", "\"09:30\"", "templateId", "isRecurring", "\"inprogress\""] {
        assert!(raw.contains(key), "missing {} in {}", key, raw);
    }

    let loaded = storage.load_store();
    assert_eq!(loaded.find_task(d("2025-06-03"), &task.id), Some(&task));
}

#[test]
fn test_reads_records_written_by_older_versions() {
    let dir = tempdir().unwrap();
    let json = r#"{
        "2025-06-02": {
            "weekStartISO": "2025-06-02",
            "days": [
                { "dateISO": "2025-06-02", "tasks": [
                    { "id": "a", "title": "Minimal" },
                    { "id": "b", "title": "Blank times", "startTime": "", "priority": "high", "taskType": "meeting" }
                ] }
            ]
        }
    }"#;
    fs::write(dir.path().join(WEEKS_FILE), json).unwrap();

    let store = Storage::new(dir.path()).load_store();
    let view = store.materialize(d("2025-06-02"));
    assert_eq!(view.days.len(), 7);
    let monday = &view.days[0].tasks;
    assert_eq!(monday.len(), 2);
    assert_eq!(monday[0].status, Status::Todo);
    assert_eq!(monday[0].time_slot, TimeSlot::Morning);
    assert!(monday[1].start_time.is_none());
}

#[test]
fn test_legacy_templates_are_migrated() {
    let dir = tempdir().unwrap();
    let legacy = r#"[{ "id": "tpl_1", "title": "Gym", "timeSlot": "evening", "weekdays": [0, 4] }]"#;
    fs::write(dir.path().join(LEGACY_TEMPLATES_FILE), legacy).unwrap();

    let storage = Storage::new(dir.path());
    let templates = storage.load_templates();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].time_slot, TimeSlot::Evening);
    assert_eq!(templates[0].weekdays, vec![Weekday::Mon, Weekday::Fri]);
    assert!(dir.path().join(TEMPLATES_FILE).exists());
    assert!(!dir.path().join(LEGACY_TEMPLATES_FILE).exists());

    // A second load reads the migrated file.
    assert_eq!(storage.load_templates(), templates);
}

#[test]
fn test_current_templates_win_over_legacy() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(TEMPLATES_FILE), r#"[{ "id": "new", "title": "New" }]"#).unwrap();
    fs::write(dir.path().join(LEGACY_TEMPLATES_FILE), r#"[{ "id": "old", "title": "Old" }]"#).unwrap();

    let templates = Storage::new(dir.path()).load_templates();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].id, "new");
}

#[test]
fn test_persist_writes_only_changed_collections() {
    let dir = tempdir().unwrap();
    let storage = Storage::new(dir.path());
    let mut store = storage.load_store();

    assert_eq!(store.add_unassigned(Task::new("Parked", TimeSlot::Morning)), Outcome::Applied);
    storage.persist(&mut store);
    assert!(dir.path().join(UNASSIGNED_FILE).exists());
    assert!(!dir.path().join(WEEKS_FILE).exists());
    assert!(!dir.path().join(TEMPLATES_FILE).exists());

    let mut template = Template::new("Review", TimeSlot::Afternoon);
    template.weekdays = vec![Weekday::Wed];
    assert_eq!(store.save_template(template), Outcome::Applied);
    storage.persist(&mut store);
    let raw = fs::read_to_string(dir.path().join(TEMPLATES_FILE)).unwrap();
    assert!(raw.contains("\"weekdays\": [\n      2\n    ]"), "{}", raw);
    assert!(!dir.path().join(WEEKS_FILE).exists());
}

#[test]
fn test_write_failure_is_logged_not_fatal() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "a file, not a directory").unwrap();

    let storage = Storage::new(blocker.join("data"));
    let mut store = WeekStore::default();
    assert_eq!(store.add_task(d("2025-06-02"), Task::new("Kept", TimeSlot::Morning)), Outcome::Applied);
    storage.persist(&mut store);

    assert!(storage.save_weeks(store.weeks()).is_err());
    assert_eq!(store.materialize(d("2025-06-02")).days[0].tasks.len(), 1);
}

#[test]
fn test_delete_all() {
    let dir = tempdir().unwrap();
    let storage = Storage::new(dir.path());
    let mut store = WeekStore::default();
    assert_eq!(store.add_task(d("2025-06-02"), Task::new("A", TimeSlot::Morning)), Outcome::Applied);
    assert_eq!(store.add_unassigned(Task::new("B", TimeSlot::Morning)), Outcome::Applied);
    storage.persist(&mut store);

    storage.delete_all().unwrap();
    assert!(storage.load_weeks().is_empty());
    assert!(storage.load_unassigned().is_empty());
    assert!(!dir.path().join(WEEKS_FILE).exists());
}
