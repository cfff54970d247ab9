use chrono::{Duration, Local, NaiveDate, Weekday};
use tempfile::TempDir;
use weekplan::commands::*;
use weekplan::dates::start_of_week;
use weekplan::error::PlannerError;
use weekplan::models::{Priority, Status, TaskType, TimeSlot};
use weekplan::storage::Storage;
use weekplan::store::Scope;

fn with_test_dir<F>(f: F)
where
    F: FnOnce(&Storage),
{
    let dir = TempDir::new().unwrap();
    let storage = Storage::new(dir.path());
    f(&storage);
}

fn d(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn titled(title: &str) -> TaskFields {
    TaskFields { title: Some(title.to_string()), ..Default::default() }
}

#[test]
fn test_add_and_status() {
    with_test_dir(|storage| {
        let fields = TaskFields {
            slot: Some(TimeSlot::Afternoon),
            priority: Some(Priority::High),
            task_type: Some(TaskType::Meeting),
            ..Default::default()
        };
        let id = cmd_add(storage, "Review".into(), Some(d("2025-06-04")), &fields, true).unwrap();

        let store = storage.load_store();
        let task = store.find_task(d("2025-06-04"), &id).unwrap();
        assert_eq!(task.title, "Review");
        assert_eq!(task.time_slot, TimeSlot::Afternoon);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.task_type, TaskType::Meeting);

        // Short ids resolve, and no status means "advance".
        cmd_status(storage, d("2025-06-04"), short_id(&id), None, true).unwrap();
        let store = storage.load_store();
        assert_eq!(store.find_task(d("2025-06-04"), &id).unwrap().status, Status::InProgress);

        cmd_status(storage, d("2025-06-04"), &id, Some(Status::Done), true).unwrap();
        let store = storage.load_store();
        assert_eq!(store.find_task(d("2025-06-04"), &id).unwrap().status, Status::Done);
    });
}

#[test]
fn test_add_without_date_goes_to_pool() {
    with_test_dir(|storage| {
        let id = cmd_add(storage, "Someday".into(), None, &TaskFields::default(), true).unwrap();
        let store = storage.load_store();
        assert_eq!(store.unassigned().len(), 1);
        assert_eq!(store.unassigned()[0].id, id);
        assert!(store.weeks().is_empty());
    });
}

#[test]
fn test_unknown_task_is_an_error() {
    with_test_dir(|storage| {
        let err = cmd_status(storage, d("2025-06-04"), "nope", None, true).unwrap_err();
        assert!(matches!(err, PlannerError::TaskNotFound { .. }));
        let err = cmd_template_remove(storage, "nope", None, true).unwrap_err();
        assert!(matches!(err, PlannerError::TemplateNotFound(_)));
    });
}

#[test]
fn test_edit_fields() {
    with_test_dir(|storage| {
        let id = cmd_add(storage, "Draft".into(), Some(d("2025-06-04")), &TaskFields::default(), true).unwrap();
        let mut fields = titled("Final draft");
        fields.start = weekplan::models::parse_hhmm("10:00").ok();
        fields.notes = Some("send to team".into());
        cmd_edit(storage, Some(d("2025-06-04")), &id, &fields, None, true).unwrap();

        let store = storage.load_store();
        let task = store.find_task(d("2025-06-04"), &id).unwrap();
        assert_eq!(task.title, "Final draft");
        assert_eq!(task.notes.as_deref(), Some("send to team"));
        assert!(task.start_time.is_some());

        let clear = TaskFields { clear_times: true, notes: Some(String::new()), ..Default::default() };
        cmd_edit(storage, Some(d("2025-06-04")), &id, &clear, None, true).unwrap();
        let store = storage.load_store();
        let task = store.find_task(d("2025-06-04"), &id).unwrap();
        assert!(task.start_time.is_none());
        assert!(task.notes.is_none());
    });
}

#[test]
fn test_recurring_edit_with_scope() {
    with_test_dir(|storage| {
        let fields = TaskFields { recurring: Some(true), ..Default::default() };
        let id = cmd_add(storage, "Standup".into(), Some(d("2025-05-27")), &fields, true).unwrap();

        // Viewing the next week copies the task.
        cmd_layout(storage, d("2025-06-03")).unwrap();
        let store = storage.load_store();
        let copy = store.materialize(d("2025-06-02")).days[1].tasks[0].clone();
        assert_ne!(copy.id, id);

        cmd_edit(storage, Some(d("2025-05-27")), &id, &titled("Sync"), Some(Scope::All), true).unwrap();
        let store = storage.load_store();
        assert_eq!(store.find_task(d("2025-05-27"), &id).unwrap().title, "Sync");
        assert_eq!(store.find_task(d("2025-06-03"), &copy.id).unwrap().title, "Sync");

        // Silent without a scope only touches the one instance.
        cmd_edit(storage, Some(d("2025-06-03")), &copy.id, &titled("Late sync"), None, true).unwrap();
        let store = storage.load_store();
        assert_eq!(store.find_task(d("2025-05-27"), &id).unwrap().title, "Sync");
        assert_eq!(store.find_task(d("2025-06-03"), &copy.id).unwrap().title, "Late sync");
    });
}

#[test]
fn test_remove_recurring_all_weeks() {
    with_test_dir(|storage| {
        let fields = TaskFields { recurring: Some(true), ..Default::default() };
        let tpl = cmd_template_add(storage, "Standup".into(), &fields, vec![Weekday::Tue], true).unwrap();
        cmd_template_batch(storage, &[tpl.clone()], 0, &[], TimeSlot::Morning, true).unwrap();
        // Opening next week copies the recurring task forward.
        cmd_week(storage, 1, None).unwrap();

        let monday = start_of_week(Local::now().date_naive());
        let store = storage.load_store();
        assert_eq!(store.references(&tpl), 2);
        assert_eq!(store.materialize(monday + Duration::days(7)).days[1].tasks.len(), 1);

        let id = store.materialize(monday).days[1].tasks[0].id.clone();
        cmd_remove(storage, Some(monday + Duration::days(1)), &id, Some(Scope::All), true).unwrap();
        let store = storage.load_store();
        assert_eq!(store.references(&tpl), 0);
        assert_eq!(store.templates().len(), 1);
    });
}

#[test]
fn test_assign_move_unassign() {
    with_test_dir(|storage| {
        let id = cmd_add(storage, "Read paper".into(), None, &TaskFields::default(), true).unwrap();
        cmd_assign(storage, &id, d("2025-06-04"), TimeSlot::Afternoon, true).unwrap();
        let store = storage.load_store();
        assert!(store.unassigned().is_empty());
        assert_eq!(store.find_task(d("2025-06-04"), &id).unwrap().time_slot, TimeSlot::Afternoon);

        cmd_move(storage, Some(d("2025-06-04")), d("2025-06-05"), &id, TimeSlot::Evening, true).unwrap();
        let store = storage.load_store();
        assert!(store.find_task(d("2025-06-04"), &id).is_none());
        assert_eq!(store.find_task(d("2025-06-05"), &id).unwrap().time_slot, TimeSlot::Evening);

        cmd_unassign(storage, d("2025-06-05"), &id, true).unwrap();
        let store = storage.load_store();
        assert_eq!(store.unassigned().len(), 1);
        assert!(store.find_task(d("2025-06-05"), &id).is_none());

        cmd_move(storage, None, d("2025-06-06"), &id, TimeSlot::Morning, true).unwrap();
        assert!(storage.load_store().find_task(d("2025-06-06"), &id).is_some());
    });
}

#[test]
fn test_reorder() {
    with_test_dir(|storage| {
        let date = Some(d("2025-06-04"));
        let a = cmd_add(storage, "A".into(), date, &TaskFields::default(), true).unwrap();
        let b = cmd_add(storage, "B".into(), date, &TaskFields::default(), true).unwrap();
        let c = cmd_add(storage, "C".into(), date, &TaskFields::default(), true).unwrap();

        cmd_reorder(storage, d("2025-06-04"), TimeSlot::Morning, &[c.clone(), a.clone(), b.clone()], true).unwrap();
        let store = storage.load_store();
        let ids: Vec<String> = store.materialize(d("2025-06-04")).days[2].tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![c, a, b]);
    });
}

#[test]
fn test_pool_edit_and_remove() {
    with_test_dir(|storage| {
        let id = cmd_add(storage, "Idea".into(), None, &TaskFields::default(), true).unwrap();
        cmd_edit(storage, None, &id, &titled("Better idea"), None, true).unwrap();
        assert_eq!(storage.load_store().unassigned()[0].title, "Better idea");

        cmd_remove(storage, None, &id, None, true).unwrap();
        assert!(storage.load_store().unassigned().is_empty());
    });
}

#[test]
fn test_template_lifecycle() {
    with_test_dir(|storage| {
        let fields = TaskFields { slot: Some(TimeSlot::Evening), ..Default::default() };
        let tpl = cmd_template_add(storage, "Gym".into(), &fields, vec![Weekday::Mon, Weekday::Wed], true).unwrap();

        // Title lookup is case-insensitive; batch defaults to the template's weekdays.
        let added = cmd_template_batch(storage, &["gym".to_string()], 0, &[], TimeSlot::Evening, true).unwrap();
        assert_eq!(added, 2);
        cmd_template_use(storage, &tpl, 0, true).unwrap();

        let monday = start_of_week(Local::now().date_naive());
        let store = storage.load_store();
        assert_eq!(store.references(&tpl), 3);
        assert_eq!(store.materialize(monday).days[0].tasks.len(), 2);

        cmd_template_edit(storage, "Gym", &titled("Swim"), None, true).unwrap();
        let store = storage.load_store();
        assert!(store.materialize(monday).tasks().all(|t| t.title == "Swim"));

        // Silent removal keeps the tasks.
        cmd_template_remove(storage, &tpl, None, true).unwrap();
        let store = storage.load_store();
        assert!(store.templates().is_empty());
        assert_eq!(store.materialize(monday).tasks().count(), 3);
    });
}

#[test]
fn test_template_remove_with_tasks() {
    with_test_dir(|storage| {
        let tpl = cmd_template_add(storage, "Review".into(), &TaskFields::default(), Vec::new(), true).unwrap();
        cmd_template_batch(storage, &[tpl.clone()], 1, &[Weekday::Fri], TimeSlot::Morning, true).unwrap();
        cmd_template_remove(storage, &tpl[..6], Some(Scope::All), true).unwrap();

        let store = storage.load_store();
        assert!(store.templates().is_empty());
        assert_eq!(store.references(&tpl), 0);
    });
}

#[test]
fn test_parse_date_and_short_id() {
    assert_eq!(parse_date("2025-06-02").unwrap(), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
    assert_eq!(parse_date("today").unwrap(), Local::now().date_naive());
    assert!(matches!(parse_date("02/06/2025"), Err(PlannerError::InvalidDate(_))));
    assert_eq!(short_id("task_0123456789abcdef"), "01234567");
    assert_eq!(short_id("t1"), "t1");
}

#[test]
fn test_reset() {
    with_test_dir(|storage| {
        cmd_add(storage, "Gone soon".into(), None, &TaskFields::default(), true).unwrap();
        cmd_reset(storage, true).unwrap();
        assert!(storage.load_store().unassigned().is_empty());
    });
}

#[test]
fn test_offset_outside_calendar_is_an_error() {
    with_test_dir(|storage| {
        let err = cmd_week(storage, 20_000_000, None).unwrap_err();
        assert!(matches!(err, PlannerError::OffsetOutOfRange(20_000_000)));
        let err = cmd_template_batch(storage, &[], -20_000_000, &[], TimeSlot::Morning, true).unwrap_err();
        assert!(matches!(err, PlannerError::OffsetOutOfRange(_)));
    });
}
