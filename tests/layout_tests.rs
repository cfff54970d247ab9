use chrono::NaiveTime;
use weekplan::layout::{layout_day, position, tick_count, tick_index, ticks, TICK_HEIGHT};
use weekplan::models::{Task, TimeSlot};

fn hm(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

fn timed(id: &str, start: &str, end: Option<&str>) -> Task {
    let mut t = Task::new(id, TimeSlot::Morning);
    t.id = id.to_string();
    t.start_time = Some(hm(start));
    t.end_time = end.map(hm);
    t
}

#[test]
fn test_tick_indices() {
    assert_eq!(tick_count(), 23);
    assert_eq!(ticks().len(), 23);

    let cases = [
        ("08:30", 0.0),
        ("12:00", 7.0),
        ("14:00", 8.0),
        ("19:00", 18.0),
        ("21:00", 19.0),
        ("22:30", 22.0),
        ("09:15", 1.5),
    ];
    for (time, expected) in cases {
        let (_, tick) = tick_index(hm(time)).unwrap();
        assert_eq!(tick, expected, "tick for {}", time);
    }
    assert!(tick_index(hm("13:00")).is_none());
    assert!(tick_index(hm("07:00")).is_none());
    assert!(tick_index(hm("23:00")).is_none());
}

#[test]
fn test_position_in_one_segment() {
    let p = position(&timed("a", "09:00", Some("10:00"))).unwrap();
    assert_eq!(p.top, TICK_HEIGHT);
    assert_eq!(p.height, 2.0 * TICK_HEIGHT);

    let p = position(&timed("b", "14:00", None)).unwrap();
    assert_eq!(p.top, 8.0 * TICK_HEIGHT);
    assert_eq!(p.height, TICK_HEIGHT);
}

#[test]
fn test_position_clips_to_segment_bottom() {
    // Morning ends after tick 7, so the bottom edge is tick 8.
    let crossing = position(&timed("a", "11:00", Some("15:00"))).unwrap();
    assert_eq!(crossing.top, 5.0 * TICK_HEIGHT);
    assert_eq!(crossing.bottom(), 8.0 * TICK_HEIGHT);

    let backwards = position(&timed("b", "15:00", Some("14:30"))).unwrap();
    assert_eq!(backwards.bottom(), 19.0 * TICK_HEIGHT);

    let outside = position(&timed("c", "21:30", Some("23:30"))).unwrap();
    assert_eq!(outside.bottom(), 23.0 * TICK_HEIGHT);
}

#[test]
fn test_position_minimum_height() {
    let p = position(&timed("a", "09:00", Some("09:00"))).unwrap();
    assert_eq!(p.height, TICK_HEIGHT / 2.0);
}

#[test]
fn test_position_needs_start_inside_timeline() {
    assert!(position(&timed("a", "13:00", Some("14:00"))).is_none());
    let mut untimed = timed("b", "09:00", None);
    untimed.start_time = None;
    assert!(position(&untimed).is_none());
}

#[test]
fn test_layout_overlapping_tasks_share_columns() {
    let tasks = vec![
        timed("c", "10:00", Some("11:00")),
        timed("a", "09:00", Some("10:00")),
        timed("b", "09:30", Some("10:30")),
        timed("late", "15:00", Some("16:00")),
    ];
    let placed = layout_day(&tasks);
    assert_eq!(placed.len(), 4);

    let get = |id: &str| placed.iter().find(|p| p.task_id == id).unwrap();
    assert_eq!((get("a").column, get("a").columns), (0, 2));
    assert_eq!((get("b").column, get("b").columns), (1, 2));
    // Starts exactly where "a" ends, so it reuses the first column.
    assert_eq!((get("c").column, get("c").columns), (0, 2));
    assert_eq!((get("late").column, get("late").columns), (0, 1));

    assert_eq!(get("b").left_fraction(), 0.5);
    assert_eq!(get("b").width_fraction(), 0.5);
    assert_eq!(get("late").width_fraction(), 1.0);
}

#[test]
fn test_layout_skips_untimed_tasks() {
    let mut untimed = timed("u", "09:00", None);
    untimed.start_time = None;
    let tasks = vec![untimed, timed("gap", "13:00", None), timed("t", "21:00", None)];
    let placed = layout_day(&tasks);
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].task_id, "t");
    assert_eq!(placed[0].top, 19.0 * TICK_HEIGHT);
}
