//! Placement of timed tasks on the day timeline.
//!
//! The timeline is three segments cut into 30-minute ticks:
//! 08:30–12:00 (ticks 0–7), 14:00–19:00 (ticks 8–18) and 21:00–22:30
//! (ticks 19–22). Positions are in timeline units, `TICK_HEIGHT` per tick.

use chrono::{NaiveTime, Timelike};

use crate::models::{Task, TimeSlot};

pub const TICK_HEIGHT: f32 = 48.0;

/// Allowed overlap between a column's last bottom edge and the next top edge.
const COLUMN_TOLERANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub slot: TimeSlot,
    start_minute: u32,
    end_minute: u32,
    first_tick: u32,
}

impl Segment {
    /// One past the last tick of the segment.
    pub fn bottom_tick(&self) -> u32 {
        self.first_tick + (self.end_minute - self.start_minute) / 30 + 1
    }

    pub fn contains(&self, minute: u32) -> bool {
        (self.start_minute..=self.end_minute).contains(&minute)
    }
}

pub const SEGMENTS: [Segment; 3] = [
    Segment {
        slot: TimeSlot::Morning,
        start_minute: 8 * 60 + 30,
        end_minute: 12 * 60,
        first_tick: 0,
    },
    Segment {
        slot: TimeSlot::Afternoon,
        start_minute: 14 * 60,
        end_minute: 19 * 60,
        first_tick: 8,
    },
    Segment {
        slot: TimeSlot::Evening,
        start_minute: 21 * 60,
        end_minute: 22 * 60 + 30,
        first_tick: 19,
    },
];

/// Total number of ticks on the timeline.
pub fn tick_count() -> u32 {
    SEGMENTS[SEGMENTS.len() - 1].bottom_tick()
}

/// Every tick with its wall-clock label, top to bottom.
pub fn ticks() -> Vec<(NaiveTime, TimeSlot)> {
    SEGMENTS
        .iter()
        .flat_map(|seg| {
            (seg.start_minute..=seg.end_minute).step_by(30).filter_map(move |m| {
                NaiveTime::from_hms_opt(m / 60, m % 60, 0).map(|t| (t, seg.slot))
            })
        })
        .collect()
}

/// Fractional tick index of `time` and the segment it falls in.
///
/// `None` when the time lies between or outside the segments.
pub fn tick_index(time: NaiveTime) -> Option<(Segment, f32)> {
    let minute = time.hour() * 60 + time.minute();
    SEGMENTS
        .iter()
        .find(|seg| seg.contains(minute))
        .map(|seg| (*seg, seg.first_tick as f32 + (minute - seg.start_minute) as f32 / 30.0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub top: f32,
    pub height: f32,
}

impl Placement {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Vertical placement of a task with a start time.
///
/// Without an end time the task is one tick tall. An end time in another
/// segment, outside every segment, or before the start is clipped to the
/// bottom of the start's segment. Height never drops below half a tick.
pub fn position(task: &Task) -> Option<Placement> {
    let (segment, start) = tick_index(task.start_time?)?;
    let height = match task.end_time {
        None => TICK_HEIGHT,
        Some(end) => {
            let ticks = match tick_index(end) {
                Some((end_segment, end)) if end_segment == segment && end >= start => end - start,
                _ => segment.bottom_tick() as f32 - start,
            };
            (ticks * TICK_HEIGHT).max(TICK_HEIGHT / 2.0)
        }
    };
    Some(Placement { top: start * TICK_HEIGHT, height })
}

/// A timed task placed on the timeline, side by side with the tasks it overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedPlacement {
    pub task_id: String,
    pub top: f32,
    pub height: f32,
    /// Column within the overlap cluster, from 0.
    pub column: usize,
    /// Number of columns in the cluster.
    pub columns: usize,
}

impl TimedPlacement {
    pub fn left_fraction(&self) -> f32 {
        self.column as f32 / self.columns as f32
    }

    pub fn width_fraction(&self) -> f32 {
        1.0 / self.columns as f32
    }
}

/// Lays out a day's timed tasks.
///
/// Tasks are clustered by overlapping intervals; inside a cluster each task
/// goes into the first column whose last bottom edge is at or above its top.
/// Tasks without a start time, or starting outside the segments, are skipped.
pub fn layout_day(tasks: &[Task]) -> Vec<TimedPlacement> {
    let mut timed: Vec<&Task> = tasks.iter().filter(|t| t.start_time.is_some()).collect();
    timed.sort_by_key(|t| t.start_time);

    let mut positioned: Vec<(&Task, Placement)> =
        timed.into_iter().filter_map(|t| position(t).map(|p| (t, p))).collect();
    positioned.sort_by(|a, b| a.1.top.total_cmp(&b.1.top));

    let mut clusters: Vec<Vec<(&Task, Placement)>> = Vec::new();
    let mut current: Vec<(&Task, Placement)> = Vec::new();
    let mut max_bottom = f32::MIN;
    for item in positioned {
        if current.is_empty() || item.1.top < max_bottom {
            max_bottom = max_bottom.max(item.1.bottom());
            current.push(item);
        } else {
            clusters.push(std::mem::take(&mut current));
            max_bottom = item.1.bottom();
            current.push(item);
        }
    }
    if !current.is_empty() {
        clusters.push(current);
    }

    let mut laid_out = Vec::new();
    for cluster in clusters {
        let mut bottoms: Vec<f32> = Vec::new();
        let mut assigned: Vec<(&Task, Placement, usize)> = Vec::with_capacity(cluster.len());
        for (task, placement) in cluster {
            let column = match bottoms.iter().position(|b| placement.top >= b - COLUMN_TOLERANCE) {
                Some(col) => {
                    bottoms[col] = bottoms[col].max(placement.bottom());
                    col
                }
                None => {
                    bottoms.push(placement.bottom());
                    bottoms.len() - 1
                }
            };
            assigned.push((task, placement, column));
        }
        let columns = bottoms.len().max(1);
        laid_out.extend(assigned.into_iter().map(|(task, placement, column)| TimedPlacement {
            task_id: task.id.clone(),
            top: placement.top,
            height: placement.height,
            column,
            columns,
        }));
    }
    laid_out
}
