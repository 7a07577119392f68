//! Read-side projections for the day view.
//!
//! # Responsibility
//! - Sort a day plan for display.
//! - Derive live progress and timeline geometry from task times.
//!
//! # Invariants
//! - All arithmetic uses minutes since midnight.
//! - Progress is clamped to `0..=100`.

use crate::model::task::Task;
use crate::model::time_of_day::{hour_label, TimeOfDay};
use std::cmp::Ordering;

/// Default timeline scale used by the mobile and web views.
pub const DEFAULT_PX_PER_HOUR: f32 = 60.0;

/// Display order: start time, then end time, then ID for determinism.
pub fn compare_for_display(a: &Task, b: &Task) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.end.cmp(&b.end))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts tasks in place for display.
pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(compare_for_display);
}

/// Percentage of `task` elapsed at `now`.
///
/// Returns 0 before start, 100 after end, otherwise the rounded elapsed share.
pub fn progress_percent(task: &Task, now: TimeOfDay) -> u8 {
    let now_mins = u32::from(now.minutes_since_midnight());
    let start_mins = u32::from(task.start.minutes_since_midnight());
    let end_mins = u32::from(task.end.minutes_since_midnight());

    if now_mins < start_mins {
        return 0;
    }
    if now_mins > end_mins || end_mins <= start_mins {
        return 100;
    }

    let total = end_mins - start_mins;
    let elapsed = now_mins - start_mins;
    ((elapsed * 100 + total / 2) / total).min(100) as u8
}

/// Whether `task` is in progress at `now` (progress strictly between 0 and 100).
pub fn is_live(task: &Task, now: TimeOfDay) -> bool {
    let progress = progress_percent(task, now);
    progress > 0 && progress < 100
}

/// Vertical placement of a task on the 24-hour timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineBlock {
    pub top_px: f32,
    pub height_px: f32,
}

/// Computes the timeline block for `task` at `px_per_hour` scale.
pub fn timeline_block(task: &Task, px_per_hour: f32) -> TimelineBlock {
    let start_mins = f32::from(task.start.minutes_since_midnight());
    let duration = f32::from(task.duration_minutes());
    TimelineBlock {
        top_px: start_mins / 60.0 * px_per_hour,
        height_px: duration / 60.0 * px_per_hour,
    }
}

/// Hour labels for the timeline gutter, `12 AM` through `11 PM`.
pub fn timeline_hour_labels() -> Vec<String> {
    (0..24).map(hour_label).collect()
}
