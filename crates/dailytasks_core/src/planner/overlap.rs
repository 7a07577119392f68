//! Interval overlap validation for candidate tasks.
//!
//! # Responsibility
//! - Decide whether a candidate task may coexist with the current day plan.
//!
//! # Invariants
//! - Intervals are half-open `[start, end)`: touching endpoints never overlap.
//! - Functions here are pure and run before any mutation, so callers can
//!   reject an operation with zero partial state changes.
//! - `start < end` is enforced upstream by `Task::validate`, not here.

use crate::model::task::{Task, TaskId};
use crate::model::time_of_day::TimeOfDay;

/// Returns whether `[a_start, a_end)` and `[b_start, b_end)` intersect.
pub fn intervals_overlap(
    a_start: TimeOfDay,
    a_end: TimeOfDay,
    b_start: TimeOfDay,
    b_end: TimeOfDay,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Returns whether two tasks' intervals intersect.
pub fn tasks_overlap(a: &Task, b: &Task) -> bool {
    intervals_overlap(a.start, a.end, b.start, b.end)
}

/// Returns the first existing task that conflicts with `candidate`.
///
/// Tasks whose ID equals `exclude_id` are skipped (the edited task itself).
pub fn find_conflict<'a>(
    candidate: &Task,
    existing: &'a [Task],
    exclude_id: Option<TaskId>,
) -> Option<&'a Task> {
    existing
        .iter()
        .filter(|other| Some(other.id) != exclude_id)
        .find(|other| tasks_overlap(candidate, other))
}

/// Returns `true` when `candidate` overlaps no non-excluded task in `existing`.
pub fn is_acceptable(candidate: &Task, existing: &[Task], exclude_id: Option<TaskId>) -> bool {
    find_conflict(candidate, existing, exclude_id).is_none()
}

#[cfg(test)]
mod tests {
    use super::{intervals_overlap, is_acceptable};
    use crate::model::task::Task;
    use crate::model::time_of_day::TimeOfDay;

    fn t(text: &str) -> TimeOfDay {
        TimeOfDay::parse(text).unwrap()
    }

    #[test]
    fn containment_counts_as_overlap_in_both_directions() {
        assert!(intervals_overlap(t("09:00"), t("12:00"), t("10:00"), t("11:00")));
        assert!(intervals_overlap(t("10:00"), t("11:00"), t("09:00"), t("12:00")));
    }

    #[test]
    fn excluded_id_is_ignored_even_when_overlapping() {
        let existing = Task::new("standup", t("09:00"), t("09:30")).unwrap();
        let mut moved = existing.clone();
        moved.end = t("09:45");
        assert!(is_acceptable(&moved, &[existing.clone()], Some(existing.id)));
        assert!(!is_acceptable(&moved, &[existing], None));
    }
}
