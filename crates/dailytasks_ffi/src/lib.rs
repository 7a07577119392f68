//! Flutter bridge for the DailyTasks core.

pub mod api;
