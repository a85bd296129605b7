//! Attendance tracker for students with a fixed weekly timetable.
//! Subjects and their weekly frequency come from the timetable, absences are recorded per date and
//! the number of classes that can still be skipped is estimated against a threshold.

pub mod calc;
pub mod cli;
pub mod error;
pub mod report;
pub mod service;
pub mod storage;
pub mod timetable;
pub mod utils;
