use ansi_term::Colour;

use crate::{
    calc::{
        attendance::Status,
        summary::{CountSource, Overview},
    },
    storage::entities::{HolidayEntity, StoredDate, SubjectEntity},
    timetable::{Timetable, DAYS},
    utils::percentage::Percentage,
};

fn paint_status(status: Status, width: usize) -> String {
    let text = format!("{:<width$}", status.to_string());
    match status {
        Status::Safe => Colour::Green.paint(text).to_string(),
        Status::AtRisk => Colour::Red.paint(text).to_string(),
    }
}

fn source_note(source: CountSource) -> &'static str {
    match source {
        CountSource::Timetable => "",
        CountSource::TotalOverride => "total set manually",
        CountSource::AttendanceOverride => "manual",
    }
}

pub fn print_overview(overview: &Overview, weeks_elapsed: u32, threshold: Percentage) {
    println!(
        "{:<20}\t{:>7}\t{:>5}\t{:>6}\t{:<7}\t{:>9}",
        "Subject", "Present", "Total", "%", "Status", "Safe skip"
    );
    for subject in &overview.subjects {
        println!(
            "{:<20}\t{:>7}\t{:>5}\t{:>5.1}%\t{}\t{:>9}\t{}",
            subject.name,
            subject.attended,
            subject.total,
            subject.percentage,
            paint_status(subject.status, 7),
            subject.safe_skip,
            source_note(subject.source)
        );
    }
    println!();
    println!("Weeks elapsed:       {weeks_elapsed}");
    println!("Safe skip threshold: {threshold}");
    println!("Total subjects:      {}", overview.subjects.len());
    println!("Average attendance:  {:.1}%", overview.average_percentage);
    println!("Safe subjects:       {}", overview.safe_count);
    let at_risk = overview.at_risk_count.to_string();
    if overview.at_risk_count > 0 {
        println!("At-risk subjects:    {}", Colour::Red.paint(at_risk));
    } else {
        println!("At-risk subjects:    {at_risk}");
    }
}

pub fn print_subjects(subjects: &[SubjectEntity]) {
    for subject in subjects {
        println!("{}\t{} per week", subject.name, subject.weekly_count);
    }
}

pub fn print_holidays(holidays: &[HolidayEntity]) {
    if holidays.is_empty() {
        println!("No holidays");
        return;
    }
    for (index, holiday) in holidays.iter().enumerate() {
        let show = |v: &Option<StoredDate>| {
            v.as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".into())
        };
        let note = if holiday.period().is_none() {
            "\t(ignored: invalid dates)"
        } else {
            ""
        };
        println!("{index}\t{} - {}{note}", show(&holiday.start), show(&holiday.end));
    }
}

/// Prints either the whole week or a single day. Unknown days print nothing.
pub fn print_timetable(timetable: &Timetable, day: Option<&str>) {
    let days = match day {
        Some(day) => vec![day.to_uppercase()],
        None => DAYS.iter().map(|v| v.to_string()).collect(),
    };
    for day in days.iter().filter(|day| timetable.has_day(day)) {
        println!("{day}");
        for (slot, value) in timetable.day_cells(day) {
            let value = if value.trim().is_empty() { "-" } else { value };
            println!("  {slot}\t{value}");
        }
    }
}
