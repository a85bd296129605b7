//! Plain-text attendance report.

use std::{
    fmt::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use tracing::info;

use crate::{
    calc::summary::Overview,
    error::{BunkError, BunkResult},
    storage::entities::AppState,
    utils::time::{format_date, report_file_name},
};

const WIDTH: usize = 70;

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".into())
}

/// Fixed-width table of every subject with its present/total counts, percentage and status.
pub fn render_report(state: &AppState, overview: &Overview, generated_at: NaiveDateTime) -> String {
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "BUNKMETER - ATTENDANCE REPORT");
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Batch: {}", or_na(state.batch.clone()));
    let _ = writeln!(
        out,
        "Semester: {} to {}",
        or_na(state.semester_start.map(format_date)),
        or_na(state.semester_end.map(format_date))
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{light}");
    let _ = writeln!(
        out,
        "{:<20} {:>10} {:>10} {:>8} {:>10}",
        "Subject", "Present", "Total", "%", "Status"
    );
    let _ = writeln!(out, "{light}");
    for subject in &overview.subjects {
        let _ = writeln!(
            out,
            "{:<20} {:>10} {:>10} {:>7.1}% {:>10}",
            subject.name,
            subject.attended,
            subject.total,
            subject.percentage,
            subject.status.to_string()
        );
    }
    let _ = writeln!(out, "{light}");
    out
}

/// Writes the report into `dir` under a timestamped name and returns the file path.
pub async fn export_report(
    dir: &Path,
    state: &AppState,
    overview: &Overview,
    generated_at: NaiveDateTime,
) -> BunkResult<PathBuf> {
    if overview.subjects.is_empty() {
        return Err(BunkError::validation("No data to export"));
    }
    let path = dir.join(report_file_name(generated_at));
    tokio::fs::write(&path, render_report(state, overview, generated_at))
        .await
        .map_err(|e| BunkError::io(&path, e))?;
    info!("Report exported to {path:?}");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{export_report, render_report};
    use crate::{
        calc::summary::{compute_for_subject, Overview},
        storage::entities::{AppState, SubjectEntity},
        utils::percentage::DEFAULT_THRESHOLD,
    };

    fn sample() -> (AppState, Overview) {
        let mut daa = SubjectEntity::new("DAA", 4);
        let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        daa.absent_dates.extend(start.iter_days().take(5));
        let cn = SubjectEntity::new("CN", 1);
        let state = AppState {
            batch: Some("B1/B3".into()),
            semester_start: Some(start),
            semester_end: None,
            holidays: vec![],
            subjects: vec![daa, cn],
        };
        let overview = Overview::from_subjects(
            state
                .subjects
                .iter()
                .map(|v| compute_for_subject(v, 10, DEFAULT_THRESHOLD))
                .collect(),
        );
        (state, overview)
    }

    fn moment() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 17)
            .unwrap()
            .and_hms_opt(18, 4, 2)
            .unwrap()
    }

    #[test]
    fn report_layout() {
        let (state, overview) = sample();
        let report = render_report(&state, &overview, moment());
        let lines = report.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "=".repeat(70));
        assert_eq!(lines[4], "Generated: 2025-03-17 18:04:02");
        assert_eq!(lines[5], "Batch: B1/B3");
        assert_eq!(lines[6], "Semester: 2025-01-06 to N/A");
        assert_eq!(
            lines[9],
            "Subject                 Present      Total        %     Status"
        );
        assert_eq!(
            lines[11],
            "DAA                          35         40    87.5%       Safe"
        );
        assert_eq!(
            lines[12],
            "CN                           10         10   100.0%       Safe"
        );
        assert_eq!(lines.last(), Some(&"-".repeat(70).as_str()));
    }

    #[tokio::test]
    async fn export_writes_timestamped_file() -> Result<()> {
        let dir = tempdir()?;
        let (state, overview) = sample();
        let path = export_report(dir.path(), &state, &overview, moment()).await?;
        assert_eq!(
            path.file_name().and_then(|v| v.to_str()),
            Some("attendance_report_20250317_180402.txt")
        );
        let content = tokio::fs::read_to_string(&path).await?;
        assert!(content.contains("DAA"));

        let empty = Overview::from_subjects(vec![]);
        let err = export_report(dir.path(), &state, &empty, moment()).await.unwrap_err();
        assert!(err.is_validation());
        Ok(())
    }
}
