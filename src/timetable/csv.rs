//! `Day,Time,Subject` CSV exchange format for timetables.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{BunkError, BunkResult};

use super::{Timetable, DAYS, TIME_SLOTS};

const HEADER: [&str; 3] = ["Day", "Time", "Subject"];

/// A row that was left out of an import and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct CsvImport {
    pub timetable: Timetable,
    pub skipped: Vec<SkippedRow>,
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Splits `content` into records. Line breaks inside quoted fields stay part of the field. Every
/// record carries the line it starts on.
fn parse_csv_records(content: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => record.push(std::mem::take(&mut buf)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut buf));
                records.push((record_line, std::mem::take(&mut record)));
                line += 1;
                record_line = line;
            }
            '\n' => {
                buf.push(ch);
                line += 1;
            }
            _ => buf.push(ch),
        }
    }
    if !buf.is_empty() || !record.is_empty() {
        record.push(buf);
        records.push((record_line, record));
    }
    records
}

/// Writes every fixed day and slot in week order. Slots missing from the timetable are empty.
pub fn export_csv(timetable: &Timetable) -> String {
    let mut csv = HEADER.join(",");
    csv.push('\n');
    for day in DAYS.iter().filter(|day| timetable.has_day(day)) {
        for slot in TIME_SLOTS {
            let subject = timetable.cell(day, slot).unwrap_or_default();
            csv.push_str(&format!("{day},{slot},{}\n", csv_quote(subject)));
        }
    }
    csv
}

/// Builds a full timetable from CSV rows. Rows naming an unknown day or slot are skipped, a missing
/// header column rejects the whole file.
pub fn import_csv(content: &str) -> BunkResult<CsvImport> {
    let mut records = parse_csv_records(content.trim_start_matches('\u{feff}')).into_iter();
    let header = records.next().map(|(_, v)| v).unwrap_or_default();
    let column = |name: &str| header.iter().position(|v| v.trim() == name);
    let (Some(day_col), Some(time_col), Some(subject_col)) =
        (column(HEADER[0]), column(HEADER[1]), column(HEADER[2]))
    else {
        return Err(BunkError::validation(format!(
            "CSV must have columns: {}",
            HEADER.join(", ")
        )));
    };

    let mut timetable = Timetable::blank();
    let mut skipped = Vec::new();
    for (line_no, record) in records {
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        let field = |col: usize| record.get(col).map(|v| v.trim());
        let (Some(day), Some(time), Some(subject)) =
            (field(day_col), field(time_col), field(subject_col))
        else {
            warn!("Skipping line {line_no}: expected {} columns", HEADER.len());
            skipped.push(SkippedRow {
                line: line_no,
                reason: format!("expected {} columns", HEADER.len()),
            });
            continue;
        };

        let day = day.to_uppercase();
        if !DAYS.contains(&day.as_str()) {
            warn!("Skipping line {line_no}: invalid day {day}");
            skipped.push(SkippedRow {
                line: line_no,
                reason: format!("invalid day: {day}"),
            });
            continue;
        }
        if !TIME_SLOTS.contains(&time) {
            warn!("Skipping line {line_no}: invalid time slot {time}");
            skipped.push(SkippedRow {
                line: line_no,
                reason: format!("invalid time slot: {time}"),
            });
            continue;
        }
        timetable.set_cell(&day, time, subject);
    }

    Ok(CsvImport { timetable, skipped })
}

pub async fn read_csv_file(path: &Path) -> BunkResult<CsvImport> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BunkError::io(path, e))?;
    let import = import_csv(&content)?;
    info!(
        "Read timetable from {path:?}, {} rows skipped",
        import.skipped.len()
    );
    Ok(import)
}

pub async fn write_csv_file(path: &Path, timetable: &Timetable) -> BunkResult<()> {
    tokio::fs::write(path, export_csv(timetable))
        .await
        .map_err(|e| BunkError::io(path, e))?;
    info!("Exported timetable to {path:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{export_csv, import_csv, parse_csv_records, read_csv_file, write_csv_file};
    use crate::timetable::{Timetable, DAYS, TIME_SLOTS};

    #[test]
    fn record_parsing_handles_quotes() {
        let fields = |content: &str| {
            parse_csv_records(content)
                .into_iter()
                .map(|(_, record)| record)
                .collect::<Vec<_>>()
        };
        assert_eq!(fields("a,b,c"), vec![vec!["a", "b", "c"]]);
        assert_eq!(
            fields(r#"MONDAY,09:00-10:00,"Lab (B1&B3), ""east"" wing""#),
            vec![vec!["MONDAY", "09:00-10:00", r#"Lab (B1&B3), "east" wing"#]]
        );
        assert_eq!(fields("x,,\r\ny,z\n"), vec![vec!["x", "", ""], vec!["y", "z"]]);
    }

    #[test]
    fn quoted_line_breaks_stay_in_field() {
        let records = parse_csv_records("a,\"one\ntwo\"\nb,c\n");
        assert_eq!(records[0], (1, vec!["a".to_string(), "one\ntwo".to_string()]));
        assert_eq!(records[1], (3, vec!["b".to_string(), "c".to_string()]));
    }

    #[test]
    fn multiline_cell_survives_export_and_import() -> Result<()> {
        let mut timetable = Timetable::builtin();
        timetable.set_cell("WEDNESDAY", "10:00-11:00", "Physics\nLab");
        let import = import_csv(&export_csv(&timetable))?;
        assert!(import.skipped.is_empty(), "{:?}", import.skipped);
        assert_eq!(
            import.timetable.cell("WEDNESDAY", "10:00-11:00"),
            Some("Physics\nLab")
        );
        assert_eq!(import.timetable, timetable);
        Ok(())
    }

    #[test]
    fn export_lists_every_slot() {
        let csv = export_csv(&Timetable::builtin());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Day,Time,Subject"));
        assert_eq!(lines.next(), Some("MONDAY,09:00-10:00,Minor"));
        assert_eq!(csv.lines().count(), 1 + DAYS.len() * TIME_SLOTS.len());
    }

    #[test]
    fn export_then_import_keeps_timetable() -> Result<()> {
        let builtin = Timetable::builtin();
        let import = import_csv(&export_csv(&builtin))?;
        assert!(import.skipped.is_empty());
        assert_eq!(import.timetable, builtin);
        Ok(())
    }

    #[test]
    fn import_skips_unknown_rows() -> Result<()> {
        let csv = "Subject,Day,Time\n\
                   Physics,monday,09:00-10:00\n\
                   Chemistry,SUNDAY,09:00-10:00\n\
                   Biology,TUESDAY,07:00-08:00\n\
                   \n\
                   broken\n";
        let import = import_csv(csv)?;
        assert_eq!(import.timetable.cell("MONDAY", "09:00-10:00"), Some("Physics"));
        assert_eq!(import.timetable.cell("TUESDAY", "09:00-10:00"), Some(""));
        let lines = import.skipped.iter().map(|v| v.line).collect::<Vec<_>>();
        assert_eq!(lines, vec![3, 4, 6]);
        assert_eq!(import.skipped[0].reason, "invalid day: SUNDAY");
        Ok(())
    }

    #[test]
    fn import_requires_header() {
        let err = import_csv("Day,Subject\nMONDAY,Physics\n").unwrap_err();
        assert!(err.is_validation());
        assert!(import_csv("").unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn file_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("my_timetable.csv");
        write_csv_file(&path, &Timetable::builtin()).await?;
        let import = read_csv_file(&path).await?;
        assert_eq!(import.timetable, Timetable::builtin());

        let missing = read_csv_file(&dir.path().join("missing.csv")).await;
        assert!(matches!(missing, Err(crate::error::BunkError::Io { .. })));
        Ok(())
    }
}
