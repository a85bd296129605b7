use chrono::{NaiveDate, NaiveDateTime};

/// Format used for every date stored in the attendance document.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Name used for exported report files, e.g. `attendance_report_20250314_093000.txt`.
pub fn report_file_name(moment: NaiveDateTime) -> String {
    format!("attendance_report_{}.txt", moment.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{format_date, parse_date, report_file_name};

    #[test]
    fn date_format_matches_document() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(format_date(date), "2025-01-06");
        assert_eq!(parse_date(" 2025-01-06 "), Some(date));
        assert_eq!(parse_date("06/01/2025"), None);
    }

    #[test]
    fn report_name_is_timestamped() {
        let moment = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        assert_eq!(
            report_file_name(moment),
            "attendance_report_20250314_093005.txt"
        );
    }
}
