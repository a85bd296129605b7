use chrono::NaiveDate;

/// Inclusive range of days without classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolidayPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl HolidayPeriod {
    pub fn new_opt(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

pub fn is_holiday(date: NaiveDate, holidays: &[HolidayPeriod]) -> bool {
    holidays.iter().any(|h| h.contains(date))
}

/// Last day that counts towards elapsed time: today, or the semester end once it has passed.
pub fn effective_end(today: NaiveDate, semester_end: Option<NaiveDate>) -> NaiveDate {
    match semester_end {
        Some(end) if end < today => end,
        _ => today,
    }
}

/// Complete weeks of teaching between `start` and `end`, both inclusive. Holiday days are removed
/// before dividing by seven, and a partial trailing week is dropped.
pub fn weeks_elapsed(start: NaiveDate, end: NaiveDate, holidays: &[HolidayPeriod]) -> u32 {
    if end < start {
        return 0;
    }
    let teaching_days = start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !is_holiday(*day, holidays))
        .count();
    (teaching_days / 7) as u32
}
