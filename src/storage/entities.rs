use std::{collections::BTreeSet, fmt::Display};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    calc::elapsed::HolidayPeriod,
    utils::time::{format_date, parse_date},
};

/// The entire persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub semester_start: Option<NaiveDate>,
    #[serde(default)]
    pub semester_end: Option<NaiveDate>,
    #[serde(default)]
    pub holidays: Vec<HolidayEntity>,
    #[serde(default)]
    pub subjects: Vec<SubjectEntity>,
}

impl AppState {
    pub fn subject(&self, name: &str) -> Option<&SubjectEntity> {
        self.subjects.iter().find(|v| v.name == name)
    }

    pub fn subject_mut(&mut self, name: &str) -> Option<&mut SubjectEntity> {
        self.subjects.iter_mut().find(|v| v.name == name)
    }

    /// Holidays usable in calculations. Entries with unreadable or inverted dates are left out.
    pub fn holiday_periods(&self) -> Vec<HolidayPeriod> {
        self.holidays.iter().filter_map(HolidayEntity::period).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectEntity {
    pub name: String,
    pub weekly_count: u32,
    #[serde(default)]
    pub total_override: Option<u32>,
    #[serde(default)]
    pub attendance_override: Option<AttendanceOverride>,
    #[serde(default)]
    pub absent_dates: BTreeSet<NaiveDate>,
}

impl SubjectEntity {
    pub fn new(name: impl Into<String>, weekly_count: u32) -> Self {
        Self {
            name: name.into(),
            weekly_count,
            total_override: None,
            attendance_override: None,
            absent_dates: BTreeSet::new(),
        }
    }
}

/// Manually entered attendance. Wins over everything computed for the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceOverride {
    pub attended: u32,
    pub total: u32,
}

/// Holiday as stored. Dates that fail to parse are kept verbatim instead of failing the whole
/// document, so saving writes them back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntity {
    #[serde(default)]
    pub start: Option<StoredDate>,
    #[serde(default)]
    pub end: Option<StoredDate>,
}

impl HolidayEntity {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(StoredDate::Date(start)),
            end: Some(StoredDate::Date(end)),
        }
    }

    pub fn period(&self) -> Option<HolidayPeriod> {
        let start = self.start.as_ref()?.date()?;
        let end = self.end.as_ref()?.date()?;
        HolidayPeriod::new_opt(start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StoredDate {
    Date(NaiveDate),
    Unreadable(serde_json::Value),
}

impl StoredDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            StoredDate::Date(date) => Some(*date),
            StoredDate::Unreadable(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for StoredDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .and_then(parse_date)
            .map(StoredDate::Date)
            .unwrap_or(StoredDate::Unreadable(value)))
    }
}

impl Display for StoredDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoredDate::Date(date) => write!(f, "{}", format_date(*date)),
            StoredDate::Unreadable(serde_json::Value::String(raw)) => write!(f, "{raw}"),
            StoredDate::Unreadable(raw) => write!(f, "{raw}"),
        }
    }
}
