use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::utils::time::parse_date;

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Accepts `2025-03-14` as well as phrases like "today", "yesterday", "last friday" or
/// "14/03/2025" (day/month order depends on `style`).
pub fn parse_user_date(value: &str, now: DateTime<Local>, style: DateStyle) -> Result<NaiveDate> {
    if let Some(date) = parse_date(value) {
        return Ok(date);
    }
    match parse_date_string(value, now, style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {value:?}: {e}"),
            )
            .into()),
    }
}

/// Like [parse_user_date] but a missing value means today.
pub fn parse_or_today(
    value: Option<&str>,
    now: DateTime<Local>,
    style: DateStyle,
) -> Result<NaiveDate> {
    match value {
        Some(value) => parse_user_date(value, now, style),
        None => Ok(now.date_naive()),
    }
}
