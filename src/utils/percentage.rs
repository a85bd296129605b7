use std::{fmt::Display, ops::Deref, str::FromStr};

use anyhow::anyhow;

/// Attendance threshold every subject is expected to stay at or above.
pub const DEFAULT_THRESHOLD: Percentage = Percentage(75.);

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Percentage {
    /// Accepts only values usable as a threshold, that is in (0, 100].
    pub fn threshold_opt(value: f64) -> Option<Percentage> {
        if value > 0. && value <= 100. {
            Some(Percentage(value))
        } else {
            None
        }
    }

    /// Falls back to [DEFAULT_THRESHOLD] for anything outside (0, 100].
    pub fn threshold_or_default(value: f64) -> Percentage {
        Self::threshold_opt(value).unwrap_or(DEFAULT_THRESHOLD)
    }

    pub fn as_fraction(&self) -> f64 {
        self.0 / 100.
    }
}

impl Default for Percentage {
    fn default() -> Self {
        DEFAULT_THRESHOLD
    }
}

impl FromStr for Percentage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // This means that 100%% also works, but I think I'm fine with that
        let s = s.trim_end_matches("%");
        let v = s.parse::<f64>()?;
        Percentage::threshold_opt(v).ok_or_else(|| anyhow!("{s} is not a percentage in (0, 100]"))
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
