use std::fmt::Display;

use crate::utils::percentage::Percentage;

/// Percentage at which a subject stops being at risk. Independent of the safe-skip threshold.
pub const STATUS_THRESHOLD: f64 = 75.;

/// Absorbs float error so that exact boundaries (e.g. 3 of 4 at 75%) are not floored away.
const SKIP_EPSILON: f64 = 1e-9;

pub fn total_classes(weekly_count: u32, weeks_elapsed: u32) -> u32 {
    weekly_count.saturating_mul(weeks_elapsed)
}

pub fn attended_classes(total: u32, absences: usize) -> u32 {
    let absences = u32::try_from(absences).unwrap_or(u32::MAX);
    total.saturating_sub(absences)
}

/// `100 * attended / total`, or 0 when nothing was held yet.
pub fn percentage(attended: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.;
    }
    attended as f64 / total as f64 * 100.
}

/// Number of further classes that can be missed while `attended / (total + x)` stays at or above
/// `threshold` percent. Thresholds outside (0, 100] are replaced with the default 75.
pub fn safe_skip(attended: i64, total: i64, threshold: f64) -> u32 {
    if total <= 0 || attended < 0 {
        return 0;
    }
    let fraction = Percentage::threshold_or_default(threshold).as_fraction();
    let skips = ((attended as f64 - fraction * total as f64) / fraction + SKIP_EPSILON).floor();
    if skips <= 0. {
        0
    } else {
        skips.min(u32::MAX as f64) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Safe,
    AtRisk,
}

impl Status {
    pub fn of(percentage: f64) -> Self {
        if percentage >= STATUS_THRESHOLD {
            Status::Safe
        } else {
            Status::AtRisk
        }
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, Status::Safe)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Safe => write!(f, "Safe"),
            Status::AtRisk => write!(f, "At Risk"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{attended_classes, percentage, safe_skip, total_classes, Status};

    #[test]
    fn worked_example() {
        let total = total_classes(4, 10);
        assert_eq!(total, 40);
        let attended = attended_classes(total, 5);
        assert_eq!(attended, 35);
        let pct = percentage(attended, total);
        assert_eq!(pct, 87.5);
        assert_eq!(Status::of(pct), Status::Safe);
        assert_eq!(safe_skip(35, 40, 75.), 6);
    }

    #[test]
    fn nothing_held_yet() {
        assert_eq!(percentage(0, 0), 0.);
        assert_eq!(percentage(12, 0), 0.);
        assert_eq!(safe_skip(0, 0, 75.), 0);
        assert_eq!(Status::of(0.).to_string(), "At Risk");
    }

    #[test]
    fn attended_never_negative() {
        assert_eq!(attended_classes(3, 10), 0);
        assert_eq!(attended_classes(0, 0), 0);
    }

    #[test]
    fn percentage_within_bounds() {
        for total in 1..40 {
            for attended in 0..=total {
                let pct = percentage(attended, total);
                assert!((0. ..=100.).contains(&pct), "{attended}/{total}");
            }
        }
    }

    #[test]
    fn skip_boundaries() {
        assert_eq!(safe_skip(3, 4, 75.), 0);
        assert_eq!(safe_skip(4, 4, 75.), 1);
        assert_eq!(safe_skip(80, 100, 75.), 6);
        assert_eq!(safe_skip(10, 20, 75.), 0);
        assert_eq!(safe_skip(8, 10, 80.), 0);
        assert_eq!(safe_skip(9, 10, 60.), 5);
    }

    #[test]
    fn skip_tolerates_bad_input() {
        assert_eq!(safe_skip(-1, 10, 75.), 0);
        assert_eq!(safe_skip(5, -10, 75.), 0);
        assert_eq!(safe_skip(35, 40, 0.), safe_skip(35, 40, 75.));
        assert_eq!(safe_skip(35, 40, 150.), safe_skip(35, 40, 75.));
        assert_eq!(safe_skip(40, 40, 100.), 0);
    }

    #[test]
    fn skip_is_monotonic() {
        for total in 1..30i64 {
            for attended in 0..=total {
                let current = safe_skip(attended, total, 75.);
                if attended < total {
                    assert!(safe_skip(attended + 1, total, 75.) >= current);
                }
                assert!(safe_skip(attended, total + 1, 75.) <= current);
            }
        }
    }

    #[test]
    fn status_threshold_is_fixed() {
        assert_eq!(Status::of(75.), Status::Safe);
        assert_eq!(Status::of(74.99), Status::AtRisk);
        assert!(Status::of(100.).is_safe());
    }
}
