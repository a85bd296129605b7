use crate::{
    storage::entities::SubjectEntity,
    utils::percentage::Percentage,
};

use super::attendance::{attended_classes, percentage, safe_skip, total_classes, Status};

/// Where the numbers of a [SubjectSummary] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    /// Weekly count times elapsed weeks, minus recorded absences.
    Timetable,
    /// User supplied total, minus recorded absences.
    TotalOverride,
    /// User supplied attended and total.
    AttendanceOverride,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSummary {
    pub name: String,
    pub attended: u32,
    pub total: u32,
    pub percentage: f64,
    pub status: Status,
    pub safe_skip: u32,
    pub source: CountSource,
}

/// Applies override precedence: an attendance override replaces everything, a total override
/// replaces only the computed total.
pub fn compute_for_subject(
    subject: &SubjectEntity,
    weeks_elapsed: u32,
    threshold: Percentage,
) -> SubjectSummary {
    let (attended, total, source) = match (subject.attendance_override, subject.total_override) {
        (Some(manual), _) => (manual.attended, manual.total, CountSource::AttendanceOverride),
        (None, total_override) => {
            let (total, source) = match total_override {
                Some(total) => (total, CountSource::TotalOverride),
                None => (
                    total_classes(subject.weekly_count, weeks_elapsed),
                    CountSource::Timetable,
                ),
            };
            (
                attended_classes(total, subject.absent_dates.len()),
                total,
                source,
            )
        }
    };

    let percentage = percentage(attended, total);
    SubjectSummary {
        name: subject.name.clone(),
        attended,
        total,
        percentage,
        status: Status::of(percentage),
        safe_skip: safe_skip(attended.into(), total.into(), *threshold),
        source,
    }
}

/// Aggregate figures shown above the per-subject table.
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub subjects: Vec<SubjectSummary>,
    pub average_percentage: f64,
    pub safe_count: usize,
    pub at_risk_count: usize,
}

impl Overview {
    pub fn from_subjects(subjects: Vec<SubjectSummary>) -> Self {
        let safe_count = subjects.iter().filter(|v| v.status.is_safe()).count();
        let average_percentage = if subjects.is_empty() {
            0.
        } else {
            subjects.iter().map(|v| v.percentage).sum::<f64>() / subjects.len() as f64
        };
        Self {
            at_risk_count: subjects.len() - safe_count,
            safe_count,
            average_percentage,
            subjects,
        }
    }
}
