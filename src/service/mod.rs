//! [AttendanceService] owns the in-memory document and is the only thing that mutates it.
//!
//! Every mutating operation validates its input against a copy of the current state, persists the
//! copy and only then replaces the state. A failed save therefore leaves the previous state in
//! place.

use chrono::{Datelike, NaiveDate};
use tracing::{info, instrument, warn};

use crate::{
    calc::{
        elapsed::{effective_end, weeks_elapsed},
        summary::{compute_for_subject, Overview, SubjectSummary},
    },
    error::{BunkError, BunkResult},
    storage::{
        document_storage::DocumentStorage,
        entities::{AppState, AttendanceOverride, HolidayEntity, SubjectEntity},
    },
    timetable::{
        extract::{subjects_for_day, weekly_counts},
        Timetable, DAYS,
    },
    utils::{clock::Clock, percentage::Percentage},
};

/// How the document was obtained when the service was opened.
#[derive(Debug)]
pub enum LoadStatus {
    Loaded,
    FirstRun,
    /// The stored document could not be used. The service starts empty as on first run.
    Recovered(BunkError),
}

pub struct AttendanceService<S, C> {
    storage: S,
    clock: C,
    timetable: Timetable,
    state: AppState,
}

impl<S: DocumentStorage, C: Clock> AttendanceService<S, C> {
    pub async fn open(storage: S, clock: C, timetable: Timetable) -> (Self, LoadStatus) {
        let (state, status) = match storage.load().await {
            Ok(Some(state)) => (state, LoadStatus::Loaded),
            Ok(None) => (AppState::default(), LoadStatus::FirstRun),
            Err(e) => {
                warn!("Starting without prior data: {e}");
                (AppState::default(), LoadStatus::Recovered(e))
            }
        };
        let service = Self {
            storage,
            clock,
            timetable,
            state,
        };
        (service, status)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn timetable(&self) -> &Timetable {
        &self.timetable
    }

    /// Setup is complete once a batch and the semester start are known.
    pub fn is_configured(&self) -> bool {
        self.state.batch.is_some() && self.state.semester_start.is_some()
    }

    async fn commit(&mut self, next: AppState) -> BunkResult<()> {
        self.storage.save(&next).await?;
        self.state = next;
        Ok(())
    }

    fn require_subject<'a>(
        state: &'a mut AppState,
        name: &str,
    ) -> BunkResult<&'a mut SubjectEntity> {
        state
            .subject_mut(name)
            .ok_or_else(|| BunkError::validation(format!("Unknown subject: {name}")))
    }

    fn require_batch(&self) -> BunkResult<&str> {
        self.state
            .batch
            .as_deref()
            .ok_or_else(|| BunkError::validation("No batch selected, run setup first"))
    }

    /// Selects a batch and rebuilds the subject list from the timetable. Absences and overrides
    /// of the previous subject list are discarded.
    #[instrument(skip(self))]
    pub async fn setup(&mut self, batch: &str) -> BunkResult<&[SubjectEntity]> {
        let batch = batch.trim();
        if batch.is_empty() {
            return Err(BunkError::validation("Please select a batch"));
        }
        let counts = weekly_counts(&self.timetable, batch);
        if counts.is_empty() {
            return Err(BunkError::validation(format!(
                "No subjects found for batch '{batch}'"
            )));
        }

        let mut next = self.state.clone();
        next.batch = Some(batch.to_string());
        next.subjects = counts
            .iter()
            .map(|(name, count)| SubjectEntity::new(name, count))
            .collect();
        self.commit(next).await?;
        info!("Configured batch {batch} with {} subjects", counts.len());
        Ok(&self.state.subjects)
    }

    pub async fn set_semester(
        &mut self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> BunkResult<()> {
        if let Some(end) = end {
            if end < start {
                return Err(BunkError::validation(format!(
                    "Semester end {end} is before its start {start}"
                )));
            }
        }
        let mut next = self.state.clone();
        next.semester_start = Some(start);
        next.semester_end = end;
        self.commit(next).await?;
        info!("Semester set to {start} - {end:?}");
        Ok(())
    }

    pub async fn add_holiday(&mut self, start: NaiveDate, end: NaiveDate) -> BunkResult<()> {
        if end < start {
            return Err(BunkError::validation(format!(
                "Holiday end {end} is before its start {start}"
            )));
        }
        let mut next = self.state.clone();
        next.holidays.push(HolidayEntity::new(start, end));
        self.commit(next).await?;
        info!("Added holiday {start} - {end}");
        Ok(())
    }

    /// Removes the holiday at `index` (as listed by [AppState::holidays]).
    pub async fn remove_holiday(&mut self, index: usize) -> BunkResult<HolidayEntity> {
        if index >= self.state.holidays.len() {
            return Err(BunkError::validation(format!("No holiday number {index}")));
        }
        let mut next = self.state.clone();
        let removed = next.holidays.remove(index);
        self.commit(next).await?;
        Ok(removed)
    }

    /// Records an absence. Returns false if the date was already recorded.
    pub async fn mark_absent(&mut self, subject: &str, date: NaiveDate) -> BunkResult<bool> {
        let mut next = self.state.clone();
        let inserted = Self::require_subject(&mut next, subject)?
            .absent_dates
            .insert(date);
        if inserted {
            self.commit(next).await?;
            info!("Marked {subject} absent on {date}");
        }
        Ok(inserted)
    }

    /// Removes an absence. Returns false if there was none on that date.
    pub async fn mark_present(&mut self, subject: &str, date: NaiveDate) -> BunkResult<bool> {
        let mut next = self.state.clone();
        let removed = Self::require_subject(&mut next, subject)?
            .absent_dates
            .remove(&date);
        if removed {
            self.commit(next).await?;
            info!("Marked {subject} present on {date}");
        }
        Ok(removed)
    }

    /// Subjects the selected batch has on the weekday of `date`.
    pub fn subjects_on(&self, date: NaiveDate) -> BunkResult<Vec<String>> {
        let batch = self.require_batch()?;
        let Some(day) = DAYS.get(date.weekday().num_days_from_monday() as usize) else {
            return Ok(vec![]);
        };
        Ok(subjects_for_day(&self.timetable, day, batch))
    }

    /// Marks every subject held on `date` absent. Returns the subjects that were newly marked.
    /// Fails without marking anything when the timetable names a subject the document lacks.
    pub async fn mark_day_absent(&mut self, date: NaiveDate) -> BunkResult<Vec<String>> {
        let scheduled = self.subjects_on(date)?;
        if scheduled.is_empty() {
            return Err(BunkError::validation(format!("No classes on {date}")));
        }
        let unknown = scheduled
            .iter()
            .filter(|name| self.state.subject(name).is_none())
            .cloned()
            .collect::<Vec<_>>();
        if !unknown.is_empty() {
            return Err(BunkError::validation(format!(
                "Unknown subjects on {date}: {}. Run setup again to rebuild the subject list",
                unknown.join(", ")
            )));
        }

        let mut next = self.state.clone();
        let mut marked = Vec::new();
        for name in scheduled {
            if Self::require_subject(&mut next, &name)?.absent_dates.insert(date) {
                marked.push(name);
            }
        }
        if !marked.is_empty() {
            self.commit(next).await?;
            info!("Marked {} subjects absent on {date}", marked.len());
        }
        Ok(marked)
    }

    pub async fn set_total_override(
        &mut self,
        subject: &str,
        total: Option<i64>,
    ) -> BunkResult<()> {
        let total = total.map(non_negative).transpose()?;
        let mut next = self.state.clone();
        Self::require_subject(&mut next, subject)?.total_override = total;
        self.commit(next).await?;
        info!("Total override for {subject} set to {total:?}");
        Ok(())
    }

    pub async fn set_attendance_override(
        &mut self,
        subject: &str,
        attended: i64,
        total: i64,
    ) -> BunkResult<()> {
        let attended = non_negative(attended)?;
        let total = non_negative(total)?;
        if attended > total {
            return Err(BunkError::validation(
                "Attended cannot be greater than total",
            ));
        }
        let mut next = self.state.clone();
        Self::require_subject(&mut next, subject)?.attendance_override =
            Some(AttendanceOverride { attended, total });
        self.commit(next).await?;
        info!("Attendance override for {subject} set to {attended}/{total}");
        Ok(())
    }

    /// Returns false if the subject had no attendance override.
    pub async fn clear_attendance_override(&mut self, subject: &str) -> BunkResult<bool> {
        let mut next = self.state.clone();
        let cleared = Self::require_subject(&mut next, subject)?
            .attendance_override
            .take()
            .is_some();
        if cleared {
            self.commit(next).await?;
            info!("Cleared attendance override for {subject}");
        }
        Ok(cleared)
    }

    /// Complete teaching weeks from the semester start until today (or the semester end).
    pub fn weeks_elapsed(&self) -> u32 {
        let Some(start) = self.state.semester_start else {
            return 0;
        };
        let end = effective_end(self.clock.today(), self.state.semester_end);
        weeks_elapsed(start, end, &self.state.holiday_periods())
    }

    pub fn compute_for_subject(
        &self,
        subject: &str,
        threshold: Percentage,
    ) -> BunkResult<SubjectSummary> {
        let entity = self
            .state
            .subject(subject)
            .ok_or_else(|| BunkError::validation(format!("Unknown subject: {subject}")))?;
        Ok(compute_for_subject(entity, self.weeks_elapsed(), threshold))
    }

    pub fn overview(&self, threshold: Percentage) -> Overview {
        let weeks = self.weeks_elapsed();
        Overview::from_subjects(
            self.state
                .subjects
                .iter()
                .map(|subject| compute_for_subject(subject, weeks, threshold))
                .collect(),
        )
    }
}

fn non_negative(value: i64) -> BunkResult<u32> {
    u32::try_from(value)
        .map_err(|_| BunkError::validation(format!("Values must be non-negative, got {value}")))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveTime};
    use tempfile::{tempdir, TempDir};

    use super::{AttendanceService, LoadStatus};
    use crate::{
        calc::{attendance::Status, summary::CountSource},
        error::BunkError,
        storage::document_storage::{DocumentStorage, JsonDocumentStorage},
        timetable::Timetable,
        utils::{
            clock::{FixedClock, MockClock},
            logging::TEST_LOGGING,
            percentage::DEFAULT_THRESHOLD,
        },
    };

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn clock_at(today: NaiveDate) -> FixedClock {
        FixedClock(today.and_time(NaiveTime::MIN))
    }

    async fn open_at(
        dir: &TempDir,
        today: NaiveDate,
    ) -> (
        AttendanceService<JsonDocumentStorage, FixedClock>,
        LoadStatus,
    ) {
        AttendanceService::open(
            JsonDocumentStorage::in_dir(dir.path()),
            clock_at(today),
            Timetable::builtin(),
        )
        .await
    }

    #[tokio::test]
    async fn first_run_then_reload() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let (mut service, status) = open_at(&dir, date(3, 17)).await;
        assert!(matches!(status, LoadStatus::FirstRun));
        assert!(!service.is_configured());

        let subjects = service.setup("B1/B3").await?;
        assert_eq!(subjects.len(), 10);
        service.set_semester(date(1, 6), Some(date(4, 30))).await?;
        assert!(service.is_configured());

        let (reloaded, status) = open_at(&dir, date(3, 17)).await;
        assert!(matches!(status, LoadStatus::Loaded));
        assert_eq!(reloaded.state(), service.state());
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_document_starts_fresh() -> Result<()> {
        let dir = tempdir()?;
        tokio::fs::write(dir.path().join("data.json"), "[1, 2").await?;
        let (service, status) = open_at(&dir, date(3, 17)).await;
        assert!(matches!(status, LoadStatus::Recovered(BunkError::Parse { .. })));
        assert_eq!(service.state().subjects.len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn setup_rejects_empty_batch() -> Result<()> {
        let dir = tempdir()?;
        let (mut service, _) = AttendanceService::open(
            JsonDocumentStorage::in_dir(dir.path()),
            clock_at(date(3, 17)),
            Timetable::blank(),
        )
        .await;
        let err = service.setup("B1/B3").await.unwrap_err();
        assert!(err.is_validation());
        assert!(service.state().batch.is_none());
        assert!(service.setup("  ").await.unwrap_err().is_validation());
        Ok(())
    }

    #[tokio::test]
    async fn absences_reduce_attendance() -> Result<()> {
        let dir = tempdir()?;
        // Ten complete weeks after 2025-01-06
        let (mut service, _) = open_at(&dir, date(3, 16)).await;
        service.setup("B1/B3").await?;
        service.set_semester(date(1, 6), None).await?;
        assert_eq!(service.weeks_elapsed(), 10);

        assert!(service.mark_absent("DAA", date(1, 6)).await?);
        assert!(!service.mark_absent("DAA", date(1, 6)).await?);
        service.mark_absent("DAA", date(1, 7)).await?;

        let daa = service.compute_for_subject("DAA", DEFAULT_THRESHOLD)?;
        assert_eq!((daa.attended, daa.total), (28, 30));
        assert_eq!(daa.status, Status::Safe);

        assert!(service.mark_present("DAA", date(1, 7)).await?);
        assert!(!service.mark_present("DAA", date(1, 7)).await?);
        let daa = service.compute_for_subject("DAA", DEFAULT_THRESHOLD)?;
        assert_eq!(daa.attended, 29);

        let err = service.mark_absent("Astrology", date(1, 6)).await.unwrap_err();
        assert!(err.is_validation());
        Ok(())
    }

    #[tokio::test]
    async fn whole_day_absence_follows_batch() -> Result<()> {
        let dir = tempdir()?;
        let (mut service, _) = open_at(&dir, date(3, 16)).await;
        assert!(service.mark_day_absent(date(1, 8)).await.is_err());

        service.setup("B2/B4").await?;
        // 2025-01-08 is a Wednesday
        let marked = service.mark_day_absent(date(1, 8)).await?;
        assert_eq!(marked, vec!["DM", "DAA", "DAA Lab"]);
        assert!(service.mark_day_absent(date(1, 8)).await?.is_empty());

        // 2025-01-12 is a Sunday
        assert!(service.mark_day_absent(date(1, 12)).await.unwrap_err().is_validation());
        Ok(())
    }

    #[tokio::test]
    async fn whole_day_absence_rejects_subjects_missing_from_document() -> Result<()> {
        let dir = tempdir()?;
        let (mut service, _) = open_at(&dir, date(3, 16)).await;
        service.setup("B1/B3").await?;

        // Timetable replaced without running setup again
        let mut timetable = Timetable::builtin();
        timetable.set_cell("WEDNESDAY", "09:00-10:00", "Physics");
        let (mut service, _) = AttendanceService::open(
            JsonDocumentStorage::in_dir(dir.path()),
            clock_at(date(3, 16)),
            timetable,
        )
        .await;
        let before = service.state().clone();

        assert!(service.mark_absent("Physics", date(1, 8)).await.unwrap_err().is_validation());
        let err = service.mark_day_absent(date(1, 8)).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Physics"), "{err}");
        assert_eq!(service.state(), &before);
        Ok(())
    }

    #[tokio::test]
    async fn overrides() -> Result<()> {
        let dir = tempdir()?;
        let (mut service, _) = open_at(&dir, date(3, 16)).await;
        service.setup("B1/B3").await?;
        service.set_semester(date(1, 6), None).await?;

        service.set_total_override("CN", Some(25)).await?;
        let cn = service.compute_for_subject("CN", DEFAULT_THRESHOLD)?;
        assert_eq!((cn.total, cn.source), (25, CountSource::TotalOverride));

        service.set_attendance_override("CN", 10, 20).await?;
        let cn = service.compute_for_subject("CN", DEFAULT_THRESHOLD)?;
        assert_eq!(cn.percentage, 50.);
        assert_eq!(cn.source, CountSource::AttendanceOverride);

        let before = service.state().clone();
        assert!(service.set_attendance_override("CN", 21, 20).await.unwrap_err().is_validation());
        assert!(service.set_attendance_override("CN", -1, 20).await.unwrap_err().is_validation());
        assert!(service.set_total_override("CN", Some(-3)).await.unwrap_err().is_validation());
        assert_eq!(service.state(), &before);

        assert!(service.clear_attendance_override("CN").await?);
        assert!(!service.clear_attendance_override("CN").await?);
        service.set_total_override("CN", None).await?;
        let cn = service.compute_for_subject("CN", DEFAULT_THRESHOLD)?;
        assert_eq!((cn.total, cn.source), (30, CountSource::Timetable));
        Ok(())
    }

    #[tokio::test]
    async fn semester_and_holidays() -> Result<()> {
        let dir = tempdir()?;
        let (mut service, _) = open_at(&dir, date(6, 1)).await;
        assert_eq!(service.weeks_elapsed(), 0);

        let err = service.set_semester(date(2, 1), Some(date(1, 1))).await.unwrap_err();
        assert!(err.is_validation());

        // Today is past the end, so counting stops at 2025-03-16
        service.set_semester(date(1, 6), Some(date(3, 16))).await?;
        assert_eq!(service.weeks_elapsed(), 10);

        service.add_holiday(date(1, 13), date(1, 19)).await?;
        assert_eq!(service.weeks_elapsed(), 9);
        assert!(service.add_holiday(date(2, 5), date(2, 1)).await.unwrap_err().is_validation());

        let removed = service.remove_holiday(0).await?;
        assert_eq!(removed.period().map(|v| v.start()), Some(date(1, 13)));
        assert_eq!(service.weeks_elapsed(), 10);
        assert!(service.remove_holiday(0).await.unwrap_err().is_validation());
        Ok(())
    }

    #[tokio::test]
    async fn failed_save_keeps_state() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonDocumentStorage::new(dir.path().join("gone").join("data.json"));
        let (mut service, _) =
            AttendanceService::open(&storage, clock_at(date(3, 16)), Timetable::builtin()).await;
        let err = service.setup("B1/B3").await.unwrap_err();
        assert!(matches!(err, BunkError::Io { .. }));
        assert!(service.state().batch.is_none());
        assert_eq!(storage.load().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn elapsed_time_uses_clock() -> Result<()> {
        let dir = tempdir()?;
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .returning(|| date(1, 19).and_time(NaiveTime::MIN));
        clock.expect_today().returning(|| date(1, 19));
        let (mut service, _) = AttendanceService::open(
            JsonDocumentStorage::in_dir(dir.path()),
            clock,
            Timetable::builtin(),
        )
        .await;
        service.set_semester(date(1, 6), None).await?;
        assert_eq!(service.weeks_elapsed(), 2);
        Ok(())
    }
}
