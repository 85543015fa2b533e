//! Institute-level reporting
//!
//! Read-only rollups over screening results and bookings. Nothing here
//! writes to storage.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Booking, BookingStatus, ScreeningResult};
use crate::screening::MAX_SCORE;
use crate::storage::{BookingRepository, ScreeningRepository};

/// Derived metrics for one student population and one date range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstituteRollup {
    pub total_students: usize,
    /// Distinct students with at least one screening
    pub screened_students: usize,
    /// Screened students as a percentage of the population
    pub participation_rate: u32,
    /// Confirmed bookings in the period as a percentage of the population
    pub utilization_rate: u32,
    /// `100 - mean(score) / 27 * 100`, 0 when there are no screenings
    pub average_wellness: u32,
    /// Screenings scoring above the moderate band
    pub high_risk_count: usize,
    pub total_screenings: usize,
    pub confirmed_sessions: usize,
    pub completed_sessions: usize,
}

/// Computes rollups from any store that can list bookings and screenings
pub struct AnalyticsAggregator<'a, R> {
    repo: &'a R,
}

impl<'a, R> AnalyticsAggregator<'a, R>
where
    R: BookingRepository + ScreeningRepository,
{
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Roll up the population's screenings and its bookings dated within
    /// `from..=to`
    #[instrument(skip(self, population), fields(students = population.len()))]
    pub fn rollup(
        &self,
        population: &[Uuid],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<InstituteRollup> {
        if from > to {
            return Err(Error::Validation(format!(
                "report period starts {} after it ends {}",
                from, to
            )));
        }
        let screenings = self.repo.list_all_screenings()?;
        let bookings = self.repo.list_bookings_between(from, to)?;
        Ok(compute(population, &screenings, &bookings))
    }
}

/// Pure rollup over already loaded records
///
/// Records for students outside `population` are ignored.
pub fn compute(
    population: &[Uuid],
    screenings: &[ScreeningResult],
    bookings: &[Booking],
) -> InstituteRollup {
    let students: HashSet<Uuid> = population.iter().copied().collect();
    let total_students = students.len();
    if total_students == 0 {
        return InstituteRollup::default();
    }

    let screenings: Vec<&ScreeningResult> = screenings
        .iter()
        .filter(|s| students.contains(&s.student_id))
        .collect();
    let bookings: Vec<&Booking> = bookings
        .iter()
        .filter(|b| students.contains(&b.student_id))
        .collect();

    let screened_students = screenings
        .iter()
        .map(|s| s.student_id)
        .collect::<HashSet<_>>()
        .len();
    let confirmed_sessions = count_status(&bookings, BookingStatus::Confirmed);
    let completed_sessions = count_status(&bookings, BookingStatus::Completed);

    InstituteRollup {
        total_students,
        screened_students,
        participation_rate: percentage(screened_students, total_students),
        utilization_rate: percentage(confirmed_sessions, total_students),
        average_wellness: average_wellness(&screenings),
        high_risk_count: screenings.iter().filter(|s| s.is_high_risk()).count(),
        total_screenings: screenings.len(),
        confirmed_sessions,
        completed_sessions,
    }
}

fn count_status(bookings: &[&Booking], status: BookingStatus) -> usize {
    bookings.iter().filter(|b| b.status == status).count()
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

fn average_wellness(screenings: &[&ScreeningResult]) -> u32 {
    if screenings.is_empty() {
        return 0;
    }
    let total: u64 = screenings.iter().map(|s| u64::from(s.score)).sum();
    let mean = total as f64 / screenings.len() as f64;
    (100.0 - mean / f64::from(MAX_SCORE) * 100.0).round() as u32
}
