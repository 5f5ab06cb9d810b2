use crate::model::{Employee, EmployeeId, ShiftId, TimeRange};
use chrono::{Duration, NaiveDate};
use thiserror::Error;

/// Contexte d'une validation : période du roster, plafond, employé concerné.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub period: &'a TimeRange,
    pub hour_cap: Duration,
    pub employee: &'a Employee,
}

/// Violation détectée pour un shift candidat, par ordre de priorité.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("overlaps shift {conflicting}")]
    Overlap { conflicting: ShiftId },
    #[error("hour cap exceeded for {employee} by {} min", minutes(.excess))]
    HourCapExceeded {
        employee: EmployeeId,
        excess: Duration,
    },
    #[error("range {range} is outside roster period {period}")]
    OutOfPeriod { range: TimeRange, period: TimeRange },
    #[error("{employee} is unavailable on {date}")]
    Unavailable { employee: EmployeeId, date: NaiveDate },
}

impl ConflictKind {
    /// Libellé court, stable, pour rapports CSV.
    pub fn code(&self) -> &'static str {
        match self {
            ConflictKind::Overlap { .. } => "overlap",
            ConflictKind::HourCapExceeded { .. } => "hour_cap",
            ConflictKind::OutOfPeriod { .. } => "out_of_period",
            ConflictKind::Unavailable { .. } => "unavailable",
        }
    }
}

fn minutes(d: &Duration) -> i64 {
    d.num_minutes()
}
