//! Périodes calendaires (jour / semaine / mois) et normalisation des intervalles.
//!
//! Tout est en UTC ; une semaine commence le lundi (ISO 8601).

use crate::model::{InvalidTimeRange, TimeRange};
use chrono::{
    DateTime, Datelike, Duration, DurationRound, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Day,
    #[default]
    Week,
    Month,
}

impl FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "jour" => Ok(PeriodKind::Day),
            "week" | "semaine" => Ok(PeriodKind::Week),
            "month" | "mois" => Ok(PeriodKind::Month),
            other => Err(format!("unknown period kind: {other}")),
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKind::Day => f.write_str("day"),
            PeriodKind::Week => f.write_str("week"),
            PeriodKind::Month => f.write_str("month"),
        }
    }
}

/// Période d'un roster, alignée sur sa granularité.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub kind: PeriodKind,
    pub range: TimeRange,
}

impl Period {
    /// Période de granularité `kind` contenant `date`.
    pub fn containing(kind: PeriodKind, date: NaiveDate) -> Self {
        let (first, next) = match kind {
            PeriodKind::Day => (date, date + Duration::days(1)),
            PeriodKind::Week => {
                let monday =
                    date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                (monday, monday + Duration::days(7))
            }
            PeriodKind::Month => {
                let first = date.with_day(1).unwrap_or(date);
                (first, first_of_next_month(first))
            }
        };
        let range = TimeRange::new(midnight(first), midnight(next))
            .expect("aligned period is never empty");
        Self { kind, range }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::containing(PeriodKind::Day, date)
    }
    pub fn week(date: NaiveDate) -> Self {
        Self::containing(PeriodKind::Week, date)
    }
    pub fn month(date: NaiveDate) -> Self {
        Self::containing(PeriodKind::Month, date)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.range.start().date_naive()
    }

    pub fn last_day(&self) -> NaiveDate {
        (self.range.end() - Duration::days(1)).date_naive()
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.range.days()
    }

    pub fn len_days(&self) -> i64 {
        self.range.duration().num_days()
    }

    /// Nombre de semaines entamées (1 pour un jour ou une semaine, 4 ou 5 pour un mois).
    pub fn weeks_spanned(&self) -> i64 {
        (self.len_days() + 6) / 7
    }

    pub fn contains(&self, range: &TimeRange) -> bool {
        self.range.contains(range)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} — {}", self.kind, self.first_day(), self.last_day())
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn first_of_next_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first + Duration::days(31))
}

/// Construit un intervalle à partir d'une date et d'heures locales (UTC).
/// Une fin inférieure ou égale au début désigne le lendemain (shift de nuit).
pub fn shift_range(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> TimeRange {
    let start_dt = Utc.from_utc_datetime(&NaiveDateTime::new(date, start));
    let mut end_date = date;
    if end <= start {
        end_date += Duration::days(1);
    }
    let end_dt = Utc.from_utc_datetime(&NaiveDateTime::new(end_date, end));
    TimeRange::new(start_dt, end_dt).expect("end is always after start here")
}

/// Tronque les deux bornes à la minute.
pub fn normalize(range: &TimeRange) -> Result<TimeRange, InvalidTimeRange> {
    let minute = Duration::minutes(1);
    let start = range.start().duration_trunc(minute).map_err(|_| InvalidTimeRange)?;
    let end = range.end().duration_trunc(minute).map_err(|_| InvalidTimeRange)?;
    TimeRange::new(start, end)
}
