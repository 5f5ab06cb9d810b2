use crate::period::Period;
use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Identifiant fort pour Employee
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiant fort pour Shift
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShiftId(String);

impl ShiftId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiant fort pour Roster
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RosterId(String);

impl RosterId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RosterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Employé, tel que vu depuis le registre externe (lecture seule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Plafond hebdomadaire en heures ; `None` = valeur par défaut des options.
    #[serde(default)]
    pub weekly_hours: Option<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blackout_dates: Vec<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_days: Vec<Weekday>,
}

fn default_active() -> bool {
    true
}

impl Employee {
    pub fn new<I: AsRef<str>, D: Into<String>>(id: I, display_name: D) -> Self {
        Self {
            id: EmployeeId::new(id),
            display_name: display_name.into(),
            email: String::new(),
            phone: None,
            weekly_hours: None,
            active: true,
            blackout_dates: Vec::new(),
            unavailable_days: Vec::new(),
        }
    }

    pub fn with_weekly_hours(mut self, hours: u32) -> Self {
        self.weekly_hours = Some(hours);
        self
    }

    /// Vrai si l'employé ne peut pas travailler ce jour-là.
    pub fn is_unavailable_on(&self, day: NaiveDate) -> bool {
        use chrono::Datelike;
        self.blackout_dates.contains(&day) || self.unavailable_days.contains(&day.weekday())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid time range: end must be after start")]
pub struct InvalidTimeRange;

/// Intervalle UTC semi-ouvert [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawRange> for TimeRange {
    type Error = InvalidTimeRange;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    /// Crée un intervalle en validant que `end > start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidTimeRange> {
        if end <= start {
            return Err(InvalidTimeRange);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Jours calendaires touchés par l'intervalle (fin exclue).
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let first = self.start.date_naive();
        let last = (self.end - Duration::nanoseconds(1)).date_naive();
        first.iter_days().take_while(move |d| *d <= last)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Draft,
    Confirmed,
}

/// Créneau d'un employé dans un roster (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub roster: RosterId,
    pub employee: EmployeeId,
    pub range: TimeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub status: ShiftStatus,
}

impl Shift {
    pub fn new(roster: RosterId, employee: EmployeeId, range: TimeRange) -> Self {
        Self {
            id: ShiftId::random(),
            roster,
            employee,
            range,
            label: None,
            note: None,
            status: ShiftStatus::Draft,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ShiftStatus::Confirmed
    }

    /// Durée en minutes.
    pub fn duration_minutes(&self) -> i64 {
        self.range.duration().num_minutes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterStatus {
    Draft,
    Finalized,
}

impl fmt::Display for RosterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterStatus::Draft => f.write_str("draft"),
            RosterStatus::Finalized => f.write_str("finalized"),
        }
    }
}

/// En-tête persisté d'un roster (sans ses shifts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterHeader {
    pub id: RosterId,
    pub period: Period,
    pub status: RosterStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cloned_from: Option<RosterId>,
}

/// Totaux dérivés, recalculés à chaque mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterTotals {
    /// Minutes confirmées par employé.
    pub minutes_per_employee: std::collections::BTreeMap<EmployeeId, i64>,
    /// Nombre d'employés distincts commençant un shift chaque jour.
    pub headcount_per_day: std::collections::BTreeMap<NaiveDate, usize>,
}

/// Agrégat Roster : en-tête + shifts ordonnés + totaux.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roster {
    pub header: RosterHeader,
    shifts: Vec<Shift>,
    totals: RosterTotals,
}

impl Roster {
    /// Assemble l'agrégat : trie les shifts et recalcule les totaux.
    pub fn assemble(header: RosterHeader, mut shifts: Vec<Shift>) -> Self {
        sort_canonical(&mut shifts);
        let totals = RosterTotals::compute(&header.period, &shifts);
        Self {
            header,
            shifts,
            totals,
        }
    }

    pub fn id(&self) -> &RosterId {
        &self.header.id
    }
    pub fn period(&self) -> &Period {
        &self.header.period
    }
    pub fn status(&self) -> RosterStatus {
        self.header.status
    }
    pub fn is_finalized(&self) -> bool {
        self.header.status == RosterStatus::Finalized
    }
    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }
    pub fn totals(&self) -> &RosterTotals {
        &self.totals
    }

    pub fn find_shift(&self, id: &ShiftId) -> Option<&Shift> {
        self.shifts.iter().find(|s| &s.id == id)
    }

    pub fn shifts_of<'a>(&'a self, employee: &'a EmployeeId) -> impl Iterator<Item = &'a Shift> {
        self.shifts.iter().filter(move |s| &s.employee == employee)
    }
}

/// Ordre canonique : début, puis employé, puis identifiant.
pub(crate) fn sort_canonical(shifts: &mut [Shift]) {
    shifts.sort_by(|a, b| {
        a.range
            .start()
            .cmp(&b.range.start())
            .then_with(|| a.employee.cmp(&b.employee))
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl RosterTotals {
    pub fn compute(period: &Period, shifts: &[Shift]) -> Self {
        let mut totals = RosterTotals::default();
        let mut seen = std::collections::BTreeSet::new();
        for day in period.days() {
            totals.headcount_per_day.insert(day, 0);
        }
        for shift in shifts.iter().filter(|s| s.is_confirmed()) {
            *totals
                .minutes_per_employee
                .entry(shift.employee.clone())
                .or_insert(0) += shift.duration_minutes();
            let day = shift.range.start().date_naive();
            if seen.insert((day, shift.employee.clone())) {
                *totals.headcount_per_day.entry(day).or_insert(0) += 1;
            }
        }
        totals
    }

    pub fn minutes_for(&self, employee: &EmployeeId) -> i64 {
        self.minutes_per_employee.get(employee).copied().unwrap_or(0)
    }
}
