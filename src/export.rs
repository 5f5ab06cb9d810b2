//! Projection d'un roster finalisé vers un document ordonné, immuable, prêt
//! à être rendu (PDF, CSV…) par un collaborateur externe.

use crate::model::{EmployeeId, Roster, RosterId, ShiftId};
use crate::options::EngineOptions;
use crate::period::Period;
use crate::registry::EmployeeDirectory;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("roster {0} is not finalized")]
    NotFinalized(RosterId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportHeader {
    pub roster: RosterId,
    pub company: String,
    pub department: String,
    pub period: Period,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub cloned_from: Option<RosterId>,
}

/// Une ligne par shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftRow {
    pub day: NaiveDate,
    pub employee: EmployeeId,
    pub employee_name: String,
    pub shift: ShiftId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub minutes: i64,
    pub label: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeTotalRow {
    pub employee: EmployeeId,
    pub employee_name: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayHeadcountRow {
    pub day: NaiveDate,
    pub headcount: usize,
}

/// Document d'export : construit une fois, jamais modifié.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    header: ExportHeader,
    rows: Vec<ShiftRow>,
    employee_totals: Vec<EmployeeTotalRow>,
    day_headcounts: Vec<DayHeadcountRow>,
}

impl ExportDocument {
    pub fn header(&self) -> &ExportHeader {
        &self.header
    }
    pub fn rows(&self) -> &[ShiftRow] {
        &self.rows
    }
    pub fn employee_totals(&self) -> &[EmployeeTotalRow] {
        &self.employee_totals
    }
    pub fn day_headcounts(&self) -> &[DayHeadcountRow] {
        &self.day_headcounts
    }

    /// Lignes d'un jour donné, dans l'ordre du document.
    pub fn rows_for(&self, day: NaiveDate) -> impl Iterator<Item = &ShiftRow> {
        self.rows.iter().filter(move |r| r.day == day)
    }
}

/// Heures décimales à deux chiffres (« 7.50 »).
pub fn format_hours(minutes: i64) -> String {
    format!("{:.2}", minutes as f64 / 60.0)
}

pub struct ExportProjector<'a, D: ?Sized> {
    directory: &'a D,
    opts: &'a EngineOptions,
}

impl<'a, D: EmployeeDirectory + ?Sized> ExportProjector<'a, D> {
    pub fn new(directory: &'a D, opts: &'a EngineOptions) -> Self {
        Self { directory, opts }
    }

    pub fn project(&self, roster: &Roster) -> Result<ExportDocument, ExportError> {
        if !roster.is_finalized() {
            return Err(ExportError::NotFinalized(roster.id().clone()));
        }

        let names = self.display_names(roster);
        let name_of = |id: &EmployeeId| names.get(id).cloned().unwrap_or_default();

        let mut rows: Vec<ShiftRow> = roster
            .shifts()
            .iter()
            .filter(|s| s.is_confirmed())
            .map(|s| ShiftRow {
                day: s.range.start().date_naive(),
                employee: s.employee.clone(),
                employee_name: name_of(&s.employee),
                shift: s.id.clone(),
                start: s.range.start(),
                end: s.range.end(),
                minutes: s.duration_minutes(),
                label: s.label.clone(),
                note: s.note.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.day
                .cmp(&b.day)
                .then_with(|| {
                    a.employee_name
                        .to_lowercase()
                        .cmp(&b.employee_name.to_lowercase())
                })
                .then_with(|| a.employee.cmp(&b.employee))
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.shift.cmp(&b.shift))
        });

        let totals = roster.totals();
        let mut employee_totals: Vec<EmployeeTotalRow> = totals
            .minutes_per_employee
            .iter()
            .map(|(id, minutes)| EmployeeTotalRow {
                employee: id.clone(),
                employee_name: name_of(id),
                minutes: *minutes,
            })
            .collect();
        employee_totals.sort_by(|a, b| {
            a.employee_name
                .to_lowercase()
                .cmp(&b.employee_name.to_lowercase())
                .then_with(|| a.employee.cmp(&b.employee))
        });

        let day_headcounts = totals
            .headcount_per_day
            .iter()
            .map(|(day, headcount)| DayHeadcountRow {
                day: *day,
                headcount: *headcount,
            })
            .collect();

        let period = *roster.period();
        Ok(ExportDocument {
            header: ExportHeader {
                roster: roster.id().clone(),
                company: self.opts.company_name.clone(),
                department: self.opts.department_name.clone(),
                period,
                first_day: period.first_day(),
                last_day: period.last_day(),
                created_at: roster.header.created_at,
                cloned_from: roster.header.cloned_from.clone(),
            },
            rows,
            employee_totals,
            day_headcounts,
        })
    }

    fn display_names(&self, roster: &Roster) -> BTreeMap<EmployeeId, String> {
        let mut names = BTreeMap::new();
        for shift in roster.shifts() {
            if names.contains_key(&shift.employee) {
                continue;
            }
            let name = match self.directory.get_employee(&shift.employee) {
                Ok(e) => e.display_name,
                Err(err) => {
                    warn!(roster = %roster.id(), %err, "exporting shift of unregistered employee");
                    shift.employee.as_str().to_string()
                }
            };
            names.insert(shift.employee.clone(), name);
        }
        names
    }
}
