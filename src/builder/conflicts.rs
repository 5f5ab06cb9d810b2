use super::{RosterBuilder, RosterConflict};
use crate::model::{Employee, EmployeeId, Roster, Shift};
use crate::registry::EmployeeDirectory;
use crate::repository::ShiftRepository;
use crate::validator::{self, ConflictKind, ValidationContext};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

pub(super) fn detect_conflicts<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    roster: &Roster,
) -> Vec<RosterConflict> {
    let mut by_employee: BTreeMap<&EmployeeId, Vec<Shift>> = BTreeMap::new();
    for shift in roster.shifts() {
        by_employee
            .entry(&shift.employee)
            .or_default()
            .push(shift.clone());
    }

    let period = roster.period();
    let mut out = Vec::new();

    for (employee_id, shifts) in by_employee {
        let employee = match builder.directory.get_employee(employee_id) {
            Ok(e) => e,
            Err(err) => {
                warn!(roster = %roster.id(), %err, "checking shifts of unregistered employee");
                Employee::new(employee_id.as_str(), employee_id.as_str())
            }
        };
        let ctx = ValidationContext {
            period: &period.range,
            hour_cap: builder.opts.hour_cap(&employee, period),
            employee: &employee,
        };

        let mut reported_pairs = HashSet::new();
        let mut cap_reported = false;
        for shift in &shifts {
            for kind in validator::validate_all(shift, &shifts, &ctx) {
                match &kind {
                    ConflictKind::Overlap { conflicting } => {
                        // paire (a, b) déjà signalée depuis b
                        if !reported_pairs.insert((shift.id.clone(), conflicting.clone()))
                            || reported_pairs.contains(&(conflicting.clone(), shift.id.clone()))
                        {
                            continue;
                        }
                    }
                    ConflictKind::HourCapExceeded { .. } => {
                        if cap_reported {
                            continue;
                        }
                        cap_reported = true;
                    }
                    _ => {}
                }
                out.push(RosterConflict {
                    shift: shift.id.clone(),
                    employee: employee_id.clone(),
                    kind,
                });
            }
        }
    }

    out
}
