use super::{RosterBuilder, RosterError};
use crate::model::{Employee, EmployeeId, Roster, RosterId, Shift, ShiftId, ShiftStatus, TimeRange};
use crate::period;
use crate::registry::EmployeeDirectory;
use crate::repository::ShiftRepository;
use crate::validator::{self, ValidationContext};
use tracing::{debug, warn};

pub(super) fn add_shift<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    roster_id: &RosterId,
    employee_id: &EmployeeId,
    range: TimeRange,
    label: Option<String>,
    note: Option<String>,
) -> Result<Shift, RosterError> {
    let lock = builder.writer_lock(roster_id);
    let _guard = lock.lock();

    let current = builder.roster(roster_id)?;
    ensure_draft(&current, "add_shift")?;

    let employee = builder.directory.get_employee(employee_id)?;
    if !employee.active {
        return Err(RosterError::InactiveEmployee(employee_id.clone()));
    }

    let range = period::normalize(&range)?;
    let mut shift = Shift::new(roster_id.clone(), employee_id.clone(), range);
    shift.label = label;
    shift.note = note;
    check_candidate(builder, &current, &employee, &shift)?;

    // pas d'étape d'approbation : le shift validé est confirmé d'emblée
    shift.status = ShiftStatus::Confirmed;
    builder.repo.save_shift(&shift)?;

    let mut shifts = current.shifts().to_vec();
    shifts.push(shift.clone());
    builder.publish(Roster::assemble(current.header.clone(), shifts));

    debug!(roster = %roster_id, shift = %shift.id, employee = %employee_id, "shift added");
    Ok(shift)
}

pub(super) fn update_shift<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    roster_id: &RosterId,
    shift_id: &ShiftId,
    new_range: TimeRange,
) -> Result<Shift, RosterError> {
    let lock = builder.writer_lock(roster_id);
    let _guard = lock.lock();

    let current = builder.roster(roster_id)?;
    ensure_draft(&current, "update_shift")?;

    let Some(old) = current.find_shift(shift_id) else {
        return Err(RosterError::shift_not_found(shift_id));
    };
    let employee = builder.directory.get_employee(&old.employee)?;

    let replacement = Shift {
        range: period::normalize(&new_range)?,
        ..old.clone()
    };
    check_candidate(builder, &current, &employee, &replacement)?;

    // upsert sur le même identifiant : remplacement atomique côté dépôt
    builder.repo.save_shift(&replacement)?;

    let shifts = current
        .shifts()
        .iter()
        .map(|s| {
            if &s.id == shift_id {
                replacement.clone()
            } else {
                s.clone()
            }
        })
        .collect();
    builder.publish(Roster::assemble(current.header.clone(), shifts));

    debug!(roster = %roster_id, shift = %shift_id, "shift updated");
    Ok(replacement)
}

pub(super) fn remove_shift<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    roster_id: &RosterId,
    shift_id: &ShiftId,
) -> Result<(), RosterError> {
    let lock = builder.writer_lock(roster_id);
    let _guard = lock.lock();

    let current = builder.roster(roster_id)?;
    ensure_draft(&current, "remove_shift")?;

    if current.find_shift(shift_id).is_none() {
        return Err(RosterError::shift_not_found(shift_id));
    }
    builder.repo.delete_shift(shift_id)?;

    let shifts = current
        .shifts()
        .iter()
        .filter(|s| &s.id != shift_id)
        .cloned()
        .collect();
    builder.publish(Roster::assemble(current.header.clone(), shifts));

    debug!(roster = %roster_id, shift = %shift_id, "shift removed");
    Ok(())
}

pub(super) fn ensure_draft(roster: &Roster, operation: &'static str) -> Result<(), RosterError> {
    if roster.is_finalized() {
        return Err(RosterError::InvalidState {
            roster: roster.id().clone(),
            status: roster.status(),
            operation,
        });
    }
    Ok(())
}

/// Lit les shifts existants de l'employé via le dépôt et valide le candidat.
fn check_candidate<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    roster: &Roster,
    employee: &Employee,
    candidate: &Shift,
) -> Result<(), RosterError> {
    let period = roster.period();
    let existing: Vec<Shift> = builder
        .repo
        .shifts_for_employee(&employee.id, &period.range)?
        .into_iter()
        .filter(|s| &s.roster == roster.id())
        .collect();

    let ctx = ValidationContext {
        period: &period.range,
        hour_cap: builder.opts.hour_cap(employee, period),
        employee,
    };
    validator::validate(candidate, &existing, &ctx).map_err(|kind| {
        warn!(roster = %roster.id(), employee = %employee.id, %kind, "shift rejected");
        RosterError::Conflict(kind)
    })
}
