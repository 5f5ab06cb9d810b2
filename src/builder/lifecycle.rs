use super::{mutate::ensure_draft, RosterBuilder, RosterError};
use crate::model::{Roster, RosterHeader, RosterId, RosterStatus, Shift, ShiftId};
use crate::period::Period;
use crate::registry::EmployeeDirectory;
use crate::repository::ShiftRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub(super) fn create_roster<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    period: Period,
) -> Result<Arc<Roster>, RosterError> {
    let header = RosterHeader {
        id: RosterId::random(),
        period,
        status: RosterStatus::Draft,
        created_at: Utc::now(),
        cloned_from: None,
    };
    builder.repo.create_roster(&header)?;
    info!(roster = %header.id, %period, "roster created");
    Ok(builder.publish(Roster::assemble(header, Vec::new())))
}

/// Transition à sens unique Draft → Finalized.
pub(super) fn finalize<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    roster_id: &RosterId,
) -> Result<Arc<Roster>, RosterError> {
    let lock = builder.writer_lock(roster_id);
    let _guard = lock.lock();

    let current = builder.roster(roster_id)?;
    ensure_draft(&current, "finalize")?;
    if current.shifts().is_empty() {
        return Err(RosterError::EmptyRoster(roster_id.clone()));
    }

    builder
        .repo
        .save_roster_status(roster_id, RosterStatus::Finalized)?;

    let mut header = current.header.clone();
    header.status = RosterStatus::Finalized;
    let finalized = builder.publish(Roster::assemble(header, current.shifts().to_vec()));
    info!(roster = %roster_id, shifts = finalized.shifts().len(), "roster finalized");
    Ok(finalized)
}

/// Copie un roster finalisé dans un nouveau brouillon (nouveaux identifiants,
/// même période).
pub(super) fn clone_as_draft<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    roster_id: &RosterId,
) -> Result<Arc<Roster>, RosterError> {
    let lock = builder.writer_lock(roster_id);
    let _guard = lock.lock();

    let source = builder.roster(roster_id)?;
    if !source.is_finalized() {
        return Err(RosterError::InvalidState {
            roster: roster_id.clone(),
            status: source.status(),
            operation: "clone_as_draft",
        });
    }

    let header = RosterHeader {
        id: RosterId::random(),
        period: *source.period(),
        status: RosterStatus::Draft,
        created_at: Utc::now(),
        cloned_from: Some(roster_id.clone()),
    };
    let shifts: Vec<Shift> = source
        .shifts()
        .iter()
        .map(|s| Shift {
            id: ShiftId::random(),
            roster: header.id.clone(),
            ..s.clone()
        })
        .collect();

    builder.repo.create_roster_with_shifts(&header, &shifts)?;

    info!(roster = %header.id, source = %roster_id, "roster cloned as draft");
    Ok(builder.publish(Roster::assemble(header, shifts)))
}

/// Supprime un roster brouillon et ses shifts. Un roster finalisé est figé.
pub(super) fn delete_roster<R: ShiftRepository, D: EmployeeDirectory>(
    builder: &RosterBuilder<R, D>,
    roster_id: &RosterId,
) -> Result<(), RosterError> {
    let lock = builder.writer_lock(roster_id);
    let _guard = lock.lock();

    let current = builder.roster(roster_id)?;
    ensure_draft(&current, "delete_roster")?;

    builder.repo.delete_roster(roster_id)?;
    builder.forget(roster_id);

    info!(roster = %roster_id, shifts = current.shifts().len(), "roster deleted");
    Ok(())
}
