use crate::model::{EmployeeId, InvalidTimeRange, RosterId, RosterStatus, ShiftId};
use crate::registry::EmployeeNotFound;
use crate::repository::RepositoryError;
use crate::validator::ConflictKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("{operation} not allowed on {status} roster {roster}")]
    InvalidState {
        roster: RosterId,
        status: RosterStatus,
        operation: &'static str,
    },
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictKind),
    #[error("roster {0} has no shift and cannot be finalized")]
    EmptyRoster(RosterId),
    #[error("employee {0} is inactive")]
    InactiveEmployee(EmployeeId),
    #[error(transparent)]
    InvalidTimeRange(#[from] InvalidTimeRange),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RosterError {
    pub(super) fn roster_not_found(id: &RosterId) -> Self {
        RosterError::NotFound {
            entity: "roster",
            id: id.as_str().to_string(),
        }
    }

    pub(super) fn shift_not_found(id: &ShiftId) -> Self {
        RosterError::NotFound {
            entity: "shift",
            id: id.as_str().to_string(),
        }
    }
}

impl From<EmployeeNotFound> for RosterError {
    fn from(err: EmployeeNotFound) -> Self {
        RosterError::NotFound {
            entity: "employee",
            id: err.0.as_str().to_string(),
        }
    }
}

/// Conflit détecté sur un roster existant (diagnostic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterConflict {
    pub shift: ShiftId,
    pub employee: EmployeeId,
    pub kind: ConflictKind,
}
