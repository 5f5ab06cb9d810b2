#![forbid(unsafe_code)]
//! Roulement — moteur de planning d'équipes.
//!
//! - Périodes jour / semaine / mois, tout en UTC.
//! - Validation pure des conflits (chevauchement, plafond d'heures, période,
//!   indisponibilités).
//! - Rosters brouillon → finalisé, clonage pour amendement.
//! - Projection d'un roster finalisé en document d'export ordonné.
//! - Stockage derrière un trait de dépôt (mémoire ou fichier JSON).

pub mod builder;
pub mod export;
pub mod io;
pub mod model;
pub mod options;
pub mod period;
pub mod registry;
pub mod repository;
pub mod validator;

pub use builder::{RosterBuilder, RosterConflict, RosterError};
pub use export::{ExportDocument, ExportError, ExportProjector};
pub use model::{
    Employee, EmployeeId, Roster, RosterHeader, RosterId, RosterStatus, Shift, ShiftId,
    ShiftStatus, TimeRange,
};
pub use options::{load_options, EngineOptions};
pub use period::{Period, PeriodKind};
pub use registry::{EmployeeDirectory, InMemoryDirectory};
pub use repository::{InMemoryRepository, JsonRepository, RepositoryError, ShiftRepository};
pub use validator::{validate, validate_all, ConflictKind, ValidationContext};
