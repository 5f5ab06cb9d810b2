//! Construction des rosters : mutations validées, finalisation, clonage.
//!
//! Un seul écrivain par roster (verrou exclusif par identifiant). Les
//! lecteurs obtiennent un `Arc<Roster>` figé ; chaque mutation construit
//! l'agrégat suivant puis le publie d'un bloc.

mod conflicts;
mod lifecycle;
mod mutate;
mod types;

pub use types::{RosterConflict, RosterError};

use crate::model::{EmployeeId, Roster, RosterHeader, RosterId, Shift, ShiftId, TimeRange};
use crate::options::EngineOptions;
use crate::period::Period;
use crate::registry::EmployeeDirectory;
use crate::repository::ShiftRepository;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Façade des opérations sur les rosters.
///
/// Verrous d'écriture et instantanés sont gardés par roster tant que le
/// builder vit ; `delete_roster` les libère.
pub struct RosterBuilder<R, D> {
    repo: R,
    directory: D,
    opts: EngineOptions,
    writers: Mutex<HashMap<RosterId, Arc<Mutex<()>>>>,
    snapshots: RwLock<HashMap<RosterId, Arc<Roster>>>,
}

impl<R: ShiftRepository, D: EmployeeDirectory> RosterBuilder<R, D> {
    pub fn new(repo: R, directory: D, opts: EngineOptions) -> Self {
        Self {
            repo,
            directory,
            opts,
            writers: Mutex::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
    pub fn directory(&self) -> &D {
        &self.directory
    }
    pub fn options(&self) -> &EngineOptions {
        &self.opts
    }

    /// Instantané courant d'un roster (chargé depuis le dépôt au besoin).
    pub fn roster(&self, id: &RosterId) -> Result<Arc<Roster>, RosterError> {
        if let Some(snapshot) = self.snapshots.read().get(id) {
            return Ok(Arc::clone(snapshot));
        }
        let header = self
            .repo
            .get_roster(id)?
            .ok_or_else(|| RosterError::roster_not_found(id))?;
        let shifts = self.repo.shifts_for_roster(id)?;
        let roster = Arc::new(Roster::assemble(header, shifts));
        // un écrivain a pu publier entre-temps : on garde sa version
        let mut snapshots = self.snapshots.write();
        Ok(Arc::clone(snapshots.entry(id.clone()).or_insert(roster)))
    }

    pub fn rosters(&self) -> Result<Vec<RosterHeader>, RosterError> {
        let mut headers = self.repo.list_rosters()?;
        headers.sort_by(|a, b| {
            a.period
                .range
                .start()
                .cmp(&b.period.range.start())
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(headers)
    }

    /// Nouveau roster brouillon vide.
    pub fn create_roster(&self, period: Period) -> Result<Arc<Roster>, RosterError> {
        lifecycle::create_roster(self, period)
    }

    pub fn add_shift(
        &self,
        roster: &RosterId,
        employee: &EmployeeId,
        range: TimeRange,
        note: Option<String>,
    ) -> Result<Shift, RosterError> {
        mutate::add_shift(self, roster, employee, range, None, note)
    }

    /// Comme `add_shift`, avec un libellé de créneau (« Matin », « Nuit »…).
    pub fn add_labeled_shift(
        &self,
        roster: &RosterId,
        employee: &EmployeeId,
        range: TimeRange,
        label: Option<String>,
        note: Option<String>,
    ) -> Result<Shift, RosterError> {
        mutate::add_shift(self, roster, employee, range, label, note)
    }

    pub fn update_shift(
        &self,
        roster: &RosterId,
        shift: &ShiftId,
        new_range: TimeRange,
    ) -> Result<Shift, RosterError> {
        mutate::update_shift(self, roster, shift, new_range)
    }

    pub fn remove_shift(&self, roster: &RosterId, shift: &ShiftId) -> Result<(), RosterError> {
        mutate::remove_shift(self, roster, shift)
    }

    pub fn finalize(&self, roster: &RosterId) -> Result<Arc<Roster>, RosterError> {
        lifecycle::finalize(self, roster)
    }

    pub fn clone_as_draft(&self, roster: &RosterId) -> Result<Arc<Roster>, RosterError> {
        lifecycle::clone_as_draft(self, roster)
    }

    /// Supprime un roster brouillon et tous ses shifts.
    pub fn delete_roster(&self, roster: &RosterId) -> Result<(), RosterError> {
        lifecycle::delete_roster(self, roster)
    }

    /// Revalide tout le roster et liste chaque violation une seule fois.
    pub fn check(&self, roster: &RosterId) -> Result<Vec<RosterConflict>, RosterError> {
        let snapshot = self.roster(roster)?;
        Ok(conflicts::detect_conflicts(self, &snapshot))
    }

    fn writer_lock(&self, id: &RosterId) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock();
        Arc::clone(writers.entry(id.clone()).or_default())
    }

    /// Oublie l'instantané et le verrou d'un roster supprimé. Les écrivains
    /// déjà en attente sur l'ancien verrou échouent ensuite en `NotFound`.
    fn forget(&self, id: &RosterId) {
        self.snapshots.write().remove(id);
        self.writers.lock().remove(id);
    }

    fn publish(&self, roster: Roster) -> Arc<Roster> {
        let roster = Arc::new(roster);
        self.snapshots
            .write()
            .insert(roster.id().clone(), Arc::clone(&roster));
        roster
    }
}
