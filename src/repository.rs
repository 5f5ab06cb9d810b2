//! Frontière de persistance : le moteur ne voit le stockage qu'à travers
//! [`ShiftRepository`]. Chaque appel est atomique individuellement.

use crate::model::{
    sort_canonical, EmployeeId, RosterHeader, RosterId, RosterStatus, Shift, ShiftId, TimeRange,
};
use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("unknown roster: {0}")]
    UnknownRoster(RosterId),
    #[error("unknown shift: {0}")]
    UnknownShift(ShiftId),
    #[error("roster already exists: {0}")]
    DuplicateRoster(RosterId),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub trait ShiftRepository: Send + Sync {
    /// Shifts d'un employé qui recoupent `period`, tous rosters confondus.
    fn shifts_for_employee(
        &self,
        employee: &EmployeeId,
        period: &TimeRange,
    ) -> Result<Vec<Shift>, RepositoryError>;
    fn shifts_for_roster(&self, roster: &RosterId) -> Result<Vec<Shift>, RepositoryError>;
    /// Insère ou remplace (même identifiant).
    fn save_shift(&self, shift: &Shift) -> Result<(), RepositoryError>;
    fn delete_shift(&self, shift: &ShiftId) -> Result<(), RepositoryError>;
    fn save_roster_status(
        &self,
        roster: &RosterId,
        status: RosterStatus,
    ) -> Result<(), RepositoryError>;
    fn create_roster(&self, header: &RosterHeader) -> Result<(), RepositoryError>;
    /// Crée le roster et tous ses shifts en un seul appel : tout ou rien.
    fn create_roster_with_shifts(
        &self,
        header: &RosterHeader,
        shifts: &[Shift],
    ) -> Result<(), RepositoryError>;
    /// Supprime le roster et ses shifts en un seul appel.
    fn delete_roster(&self, roster: &RosterId) -> Result<(), RepositoryError>;
    fn get_roster(&self, roster: &RosterId) -> Result<Option<RosterHeader>, RepositoryError>;
    fn list_rosters(&self) -> Result<Vec<RosterHeader>, RepositoryError>;
}

/// Contenu complet d'un dépôt, tel que sérialisé sur disque.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub rosters: BTreeMap<RosterId, RosterHeader>,
    #[serde(default)]
    pub shifts: BTreeMap<ShiftId, Shift>,
}

impl StoreSnapshot {
    fn shifts_for_employee(&self, employee: &EmployeeId, period: &TimeRange) -> Vec<Shift> {
        let mut out: Vec<Shift> = self
            .shifts
            .values()
            .filter(|s| &s.employee == employee && s.range.overlaps(period))
            .cloned()
            .collect();
        sort_canonical(&mut out);
        out
    }

    fn shifts_for_roster(&self, roster: &RosterId) -> Vec<Shift> {
        let mut out: Vec<Shift> = self
            .shifts
            .values()
            .filter(|s| &s.roster == roster)
            .cloned()
            .collect();
        sort_canonical(&mut out);
        out
    }

    fn save_shift(&mut self, shift: &Shift) -> Result<(), RepositoryError> {
        if !self.rosters.contains_key(&shift.roster) {
            return Err(RepositoryError::UnknownRoster(shift.roster.clone()));
        }
        self.shifts.insert(shift.id.clone(), shift.clone());
        Ok(())
    }

    fn delete_shift(&mut self, shift: &ShiftId) -> Result<(), RepositoryError> {
        self.shifts
            .remove(shift)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::UnknownShift(shift.clone()))
    }

    fn save_roster_status(
        &mut self,
        roster: &RosterId,
        status: RosterStatus,
    ) -> Result<(), RepositoryError> {
        let header = self
            .rosters
            .get_mut(roster)
            .ok_or_else(|| RepositoryError::UnknownRoster(roster.clone()))?;
        header.status = status;
        Ok(())
    }

    fn create_roster(&mut self, header: &RosterHeader) -> Result<(), RepositoryError> {
        if self.rosters.contains_key(&header.id) {
            return Err(RepositoryError::DuplicateRoster(header.id.clone()));
        }
        self.rosters.insert(header.id.clone(), header.clone());
        Ok(())
    }

    fn create_roster_with_shifts(
        &mut self,
        header: &RosterHeader,
        shifts: &[Shift],
    ) -> Result<(), RepositoryError> {
        if self.rosters.contains_key(&header.id) {
            return Err(RepositoryError::DuplicateRoster(header.id.clone()));
        }
        if let Some(stray) = shifts.iter().find(|s| s.roster != header.id) {
            return Err(RepositoryError::UnknownRoster(stray.roster.clone()));
        }
        self.rosters.insert(header.id.clone(), header.clone());
        for shift in shifts {
            self.shifts.insert(shift.id.clone(), shift.clone());
        }
        Ok(())
    }

    fn delete_roster(&mut self, roster: &RosterId) -> Result<(), RepositoryError> {
        if self.rosters.remove(roster).is_none() {
            return Err(RepositoryError::UnknownRoster(roster.clone()));
        }
        self.shifts.retain(|_, s| &s.roster != roster);
        Ok(())
    }
}

/// Dépôt en mémoire, utilisé par les tests et les appelants sans stockage.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<StoreSnapshot>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.read().clone()
    }
}

impl ShiftRepository for InMemoryRepository {
    fn shifts_for_employee(
        &self,
        employee: &EmployeeId,
        period: &TimeRange,
    ) -> Result<Vec<Shift>, RepositoryError> {
        Ok(self.state.read().shifts_for_employee(employee, period))
    }

    fn shifts_for_roster(&self, roster: &RosterId) -> Result<Vec<Shift>, RepositoryError> {
        Ok(self.state.read().shifts_for_roster(roster))
    }

    fn save_shift(&self, shift: &Shift) -> Result<(), RepositoryError> {
        self.state.write().save_shift(shift)
    }

    fn delete_shift(&self, shift: &ShiftId) -> Result<(), RepositoryError> {
        self.state.write().delete_shift(shift)
    }

    fn save_roster_status(
        &self,
        roster: &RosterId,
        status: RosterStatus,
    ) -> Result<(), RepositoryError> {
        self.state.write().save_roster_status(roster, status)
    }

    fn create_roster(&self, header: &RosterHeader) -> Result<(), RepositoryError> {
        self.state.write().create_roster(header)
    }

    fn create_roster_with_shifts(
        &self,
        header: &RosterHeader,
        shifts: &[Shift],
    ) -> Result<(), RepositoryError> {
        self.state.write().create_roster_with_shifts(header, shifts)
    }

    fn delete_roster(&self, roster: &RosterId) -> Result<(), RepositoryError> {
        self.state.write().delete_roster(roster)
    }

    fn get_roster(&self, roster: &RosterId) -> Result<Option<RosterHeader>, RepositoryError> {
        Ok(self.state.read().rosters.get(roster).cloned())
    }

    fn list_rosters(&self) -> Result<Vec<RosterHeader>, RepositoryError> {
        Ok(self.state.read().rosters.values().cloned().collect())
    }
}

/// Dépôt fichier JSON ; chaque écriture remplace le fichier de manière atomique.
pub struct JsonRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn load(&self) -> Result<StoreSnapshot, RepositoryError> {
        if !self.path.exists() {
            return Ok(StoreSnapshot::default());
        }
        let data = fs::read(&self.path)
            .map_err(|e| RepositoryError::Unavailable(format!("{}: {e}", self.path.display())))?;
        let store = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(store)
    }

    fn save(&self, store: &StoreSnapshot) -> Result<(), RepositoryError> {
        let json = serde_json::to_vec_pretty(store).context("serializing store")?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| RepositoryError::Unavailable(format!("creating temp file: {e}")))?;
        tmp.write_all(&json).context("writing temp file")?;
        tmp.flush().context("flushing temp file")?;
        tmp.as_file().sync_all().context("syncing temp file")?;
        tmp.persist(&self.path)
            .map_err(|e| RepositoryError::Unavailable(format!("atomic rename: {e}")))?;
        Ok(())
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut StoreSnapshot) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let _guard = self.write_lock.lock();
        let mut store = self.load()?;
        let out = f(&mut store)?;
        self.save(&store)?;
        Ok(out)
    }
}

impl ShiftRepository for JsonRepository {
    fn shifts_for_employee(
        &self,
        employee: &EmployeeId,
        period: &TimeRange,
    ) -> Result<Vec<Shift>, RepositoryError> {
        Ok(self.load()?.shifts_for_employee(employee, period))
    }

    fn shifts_for_roster(&self, roster: &RosterId) -> Result<Vec<Shift>, RepositoryError> {
        Ok(self.load()?.shifts_for_roster(roster))
    }

    fn save_shift(&self, shift: &Shift) -> Result<(), RepositoryError> {
        self.update(|store| store.save_shift(shift))
    }

    fn delete_shift(&self, shift: &ShiftId) -> Result<(), RepositoryError> {
        self.update(|store| store.delete_shift(shift))
    }

    fn save_roster_status(
        &self,
        roster: &RosterId,
        status: RosterStatus,
    ) -> Result<(), RepositoryError> {
        self.update(|store| store.save_roster_status(roster, status))
    }

    fn create_roster(&self, header: &RosterHeader) -> Result<(), RepositoryError> {
        self.update(|store| store.create_roster(header))
    }

    fn create_roster_with_shifts(
        &self,
        header: &RosterHeader,
        shifts: &[Shift],
    ) -> Result<(), RepositoryError> {
        self.update(|store| store.create_roster_with_shifts(header, shifts))
    }

    fn delete_roster(&self, roster: &RosterId) -> Result<(), RepositoryError> {
        self.update(|store| store.delete_roster(roster))
    }

    fn get_roster(&self, roster: &RosterId) -> Result<Option<RosterHeader>, RepositoryError> {
        Ok(self.load()?.rosters.get(roster).cloned())
    }

    fn list_rosters(&self) -> Result<Vec<RosterHeader>, RepositoryError> {
        Ok(self.load()?.rosters.into_values().collect())
    }
}
