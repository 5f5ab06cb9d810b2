use crate::model::{Employee, EmployeeId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown employee: {0}")]
pub struct EmployeeNotFound(pub EmployeeId);

/// Vue en lecture seule du registre des employés.
pub trait EmployeeDirectory: Send + Sync {
    fn get_employee(&self, id: &EmployeeId) -> Result<Employee, EmployeeNotFound>;
    /// Liste complète, triée par identifiant.
    fn employees(&self) -> Vec<Employee>;
}

/// Registre en mémoire, alimenté par l'appelant (import CSV, tests).
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    employees: RwLock<BTreeMap<EmployeeId, Employee>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees<I: IntoIterator<Item = Employee>>(employees: I) -> Self {
        let dir = Self::new();
        dir.upsert_all(employees);
        dir
    }

    pub fn upsert(&self, employee: Employee) {
        self.employees.write().insert(employee.id.clone(), employee);
    }

    pub fn upsert_all<I: IntoIterator<Item = Employee>>(&self, employees: I) {
        let mut map = self.employees.write();
        for e in employees {
            map.insert(e.id.clone(), e);
        }
    }
}

impl EmployeeDirectory for InMemoryDirectory {
    fn get_employee(&self, id: &EmployeeId) -> Result<Employee, EmployeeNotFound> {
        self.employees
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| EmployeeNotFound(id.clone()))
    }

    fn employees(&self) -> Vec<Employee> {
        self.employees.read().values().cloned().collect()
    }
}
