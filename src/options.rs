use crate::model::Employee;
use crate::period::{Period, PeriodKind};
use anyhow::Context;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options du moteur
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Plafond hebdomadaire appliqué aux employés qui n'en déclarent pas.
    pub default_weekly_hours: u32,
    pub period_kind: PeriodKind,
    pub company_name: String,
    pub department_name: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_weekly_hours: 40,
            period_kind: PeriodKind::Week,
            company_name: "My Company".to_string(),
            department_name: "General Department".to_string(),
        }
    }
}

impl EngineOptions {
    /// Plafond d'heures d'un employé sur `period` : plafond hebdomadaire
    /// multiplié par le nombre de semaines entamées.
    pub fn hour_cap(&self, employee: &Employee, period: &Period) -> Duration {
        let weekly = employee.weekly_hours.unwrap_or(self.default_weekly_hours);
        Duration::hours(i64::from(weekly) * period.weeks_spanned())
    }
}

/// Charge des options JSON ; les champs absents prennent leur valeur par défaut.
pub fn load_options<P: AsRef<Path>>(path: P) -> anyhow::Result<EngineOptions> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let opts: EngineOptions = serde_json::from_slice(&data)
        .with_context(|| format!("parsing options {}", path.display()))?;
    if opts.default_weekly_hours == 0 {
        anyhow::bail!("default_weekly_hours must be > 0");
    }
    Ok(opts)
}
