//! Validation des conflits : fonction pure, sans I/O.
//!
//! Ordre de priorité des violations : chevauchement, plafond d'heures,
//! hors période, indisponibilité. `validate` rend la première,
//! `validate_all` les rend toutes dans cet ordre.

mod types;

pub use types::{ConflictKind, ValidationContext};

use crate::model::{Shift, TimeRange};
use chrono::Duration;

/// Valide `candidate` contre les shifts existants du même employé.
///
/// Un shift existant portant le même identifiant que le candidat est celui
/// qu'il remplace : il est ignoré.
pub fn validate(
    candidate: &Shift,
    existing: &[Shift],
    ctx: &ValidationContext<'_>,
) -> Result<(), ConflictKind> {
    let others = comparable(candidate, existing);
    if let Some(conflict) = overlaps(candidate, &others).into_iter().next() {
        return Err(conflict);
    }
    if let Some(conflict) = hour_cap(candidate, &others, ctx) {
        return Err(conflict);
    }
    if let Some(conflict) = out_of_period(candidate, ctx) {
        return Err(conflict);
    }
    if let Some(conflict) = unavailable(candidate, ctx).into_iter().next() {
        return Err(conflict);
    }
    Ok(())
}

/// Variante diagnostique : toutes les violations.
pub fn validate_all(
    candidate: &Shift,
    existing: &[Shift],
    ctx: &ValidationContext<'_>,
) -> Vec<ConflictKind> {
    let others = comparable(candidate, existing);
    let mut out = overlaps(candidate, &others);
    out.extend(hour_cap(candidate, &others, ctx));
    out.extend(out_of_period(candidate, ctx));
    out.extend(unavailable(candidate, ctx));
    out
}

/// Shifts confirmés du même employé, hors shift remplacé, triés par début.
fn comparable<'a>(candidate: &Shift, existing: &'a [Shift]) -> Vec<&'a Shift> {
    let mut others: Vec<&Shift> = existing
        .iter()
        .filter(|s| s.id != candidate.id && s.employee == candidate.employee && s.is_confirmed())
        .collect();
    others.sort_by(|a, b| {
        a.range
            .start()
            .cmp(&b.range.start())
            .then_with(|| a.id.cmp(&b.id))
    });
    others
}

fn overlaps(candidate: &Shift, sorted: &[&Shift]) -> Vec<ConflictKind> {
    let mut out = Vec::new();
    for s in sorted {
        if s.range.start() >= candidate.range.end() {
            break;
        }
        if s.range.overlaps(&candidate.range) {
            out.push(ConflictKind::Overlap {
                conflicting: s.id.clone(),
            });
        }
    }
    out
}

fn hour_cap(
    candidate: &Shift,
    others: &[&Shift],
    ctx: &ValidationContext<'_>,
) -> Option<ConflictKind> {
    let booked = others
        .iter()
        .map(|s| clipped(&s.range, ctx.period))
        .fold(Duration::zero(), |acc, d| acc + d);
    let total = booked + candidate.range.duration();
    if total > ctx.hour_cap {
        return Some(ConflictKind::HourCapExceeded {
            employee: candidate.employee.clone(),
            excess: total - ctx.hour_cap,
        });
    }
    None
}

fn out_of_period(candidate: &Shift, ctx: &ValidationContext<'_>) -> Option<ConflictKind> {
    if ctx.period.contains(&candidate.range) {
        return None;
    }
    Some(ConflictKind::OutOfPeriod {
        range: candidate.range,
        period: *ctx.period,
    })
}

fn unavailable(candidate: &Shift, ctx: &ValidationContext<'_>) -> Vec<ConflictKind> {
    candidate
        .range
        .days()
        .filter(|day| ctx.employee.is_unavailable_on(*day))
        .map(|date| ConflictKind::Unavailable {
            employee: candidate.employee.clone(),
            date,
        })
        .collect()
}

/// Part de `range` comprise dans `period`.
fn clipped(range: &TimeRange, period: &TimeRange) -> Duration {
    let start = range.start().max(period.start());
    let end = range.end().min(period.end());
    if end > start {
        end - start
    } else {
        Duration::zero()
    }
}
