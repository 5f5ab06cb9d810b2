use crate::export::{format_hours, ExportDocument};
use crate::model::Employee;
use anyhow::{bail, Context};
use chrono::{NaiveDate, Weekday};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Import d'employés depuis CSV: header
/// `id,display_name[,email][,phone][,weekly_hours][,unavailable_days][,blackout_dates][,active]`
///
/// `unavailable_days` : jours séparés par `;` (`mon;sat`),
/// `blackout_dates` : dates `YYYY-MM-DD` séparées par `;`.
pub fn import_employees_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Employee>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = rec.get(0).context("missing id")?.trim();
        let display = rec.get(1).context("missing display_name")?.trim();
        if id.is_empty() || display.is_empty() {
            bail!("invalid employee row (empty)");
        }
        let mut employee = Employee::new(id, display);
        let field = |idx: usize| rec.get(idx).map(str::trim).filter(|s| !s.is_empty());

        if let Some(email) = field(2) {
            employee.email = email.to_string();
        }
        employee.phone = field(3).map(str::to_string);
        if let Some(hours) = field(4) {
            let hours: u32 = hours
                .parse()
                .with_context(|| format!("invalid weekly_hours for {id}"))?;
            if hours == 0 {
                bail!("weekly_hours must be > 0 for {id}");
            }
            employee.weekly_hours = Some(hours);
        }
        if let Some(days) = field(5) {
            employee.unavailable_days = parse_weekdays(days)
                .with_context(|| format!("invalid unavailable_days for {id}"))?;
        }
        if let Some(dates) = field(6) {
            employee.blackout_dates = parse_dates(dates)
                .with_context(|| format!("invalid blackout_dates for {id}"))?;
        }
        if let Some(flag) = field(7) {
            employee.active =
                parse_bool(flag).with_context(|| format!("invalid active value for {id}"))?;
        }
        out.push(employee);
    }
    Ok(out)
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "oui" => Ok(true),
        "false" | "0" | "no" | "n" | "non" => Ok(false),
        _ => bail!("expected boolean"),
    }
}

fn parse_weekdays(raw: &str) -> anyhow::Result<Vec<Weekday>> {
    raw.split(';')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            chunk
                .parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("invalid weekday: {chunk}"))
        })
        .collect()
}

fn parse_dates(raw: &str) -> anyhow::Result<Vec<NaiveDate>> {
    raw.split(';')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            NaiveDate::parse_from_str(chunk, "%Y-%m-%d")
                .with_context(|| format!("invalid date: {chunk}"))
        })
        .collect()
}

/// Écrit le document en CSV: header `section,day,employee,label,start,end,value,note`.
///
/// `value` vaut les heures pour les sections `shift` et `total`, l'effectif
/// pour `headcount`.
pub fn write_document_csv<W: Write>(writer: W, doc: &ExportDocument) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(writer);
    w.write_record([
        "section", "day", "employee", "label", "start", "end", "value", "note",
    ])?;
    for row in doc.rows() {
        let day = row.day.to_string();
        let start = row.start.to_rfc3339();
        let end = row.end.to_rfc3339();
        let hours = format_hours(row.minutes);
        w.write_record([
            "shift",
            day.as_str(),
            row.employee_name.as_str(),
            row.label.as_deref().unwrap_or(""),
            start.as_str(),
            end.as_str(),
            hours.as_str(),
            row.note.as_deref().unwrap_or(""),
        ])?;
    }
    for total in doc.employee_totals() {
        let hours = format_hours(total.minutes);
        w.write_record([
            "total",
            "",
            total.employee_name.as_str(),
            "",
            "",
            "",
            hours.as_str(),
            "",
        ])?;
    }
    for count in doc.day_headcounts() {
        let day = count.day.to_string();
        let headcount = count.headcount.to_string();
        w.write_record(["headcount", day.as_str(), "", "", "", "", headcount.as_str(), ""])?;
    }
    w.flush()?;
    Ok(())
}

pub fn export_document_csv<P: AsRef<Path>>(path: P, doc: &ExportDocument) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_document_csv(file, doc)
}

/// Export JSON du document (jolie mise en forme)
pub fn export_document_json<P: AsRef<Path>>(path: P, doc: &ExportDocument) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(doc)?;
    fs::write(path, s)?;
    Ok(())
}
