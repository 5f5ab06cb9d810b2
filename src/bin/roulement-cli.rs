#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use roulement::{
    export::{format_hours, ExportProjector},
    registry::EmployeeDirectory,
    io, load_options,
    period::{shift_range, Period, PeriodKind},
    EmployeeId, EngineOptions, InMemoryDirectory, JsonRepository, RosterBuilder, RosterId, ShiftId,
    TimeRange,
};
use std::path::Path;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planning d'équipes (stockage fichier JSON)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du dépôt (rosters + shifts)
    #[arg(long, global = true, default_value = "roster-store.json")]
    store: String,

    /// CSV des employés (registre en lecture seule)
    #[arg(long, global = true, default_value = "employees.csv")]
    employees: String,

    /// Options JSON du moteur (optionnel)
    #[arg(long, global = true)]
    options: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Créer un roster brouillon couvrant la période qui contient `start`
    NewRoster {
        /// YYYY-MM-DD
        #[arg(long)]
        start: String,
        /// day | week | month (défaut : options)
        #[arg(long)]
        kind: Option<PeriodKind>,
    },

    /// Ajouter un shift (RFC3339, ou --date avec --from/--to en HH:MM)
    AddShift {
        #[arg(long)]
        roster: String,
        #[arg(long)]
        employee: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Déplacer un shift
    UpdateShift {
        #[arg(long)]
        roster: String,
        #[arg(long)]
        shift: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },

    /// Supprimer un shift d'un roster brouillon
    RemoveShift {
        #[arg(long)]
        roster: String,
        #[arg(long)]
        shift: String,
    },

    /// Supprimer un roster brouillon et ses shifts
    DeleteRoster {
        #[arg(long)]
        roster: String,
    },

    /// Finaliser un roster (irréversible)
    Finalize {
        #[arg(long)]
        roster: String,
    },

    /// Cloner un roster finalisé en nouveau brouillon
    Clone {
        #[arg(long)]
        roster: String,
    },

    /// Lister les rosters, ou les shifts d'un roster
    List {
        #[arg(long)]
        roster: Option<String>,
    },

    /// Lister le registre des employés
    Employees,

    /// Vérifier les conflits d'un roster
    Check {
        #[arg(long)]
        roster: String,
        /// Export CSV des conflits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Exporter un roster finalisé
    Export {
        #[arg(long)]
        roster: String,
        #[arg(long)]
        csv: Option<String>,
        #[arg(long)]
        json: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let opts = match &cli.options {
        Some(path) => load_options(path)?,
        None => EngineOptions::default(),
    };
    let directory = if Path::new(&cli.employees).exists() {
        InMemoryDirectory::with_employees(io::import_employees_csv(&cli.employees)?)
    } else {
        InMemoryDirectory::new()
    };
    let repo = JsonRepository::open(&cli.store)?;
    let builder = RosterBuilder::new(repo, directory, opts);

    let code = match cli.cmd {
        Commands::NewRoster { start, kind } => {
            let date = parse_date(&start)?;
            let kind = kind.unwrap_or(builder.options().period_kind);
            let roster = builder.create_roster(Period::containing(kind, date))?;
            println!("{}", roster.id());
            0
        }
        Commands::AddShift {
            roster,
            employee,
            start,
            end,
            date,
            from,
            to,
            label,
            note,
        } => {
            let range = parse_range(start, end, date, from, to)?;
            let shift = builder.add_labeled_shift(
                &RosterId::new(roster),
                &EmployeeId::new(employee),
                range,
                label,
                note,
            )?;
            println!("{}", shift.id);
            0
        }
        Commands::UpdateShift {
            roster,
            shift,
            start,
            end,
            date,
            from,
            to,
        } => {
            let range = parse_range(start, end, date, from, to)?;
            let shift = builder.update_shift(&RosterId::new(roster), &ShiftId::new(shift), range)?;
            println!("{} | {}", shift.id, shift.range);
            0
        }
        Commands::RemoveShift { roster, shift } => {
            builder.remove_shift(&RosterId::new(roster), &ShiftId::new(shift))?;
            0
        }
        Commands::DeleteRoster { roster } => {
            builder.delete_roster(&RosterId::new(roster))?;
            0
        }
        Commands::Finalize { roster } => {
            let roster = builder.finalize(&RosterId::new(roster))?;
            println!("{} finalized ({} shift(s))", roster.id(), roster.shifts().len());
            0
        }
        Commands::Clone { roster } => {
            let draft = builder.clone_as_draft(&RosterId::new(roster))?;
            println!("{}", draft.id());
            0
        }
        Commands::List { roster: None } => {
            for header in builder.rosters()? {
                println!(
                    "{} | {} | {}",
                    header.id,
                    header.period,
                    header.status
                );
            }
            0
        }
        Commands::List {
            roster: Some(roster),
        } => {
            let roster = builder.roster(&RosterId::new(roster))?;
            // impression compacte
            for s in roster.shifts() {
                println!(
                    "{} | {} → {} | {} | {}",
                    s.id,
                    s.range.start().to_rfc3339(),
                    s.range.end().to_rfc3339(),
                    s.employee,
                    s.label.as_deref().unwrap_or("-")
                );
            }
            for (employee, minutes) in &roster.totals().minutes_per_employee {
                println!("total {} {}h", employee, format_hours(*minutes));
            }
            0
        }
        Commands::Employees => {
            for e in builder.directory().employees() {
                let weekly = e
                    .weekly_hours
                    .unwrap_or(builder.options().default_weekly_hours);
                println!(
                    "{} | {} | {}h/sem | {}",
                    e.id,
                    e.display_name,
                    weekly,
                    if e.active { "actif" } else { "inactif" }
                );
            }
            0
        }
        Commands::Check { roster, report } => {
            let conflicts = builder.check(&RosterId::new(roster))?;
            if conflicts.is_empty() {
                println!("OK: no conflicts");
                0
            } else {
                eprintln!("Found {} conflict(s)", conflicts.len());
                for c in &conflicts {
                    eprintln!("{} {}: {}", c.employee, c.shift, c.kind);
                }
                if let Some(path) = report {
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["employee_id", "shift_id", "kind", "detail"])?;
                    for c in &conflicts {
                        w.write_record([
                            c.employee.as_str(),
                            c.shift.as_str(),
                            c.kind.code(),
                            c.kind.to_string().as_str(),
                        ])?;
                    }
                    w.flush()?;
                }
                // Code 2 = WARNING/INCOMPLETE
                2
            }
        }
        Commands::Export { roster, csv, json } => {
            let roster = builder.roster(&RosterId::new(roster))?;
            let projector = ExportProjector::new(builder.directory(), builder.options());
            let doc = projector.project(&roster)?;
            if let Some(path) = csv {
                io::export_document_csv(path, &doc)?;
            }
            if let Some(path) = json {
                io::export_document_json(path, &doc)?;
            }
            println!(
                "{} | {} row(s) | {} employee(s)",
                doc.header().period,
                doc.rows().len(),
                doc.employee_totals().len()
            );
            0
        }
    };

    std::process::exit(code);
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .with_context(|| format!("invalid time: {raw}"))
}

fn parse_range(
    start: Option<String>,
    end: Option<String>,
    date: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<TimeRange> {
    match (start, end, date, from, to) {
        (Some(start), Some(end), None, None, None) => {
            let start: DateTime<Utc> = start.parse().context("start RFC3339")?;
            let end: DateTime<Utc> = end.parse().context("end RFC3339")?;
            Ok(TimeRange::new(start, end)?)
        }
        (None, None, Some(date), Some(from), Some(to)) => {
            Ok(shift_range(parse_date(&date)?, parse_time(&from)?, parse_time(&to)?))
        }
        _ => bail!("expected either --start/--end or --date/--from/--to"),
    }
}
