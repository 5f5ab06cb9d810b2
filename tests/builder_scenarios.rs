#![forbid(unsafe_code)]
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use roulement::{
    ConflictKind, Employee, EmployeeId, EngineOptions, InMemoryDirectory, InMemoryRepository,
    Period, RepositoryError, RosterBuilder, RosterError, RosterHeader, RosterId, RosterStatus,
    Shift, ShiftId, ShiftRepository, TimeRange,
};
use std::sync::atomic::{AtomicBool, Ordering};

type Builder = RosterBuilder<InMemoryRepository, InMemoryDirectory>;

fn builder() -> Builder {
    let mut inactive = Employee::new("e9", "Zoé");
    inactive.active = false;
    RosterBuilder::new(
        InMemoryRepository::new(),
        InMemoryDirectory::with_employees([
            Employee::new("e1", "Alice"),
            Employee::new("e2", "bob"),
            inactive,
        ]),
        EngineOptions::default(),
    )
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 6).unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0).unwrap()
}

fn range(day: u32, from: u32, to: u32) -> TimeRange {
    TimeRange::new(at(day, from), at(day, to)).unwrap()
}

fn e(id: &str) -> EmployeeId {
    EmployeeId::new(id)
}

#[test]
fn weekly_scenario_overlap_then_hour_cap() {
    let b = builder();
    let roster = b.create_roster(Period::week(monday())).unwrap();
    let rid = roster.id().clone();

    let first = b.add_shift(&rid, &e("e1"), range(6, 9, 17), None).unwrap();

    let err = b.add_shift(&rid, &e("e1"), range(6, 16, 20), None).unwrap_err();
    match err {
        RosterError::Conflict(ConflictKind::Overlap { conflicting }) => {
            assert_eq!(conflicting, first.id)
        }
        other => panic!("unexpected error: {other:?}"),
    }

    for day in 7..=10 {
        b.add_shift(&rid, &e("e1"), range(day, 9, 17), None).unwrap();
    }
    let snapshot = b.roster(&rid).unwrap();
    assert_eq!(snapshot.totals().minutes_for(&e("e1")), 40 * 60);

    let err = b.add_shift(&rid, &e("e1"), range(11, 9, 10), None).unwrap_err();
    match err {
        RosterError::Conflict(ConflictKind::HourCapExceeded { employee, excess }) => {
            assert_eq!(employee, e("e1"));
            assert_eq!(excess, Duration::hours(1));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // les refus ne laissent aucune trace
    assert_eq!(b.roster(&rid).unwrap().shifts().len(), 5);
}

#[test]
fn finalize_requires_a_shift_and_freezes_the_roster() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();

    assert!(matches!(b.finalize(&rid), Err(RosterError::EmptyRoster(_))));

    let shift = b.add_shift(&rid, &e("e1"), range(6, 9, 17), None).unwrap();
    let finalized = b.finalize(&rid).unwrap();
    assert_eq!(finalized.status(), RosterStatus::Finalized);

    assert!(matches!(
        b.add_shift(&rid, &e("e2"), range(7, 9, 17), None),
        Err(RosterError::InvalidState { operation: "add_shift", .. })
    ));
    assert!(matches!(
        b.update_shift(&rid, &shift.id, range(6, 10, 18)),
        Err(RosterError::InvalidState { .. })
    ));
    assert!(matches!(
        b.remove_shift(&rid, &shift.id),
        Err(RosterError::InvalidState { .. })
    ));
    assert!(matches!(b.finalize(&rid), Err(RosterError::InvalidState { .. })));

    let stored = b.repository().snapshot();
    assert_eq!(stored.rosters[&rid].status, RosterStatus::Finalized);
}

#[test]
fn shifts_outside_the_period_are_rejected() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    let err = b
        .add_shift(&rid, &e("e1"), range(13, 9, 17), None)
        .unwrap_err();
    assert!(matches!(
        err,
        RosterError::Conflict(ConflictKind::OutOfPeriod { .. })
    ));
}

#[test]
fn unknown_and_inactive_employees_are_rejected() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    assert!(matches!(
        b.add_shift(&rid, &e("nobody"), range(6, 9, 17), None),
        Err(RosterError::NotFound { entity: "employee", .. })
    ));
    assert!(matches!(
        b.add_shift(&rid, &e("e9"), range(6, 9, 17), None),
        Err(RosterError::InactiveEmployee(_))
    ));
    assert!(matches!(
        b.add_shift(&RosterId::new("missing"), &e("e1"), range(6, 9, 17), None),
        Err(RosterError::NotFound { entity: "roster", .. })
    ));
}

#[test]
fn update_replaces_atomically_and_excludes_the_old_duration() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    let mut ids = Vec::new();
    for day in 6..=10 {
        ids.push(b.add_shift(&rid, &e("e1"), range(day, 9, 17), None).unwrap().id);
    }

    // 40h déjà posées : raccourcir passe, rallonger dépasse d'une heure
    let shorter = b.update_shift(&rid, &ids[0], range(6, 9, 16)).unwrap();
    assert_eq!(shorter.range, range(6, 9, 16));
    assert!(matches!(
        b.update_shift(&rid, &ids[0], range(6, 8, 17)),
        Err(RosterError::Conflict(ConflictKind::HourCapExceeded { excess, .. })) if excess == Duration::hours(1)
    ));

    // chevauchement avec le shift du mardi : rejet, rien ne bouge
    let err = b
        .update_shift(&rid, &ids[0], TimeRange::new(at(6, 20), at(7, 10)).unwrap())
        .unwrap_err();
    assert!(matches!(err, RosterError::Conflict(ConflictKind::Overlap { .. })));
    let snapshot = b.roster(&rid).unwrap();
    assert_eq!(snapshot.find_shift(&ids[0]).unwrap().range, range(6, 9, 16));
    assert_eq!(snapshot.totals().minutes_for(&e("e1")), 39 * 60);

    assert!(matches!(
        b.update_shift(&rid, &ShiftId::new("ghost"), range(6, 9, 10)),
        Err(RosterError::NotFound { entity: "shift", .. })
    ));
}

#[test]
fn remove_recomputes_totals() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    let a = b.add_shift(&rid, &e("e1"), range(6, 9, 17), None).unwrap();
    b.add_shift(&rid, &e("e2"), range(6, 9, 12), None).unwrap();

    b.remove_shift(&rid, &a.id).unwrap();
    let snapshot = b.roster(&rid).unwrap();
    assert_eq!(snapshot.shifts().len(), 1);
    assert_eq!(snapshot.totals().minutes_for(&e("e1")), 0);
    assert_eq!(snapshot.totals().headcount_per_day[&monday()], 1);

    assert!(matches!(
        b.remove_shift(&rid, &a.id),
        Err(RosterError::NotFound { .. })
    ));
}

#[test]
fn shifts_are_ordered_by_start_then_employee() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    b.add_shift(&rid, &e("e2"), range(7, 9, 17), None).unwrap();
    b.add_shift(&rid, &e("e2"), range(6, 9, 17), None).unwrap();
    b.add_shift(&rid, &e("e1"), range(6, 9, 17), None).unwrap();

    let snapshot = b.roster(&rid).unwrap();
    let order: Vec<_> = snapshot
        .shifts()
        .iter()
        .map(|s| (s.range.start(), s.employee.as_str().to_string()))
        .collect();
    assert_eq!(
        order,
        vec![
            (at(6, 9), "e1".to_string()),
            (at(6, 9), "e2".to_string()),
            (at(7, 9), "e2".to_string()),
        ]
    );
}

#[test]
fn clone_of_finalized_roster_is_an_editable_copy() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    for day in 6..=10 {
        b.add_labeled_shift(
            &rid,
            &e("e1"),
            range(day, 9, 17),
            Some("Jour".into()),
            Some(format!("note {day}")),
        )
        .unwrap();
    }
    b.add_shift(&rid, &e("e2"), range(8, 13, 21), None).unwrap();
    let original = b.finalize(&rid).unwrap();

    assert!(matches!(
        b.clone_as_draft(&b.create_roster(Period::week(monday())).unwrap().id().clone()),
        Err(RosterError::InvalidState { .. })
    ));

    let draft = b.clone_as_draft(&rid).unwrap();
    assert_ne!(draft.id(), original.id());
    assert_eq!(draft.status(), RosterStatus::Draft);
    assert_eq!(draft.period(), original.period());
    assert_eq!(draft.header.cloned_from.as_ref(), Some(&rid));

    let content = |r: &roulement::Roster| -> Vec<_> {
        r.shifts()
            .iter()
            .map(|s| (s.employee.clone(), s.range, s.label.clone(), s.note.clone(), s.status))
            .collect()
    };
    assert_eq!(content(&*draft), content(&*original));
    for s in draft.shifts() {
        assert!(original.find_shift(&s.id).is_none());
        assert_eq!(s.roster, *draft.id());
    }

    // le brouillon ne se compare qu'à ses propres shifts
    let err = b
        .add_shift(draft.id(), &e("e1"), range(11, 9, 10), None)
        .unwrap_err();
    assert!(matches!(
        err,
        RosterError::Conflict(ConflictKind::HourCapExceeded { excess, .. }) if excess == Duration::hours(1)
    ));
    b.add_shift(draft.id(), &e("e2"), range(11, 9, 10), None).unwrap();
    assert_eq!(b.roster(draft.id()).unwrap().shifts().len(), 7);
    assert_eq!(b.roster(&rid).unwrap().shifts().len(), 6);
}

#[test]
fn check_reports_conflicts_once() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    b.add_shift(&rid, &e("e1"), range(6, 9, 17), None).unwrap();
    assert!(b.check(&rid).unwrap().is_empty());

    // données injectées hors du builder : chevauchement
    let mut bad = b.roster(&rid).unwrap().shifts()[0].clone();
    bad.id = ShiftId::new("injected");
    bad.range = range(6, 12, 20);
    b.repository().save_shift(&bad).unwrap();

    let reloaded = RosterBuilder::new(
        clone_repo(b.repository()),
        InMemoryDirectory::with_employees([Employee::new("e1", "Alice")]),
        EngineOptions::default(),
    );
    let conflicts = reloaded.check(&rid).unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind.code(), "overlap");
}

fn clone_repo(repo: &InMemoryRepository) -> InMemoryRepository {
    let copy = InMemoryRepository::new();
    let snapshot = repo.snapshot();
    for header in snapshot.rosters.values() {
        copy.create_roster(header).unwrap();
    }
    for shift in snapshot.shifts.values() {
        copy.save_shift(shift).unwrap();
    }
    copy
}

/// Dépôt en mémoire qu'on peut « débrancher » pour simuler une panne.
struct Flaky {
    inner: InMemoryRepository,
    down: AtomicBool,
}

impl Flaky {
    fn guard(&self) -> Result<(), RepositoryError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("disk gone".into()));
        }
        Ok(())
    }
}

impl ShiftRepository for Flaky {
    fn shifts_for_employee(
        &self,
        employee: &EmployeeId,
        period: &TimeRange,
    ) -> Result<Vec<Shift>, RepositoryError> {
        self.inner.shifts_for_employee(employee, period)
    }
    fn shifts_for_roster(&self, roster: &RosterId) -> Result<Vec<Shift>, RepositoryError> {
        self.inner.shifts_for_roster(roster)
    }
    fn save_shift(&self, shift: &Shift) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.save_shift(shift)
    }
    fn delete_shift(&self, shift: &ShiftId) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.delete_shift(shift)
    }
    fn save_roster_status(
        &self,
        roster: &RosterId,
        status: RosterStatus,
    ) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.save_roster_status(roster, status)
    }
    fn create_roster(&self, header: &RosterHeader) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.create_roster(header)
    }
    fn create_roster_with_shifts(
        &self,
        header: &RosterHeader,
        shifts: &[Shift],
    ) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.create_roster_with_shifts(header, shifts)
    }
    fn delete_roster(&self, roster: &RosterId) -> Result<(), RepositoryError> {
        self.guard()?;
        self.inner.delete_roster(roster)
    }
    fn get_roster(&self, roster: &RosterId) -> Result<Option<RosterHeader>, RepositoryError> {
        self.inner.get_roster(roster)
    }
    fn list_rosters(&self) -> Result<Vec<RosterHeader>, RepositoryError> {
        self.inner.list_rosters()
    }
}

fn flaky_builder() -> RosterBuilder<Flaky, InMemoryDirectory> {
    RosterBuilder::new(
        Flaky {
            inner: InMemoryRepository::new(),
            down: AtomicBool::new(false),
        },
        InMemoryDirectory::with_employees([Employee::new("e1", "Alice")]),
        EngineOptions::default(),
    )
}

#[test]
fn storage_failures_propagate_and_leave_the_snapshot_intact() {
    use roulement::ShiftStatus;

    let b = flaky_builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    let kept = b.add_shift(&rid, &e("e1"), range(6, 9, 17), None).unwrap();
    assert_eq!(kept.status, ShiftStatus::Confirmed);

    b.repository().down.store(true, Ordering::SeqCst);
    assert!(matches!(
        b.add_shift(&rid, &e("e1"), range(7, 9, 17), None),
        Err(RosterError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(matches!(
        b.finalize(&rid),
        Err(RosterError::Repository(RepositoryError::Unavailable(_)))
    ));
    let snapshot = b.roster(&rid).unwrap();
    assert_eq!(snapshot.shifts().len(), 1);
    assert_eq!(snapshot.status(), RosterStatus::Draft);

    b.repository().down.store(false, Ordering::SeqCst);
    b.finalize(&rid).unwrap();
}

#[test]
fn concurrent_writers_never_double_book() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();

    let accepted: usize = std::thread::scope(|scope| {
        let writers: Vec<_> = (0..8u32)
            .map(|i| {
                let b = &b;
                let rid = &rid;
                scope.spawn(move || {
                    let start = at(6, 9) + Duration::minutes(i64::from(i) * 10);
                    let r = TimeRange::new(start, start + Duration::hours(4)).unwrap();
                    b.add_shift(rid, &e("e1"), r, None).is_ok()
                })
            })
            .collect();

        let reader = {
            let b = &b;
            let rid = &rid;
            scope.spawn(move || {
                for _ in 0..200 {
                    let snapshot = b.roster(rid).unwrap();
                    let shifts = snapshot.shifts();
                    for (i, a) in shifts.iter().enumerate() {
                        for c in shifts.iter().skip(i + 1) {
                            assert!(!(a.employee == c.employee && a.range.overlaps(&c.range)));
                        }
                    }
                }
            })
        };
        reader.join().unwrap();
        writers
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(accepted, 1);
    assert_eq!(b.roster(&rid).unwrap().shifts().len(), 1);
}

#[test]
fn month_roster_scales_the_weekly_cap() {
    let b = builder();
    let rid = b
        .create_roster(Period::month(monday()))
        .unwrap()
        .id()
        .clone();
    // 48h sur deux semaines d'octobre : au-delà d'un plafond hebdomadaire, dans
    // celui du mois (5 × 40h)
    for day in [6u32, 7, 8, 9, 10, 13] {
        b.add_shift(&rid, &e("e1"), range(day, 9, 17), None).unwrap();
    }
    assert_eq!(b.roster(&rid).unwrap().totals().minutes_for(&e("e1")), 48 * 60);
}

#[test]
fn failed_clone_leaves_no_partial_draft() {
    let b = flaky_builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    for day in 6..=8 {
        b.add_shift(&rid, &e("e1"), range(day, 9, 17), None).unwrap();
    }
    b.finalize(&rid).unwrap();

    b.repository().down.store(true, Ordering::SeqCst);
    assert!(matches!(
        b.clone_as_draft(&rid),
        Err(RosterError::Repository(RepositoryError::Unavailable(_)))
    ));
    b.repository().down.store(false, Ordering::SeqCst);

    let headers = b.rosters().unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].id, rid);
    assert_eq!(b.repository().inner.snapshot().shifts.len(), 3);

    let draft = b.clone_as_draft(&rid).unwrap();
    assert_eq!(draft.shifts().len(), 3);
    assert_eq!(b.rosters().unwrap().len(), 2);
}

#[test]
fn delete_removes_a_draft_and_its_shifts() {
    let b = builder();
    let keep = b.create_roster(Period::week(monday())).unwrap().id().clone();
    let doomed = b.create_roster(Period::week(monday())).unwrap().id().clone();
    b.add_shift(&keep, &e("e1"), range(6, 9, 17), None).unwrap();
    b.add_shift(&doomed, &e("e1"), range(7, 9, 17), None).unwrap();
    b.add_shift(&doomed, &e("e2"), range(7, 9, 17), None).unwrap();

    b.delete_roster(&doomed).unwrap();

    assert!(matches!(
        b.roster(&doomed),
        Err(RosterError::NotFound { entity: "roster", .. })
    ));
    assert!(matches!(
        b.add_shift(&doomed, &e("e1"), range(8, 9, 17), None),
        Err(RosterError::NotFound { entity: "roster", .. })
    ));
    assert!(matches!(
        b.delete_roster(&doomed),
        Err(RosterError::NotFound { .. })
    ));
    let headers = b.rosters().unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].id, keep);
    let stored = b.repository().snapshot();
    assert_eq!(stored.shifts.len(), 1);
    assert!(stored.shifts.values().all(|s| s.roster == keep));
}

#[test]
fn finalized_rosters_cannot_be_deleted() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    b.add_shift(&rid, &e("e1"), range(6, 9, 17), None).unwrap();
    b.finalize(&rid).unwrap();

    assert!(matches!(
        b.delete_roster(&rid),
        Err(RosterError::InvalidState {
            status: RosterStatus::Finalized,
            ..
        })
    ));
    assert_eq!(b.roster(&rid).unwrap().shifts().len(), 1);
    assert_eq!(b.rosters().unwrap().len(), 1);
}

#[test]
fn ranges_are_truncated_to_the_minute() {
    let b = builder();
    let rid = b.create_roster(Period::week(monday())).unwrap().id().clone();
    let start = at(6, 9);

    // deux shifts de 30 s : ramenés à la minute, ils deviennent vides
    let half_minute = TimeRange::new(start, start + Duration::seconds(30)).unwrap();
    assert!(matches!(
        b.add_shift(&rid, &e("e1"), half_minute, None),
        Err(RosterError::InvalidTimeRange(_))
    ));
    let later = TimeRange::new(
        start + Duration::seconds(30),
        start + Duration::seconds(60),
    )
    .unwrap();
    assert!(matches!(
        b.add_shift(&rid, &e("e1"), later, None),
        Err(RosterError::InvalidTimeRange(_))
    ));
    assert!(b.roster(&rid).unwrap().shifts().is_empty());

    let ragged = TimeRange::new(
        start + Duration::seconds(42),
        at(6, 17) + Duration::seconds(59),
    )
    .unwrap();
    let shift = b.add_shift(&rid, &e("e1"), ragged, None).unwrap();
    assert_eq!(shift.range, range(6, 9, 17));
    let roster = b.roster(&rid).unwrap();
    assert_eq!(roster.totals().minutes_for(&e("e1")), 8 * 60);

    let blip = TimeRange::new(at(7, 10), at(7, 10) + Duration::seconds(20)).unwrap();
    assert!(matches!(
        b.update_shift(&rid, &shift.id, blip),
        Err(RosterError::InvalidTimeRange(_))
    ));
    let kept = b.roster(&rid).unwrap();
    assert_eq!(kept.find_shift(&shift.id).unwrap().range, range(6, 9, 17));
}
