use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use rollcall_core::db::open_db_in_memory;
use rollcall_core::repo::participation_repo::{NewParticipation, ParticipationRepository};
use rollcall_core::{
    AttendanceSummary, CoreConfig, ErrorKind, EventId, EventService, IdentityService,
    LedgerService, ParticipationRecord, ParticipationStatus, PersonId, RepoError, RepoResult,
    SqliteEventRepository, SqliteParticipationRepository, SqlitePersonRepository,
    SqliteVenueRepository, VenueService,
};
use rusqlite::Connection;

type Ledger<'conn> = LedgerService<
    SqliteEventRepository<'conn>,
    SqliteParticipationRepository<'conn>,
    SqlitePersonRepository<'conn>,
>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn ledger_with<'c>(conn: &'c Connection, config: &CoreConfig) -> Ledger<'c> {
    LedgerService::new(
        SqliteEventRepository::try_new(conn).unwrap(),
        SqliteParticipationRepository::try_new(conn).unwrap(),
        SqlitePersonRepository::try_new(conn).unwrap(),
        config.fallback_policy().unwrap(),
    )
}

fn ledger(conn: &Connection) -> Ledger<'_> {
    ledger_with(conn, &CoreConfig::default())
}

fn register(conn: &Connection, name: &str) -> PersonId {
    IdentityService::new(SqlitePersonRepository::try_new(conn).unwrap())
        .resolve_or_create(name, None, None)
        .unwrap()
        .person
        .id
}

fn noon(year: i32, month: u32, day: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap()
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn first_record_provisions_venue_and_event() {
    let conn = setup();
    let person_id = register(&conn, "Maria Silva");
    let service = ledger(&conn);

    let entry = service
        .record_participation_at(person_id, ParticipationStatus::Present, noon(2024, 5, 12))
        .unwrap();

    assert!(entry.provisioned);
    assert!(entry.venue_created);
    assert_eq!(entry.active.venue.name, "Main Venue");
    assert_eq!(entry.active.event.name, "12/05/2024");
    assert_eq!(
        entry.active.event.date,
        NaiveDate::from_ymd_opt(2024, 5, 12).unwrap()
    );
    assert!(entry.active.event.is_active);
    assert_eq!(entry.record.event_id, entry.active.event.id);
    assert_eq!(entry.record.timestamp, noon(2024, 5, 12).timestamp_millis());
    assert!(entry.message.contains("present"));

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM venues;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM events;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM participations;"), 1);
}

#[test]
fn provisioning_reuses_first_venue_and_configured_names() {
    let conn = setup();
    let venues = VenueService::new(SqliteVenueRepository::try_new(&conn).unwrap());
    let first = venues.create("Chapel").unwrap();
    venues.create("Annex").unwrap();
    let person_id = register(&conn, "Maria Silva");

    let config =
        CoreConfig::from_toml_str("fallback_event_name_format = \"Service %Y-%m-%d\"").unwrap();
    let entry = ledger_with(&conn, &config)
        .record_participation_at(person_id, ParticipationStatus::Absent, noon(2024, 1, 7))
        .unwrap();

    assert!(entry.provisioned);
    assert!(!entry.venue_created);
    assert_eq!(entry.active.venue.id, first.id);
    assert_eq!(entry.active.event.name, "Service 2024-01-07");
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM venues;"), 2);
}

#[test]
fn later_records_use_the_existing_active_event() {
    let conn = setup();
    let person_id = register(&conn, "Maria Silva");
    let service = ledger(&conn);

    let first = service
        .record_participation_at(person_id, ParticipationStatus::Present, noon(2024, 5, 12))
        .unwrap();
    let second = service
        .record_participation_at(person_id, ParticipationStatus::Present, noon(2024, 5, 13))
        .unwrap();

    assert!(!second.provisioned);
    assert!(!second.venue_created);
    assert_eq!(second.active.event.id, first.active.event.id);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM events;"), 1);
}

#[test]
fn records_go_to_the_explicitly_activated_event() {
    let conn = setup();
    let venue_id = VenueService::new(SqliteVenueRepository::try_new(&conn).unwrap())
        .create("Hall")
        .unwrap()
        .id;
    let events = EventService::new(SqliteEventRepository::try_new(&conn).unwrap());
    let date = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
    let active = events.create_and_activate(venue_id, date, "Conference").unwrap();
    let person_id = register(&conn, "Maria Silva");

    let entry = ledger(&conn)
        .record_participation(person_id, ParticipationStatus::Present)
        .unwrap();
    assert!(!entry.provisioned);
    assert_eq!(entry.record.event_id, active.event.id);
}

#[test]
fn repeated_calls_append_repeated_rows() {
    let conn = setup();
    let person_id = register(&conn, "Maria Silva");
    let service = ledger(&conn);
    let at = noon(2024, 5, 12);

    let first = service
        .record_participation_at(person_id, ParticipationStatus::Present, at)
        .unwrap();
    let second = service
        .record_participation_at(person_id, ParticipationStatus::Present, at)
        .unwrap();

    assert_ne!(first.record.id, second.record.id);
    let roster = service.event_roster(first.active.event.id).unwrap();
    assert_eq!(roster.len(), 2);
    assert_eq!(roster[0].id, first.record.id);
    assert_eq!(roster[1].id, second.record.id);
}

#[test]
fn timestamps_never_go_backwards_within_an_event() {
    let conn = setup();
    let person_id = register(&conn, "Maria Silva");
    let service = ledger(&conn);
    let at = noon(2024, 5, 12);

    let first = service
        .record_participation_at(person_id, ParticipationStatus::Present, at)
        .unwrap();
    let skewed = service
        .record_participation_at(
            person_id,
            ParticipationStatus::Absent,
            at - Duration::minutes(5),
        )
        .unwrap();

    assert_eq!(skewed.record.timestamp, first.record.timestamp);
    let history = service.person_history(person_id).unwrap();
    let ids: Vec<i64> = history.iter().map(|record| record.id).collect();
    assert_eq!(ids, vec![first.record.id, skewed.record.id]);
}

#[test]
fn summary_matches_ledger_rows_and_cached_counters() {
    let conn = setup();
    let person_id = register(&conn, "Maria Silva");
    let other_id = register(&conn, "Joao Pereira");
    let service = ledger(&conn);
    let at = noon(2024, 5, 12);

    for status in [
        ParticipationStatus::Present,
        ParticipationStatus::Present,
        ParticipationStatus::Absent,
        ParticipationStatus::Present,
    ] {
        service
            .record_participation_at(person_id, status, at)
            .unwrap();
    }
    service
        .record_participation_at(other_id, ParticipationStatus::Absent, at)
        .unwrap();

    let summary = service.attendance_summary(person_id).unwrap();
    assert_eq!(summary.present, 3);
    assert_eq!(summary.absent, 1);
    assert_eq!(summary.total(), 4);
    assert_eq!(service.person_history(person_id).unwrap().len(), 4);

    let person = IdentityService::new(SqlitePersonRepository::try_new(&conn).unwrap())
        .get_person(person_id)
        .unwrap();
    assert_eq!(person.participation_count, summary.present);
    assert_eq!(person.absence_count, summary.absent);
}

#[test]
fn non_positive_person_id_is_invalid_argument() {
    let conn = setup();
    let service = ledger(&conn);

    for person_id in [0, -3] {
        let err = service
            .record_participation(person_id, ParticipationStatus::Present)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM events;"), 0);
}

#[test]
fn missing_person_is_rejected_before_provisioning() {
    let conn = setup();
    let service = ledger(&conn);

    let err = service
        .record_participation(4_242, ParticipationStatus::Present)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM venues;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM events;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM participations;"), 0);
}

#[test]
fn roster_and_summary_report_unknown_ids() {
    let conn = setup();
    let service = ledger(&conn);

    assert_eq!(
        service.event_roster(99).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        service.event_roster(0).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        service.attendance_summary(99).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn event_summary_counts_rows_for_one_event() {
    let conn = setup();
    let maria = register(&conn, "Maria Silva");
    let joao = register(&conn, "Joao Pereira");
    let service = ledger(&conn);
    let at = noon(2024, 5, 12);

    let first = service
        .record_participation_at(maria, ParticipationStatus::Present, at)
        .unwrap();
    service
        .record_participation_at(joao, ParticipationStatus::Absent, at)
        .unwrap();
    service
        .record_participation_at(joao, ParticipationStatus::Present, at)
        .unwrap();

    let summary = service.event_summary(first.active.event.id).unwrap();
    assert_eq!(summary, AttendanceSummary { present: 2, absent: 1 });
    assert_eq!(
        service.event_summary(404).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

/// Ledger storage whose appends always fail.
struct BrokenLedger;

impl ParticipationRepository for BrokenLedger {
    fn append(&self, _entry: &NewParticipation) -> RepoResult<ParticipationRecord> {
        Err(RepoError::InvalidData("disk full".to_string()))
    }

    fn list_for_person(&self, _person_id: PersonId) -> RepoResult<Vec<ParticipationRecord>> {
        Ok(Vec::new())
    }

    fn list_for_event(&self, _event_id: EventId) -> RepoResult<Vec<ParticipationRecord>> {
        Ok(Vec::new())
    }

    fn summary_for_person(&self, _person_id: PersonId) -> RepoResult<AttendanceSummary> {
        Ok(AttendanceSummary::default())
    }

    fn summary_for_event(&self, _event_id: EventId) -> RepoResult<AttendanceSummary> {
        Ok(AttendanceSummary::default())
    }
}

fn broken_ledger(conn: &Connection) -> LedgerService<
    SqliteEventRepository<'_>,
    BrokenLedger,
    SqlitePersonRepository<'_>,
> {
    LedgerService::new(
        SqliteEventRepository::try_new(conn).unwrap(),
        BrokenLedger,
        SqlitePersonRepository::try_new(conn).unwrap(),
        CoreConfig::default().fallback_policy().unwrap(),
    )
}

#[test]
fn failed_append_removes_provisioned_venue_and_event() {
    let conn = setup();
    let person_id = register(&conn, "Maria Silva");

    let err = broken_ledger(&conn)
        .record_participation(person_id, ParticipationStatus::Present)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM venues;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM events;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM events WHERE is_active = 1;"), 0);
}

#[test]
fn failed_append_keeps_existing_venue_and_active_event() {
    let conn = setup();
    let venue_id = VenueService::new(SqliteVenueRepository::try_new(&conn).unwrap())
        .create("Chapel")
        .unwrap()
        .id;
    let person_id = register(&conn, "Maria Silva");

    broken_ledger(&conn)
        .record_participation(person_id, ParticipationStatus::Present)
        .unwrap_err();
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM venues;"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM events;"), 0);

    let events = EventService::new(SqliteEventRepository::try_new(&conn).unwrap());
    let date = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
    let active = events.create_and_activate(venue_id, date, "Vigil").unwrap();

    broken_ledger(&conn)
        .record_participation(person_id, ParticipationStatus::Absent)
        .unwrap_err();
    let still_active = events.get_active().unwrap().unwrap();
    assert_eq!(still_active.event.id, active.event.id);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM events;"), 1);
}
