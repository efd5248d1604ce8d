use chrono::NaiveDate;
use rollcall_core::db::{open_db, open_db_in_memory};
use rollcall_core::{
    Activation, ErrorKind, EventService, SqliteEventRepository, SqliteVenueRepository,
    VenueService,
};
use rusqlite::Connection;
use std::thread;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn event_service(conn: &Connection) -> EventService<SqliteEventRepository<'_>> {
    EventService::new(SqliteEventRepository::try_new(conn).unwrap())
}

fn create_venue(conn: &Connection, name: &str) -> i64 {
    VenueService::new(SqliteVenueRepository::try_new(conn).unwrap())
        .create(name)
        .unwrap()
        .id
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn active_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM events WHERE is_active = 1;", [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn no_event_is_active_on_a_fresh_database() {
    let conn = setup();
    assert!(event_service(&conn).get_active().unwrap().is_none());
}

#[test]
fn set_active_switches_the_single_active_event() {
    let conn = setup();
    let service = event_service(&conn);
    let venue_id = create_venue(&conn, "Hall");
    let first = service.create_event(venue_id, day(5), "First").unwrap();
    let second = service.create_event(venue_id, day(12), "Second").unwrap();
    assert!(!first.is_active);

    let activation = service.set_active(first.id).unwrap();
    assert_eq!(
        activation,
        Activation::Switched {
            previous: None,
            current: first.id
        }
    );

    let activation = service.set_active(second.id).unwrap();
    assert_eq!(
        activation,
        Activation::Switched {
            previous: Some(first.id),
            current: second.id
        }
    );
    assert_eq!(active_count(&conn), 1);

    let active = service.get_active().unwrap().unwrap();
    assert_eq!(active.event.id, second.id);
    assert_eq!(active.venue.name, "Hall");
    assert!(!service.get_event(first.id).unwrap().is_active);
}

#[test]
fn activating_the_active_event_changes_nothing() {
    let conn = setup();
    let service = event_service(&conn);
    let venue_id = create_venue(&conn, "Hall");
    let event = service.create_event(venue_id, day(5), "Only").unwrap();
    service.set_active(event.id).unwrap();

    let again = service.set_active(event.id).unwrap();
    assert_eq!(again, Activation::Unchanged { current: event.id });
    assert_eq!(active_count(&conn), 1);
}

#[test]
fn unknown_id_leaves_previous_event_active() {
    let conn = setup();
    let service = event_service(&conn);
    let venue_id = create_venue(&conn, "Hall");
    let event = service.create_event(venue_id, day(5), "Kept").unwrap();
    service.set_active(event.id).unwrap();

    let err = service.set_active(98_765).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let active = service.get_active().unwrap().unwrap();
    assert_eq!(active.event.id, event.id);
    assert_eq!(active_count(&conn), 1);
}

#[test]
fn create_and_activate_replaces_current_event() {
    let conn = setup();
    let service = event_service(&conn);
    let venue_id = create_venue(&conn, "Hall");
    let old = service.create_event(venue_id, day(5), "Old").unwrap();
    service.set_active(old.id).unwrap();

    let created = service.create_and_activate(venue_id, day(12), "New").unwrap();
    assert_eq!(created.event.name, "New");
    assert!(created.event.is_active);
    assert_eq!(active_count(&conn), 1);
    assert!(!service.get_event(old.id).unwrap().is_active);
}

#[test]
fn create_event_validates_before_writing() {
    let conn = setup();
    let service = event_service(&conn);
    let venue_id = create_venue(&conn, "Hall");

    let blank = service.create_event(venue_id, day(5), "   ").unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::Validation);

    let long = service
        .create_event(venue_id, day(5), &"n".repeat(101))
        .unwrap_err();
    assert_eq!(long.kind(), ErrorKind::Validation);

    let missing_venue = service.create_event(4_040, day(5), "Lost").unwrap_err();
    assert_eq!(missing_venue.kind(), ErrorKind::NotFound);

    assert!(service.list_events(None).unwrap().is_empty());
}

#[test]
fn deactivate_clears_the_active_flag() {
    let conn = setup();
    let service = event_service(&conn);
    let venue_id = create_venue(&conn, "Hall");
    let event = service.create_and_activate(venue_id, day(5), "Open").unwrap();

    assert_eq!(service.deactivate().unwrap(), Some(event.event.id));
    assert!(service.get_active().unwrap().is_none());
    assert_eq!(service.deactivate().unwrap(), None);
}

#[test]
fn list_events_filters_by_venue() {
    let conn = setup();
    let service = event_service(&conn);
    let hall = create_venue(&conn, "Hall");
    let chapel = create_venue(&conn, "Chapel");
    service.create_event(hall, day(5), "Hall one").unwrap();
    service.create_event(hall, day(12), "Hall two").unwrap();
    service.create_event(chapel, day(5), "Chapel one").unwrap();

    assert_eq!(service.list_events(None).unwrap().len(), 3);
    let hall_events = service.list_events(Some(hall)).unwrap();
    assert_eq!(hall_events.len(), 2);
    assert!(hall_events.iter().all(|event| event.venue_id == hall));
}

#[test]
fn concurrent_activations_keep_one_active_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollcall.db");

    let conn = open_db(&path).unwrap();
    let venue_id = create_venue(&conn, "Hall");
    let service = event_service(&conn);
    let ids: Vec<i64> = (1..=4)
        .map(|d| service.create_event(venue_id, day(d), &format!("Day {d}")).unwrap().id)
        .collect();
    drop(service);
    drop(conn);

    let handles: Vec<_> = ids
        .iter()
        .copied()
        .map(|id| {
            let path = path.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = event_service(&conn);
                for _ in 0..10 {
                    service.set_active(id).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(active_count(&conn), 1);
    let active = event_service(&conn).get_active().unwrap().unwrap();
    assert!(ids.contains(&active.event.id));
}
