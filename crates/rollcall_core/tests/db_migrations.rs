use rollcall_core::db::migrations::latest_version;
use rollcall_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

fn user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn columns(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

fn seed_venue_and_event(conn: &Connection, active: bool) {
    conn.execute(
        "INSERT INTO venues (name, normalized_name) VALUES ('Hall', 'hall');",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO events (venue_id, date, name, is_active) VALUES (1, '2024-05-12', 'A', ?1);",
        [i64::from(active)],
    )
    .unwrap();
}

#[test]
fn fresh_database_has_attendance_tables() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(user_version(&conn), latest_version());

    assert_eq!(
        columns(&conn, "venues"),
        vec!["id", "name", "normalized_name", "created_at"]
    );
    assert_eq!(
        columns(&conn, "events"),
        vec!["id", "venue_id", "date", "name", "is_active", "created_at"]
    );
    let persons = columns(&conn, "persons");
    for column in [
        "normalized_full_name",
        "participation_count",
        "absence_count",
        "birthday_day_month",
        "email",
    ] {
        assert!(persons.iter().any(|name| name == column), "persons.{column}");
    }
    assert_eq!(
        columns(&conn, "participations"),
        vec!["id", "person_id", "event_id", "timestamp", "status"]
    );
}

#[test]
fn reopening_a_file_keeps_rows_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");

    let conn = open_db(&path).unwrap();
    seed_venue_and_event(&conn, true);
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(user_version(&reopened), latest_version());
    let active: i64 = reopened
        .query_row("SELECT COUNT(*) FROM events WHERE is_active = 1;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(active, 1);
}

#[test]
fn database_from_a_newer_build_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 42);
            assert_eq!(supported, latest_version());
        }
        other => panic!("expected SchemaTooNew, got {other}"),
    }
}

#[test]
fn second_active_event_row_is_rejected_by_storage() {
    let conn = open_db_in_memory().unwrap();
    seed_venue_and_event(&conn, true);

    let second = conn.execute(
        "INSERT INTO events (venue_id, date, name, is_active) VALUES (1, '2024-05-13', 'B', 1);",
        [],
    );
    assert!(second.is_err());

    conn.execute(
        "INSERT INTO events (venue_id, date, name, is_active) VALUES (1, '2024-05-13', 'B', 0);",
        [],
    )
    .unwrap();
}

#[test]
fn referenced_rows_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    seed_venue_and_event(&conn, false);
    conn.execute(
        "INSERT INTO persons (full_name, normalized_full_name) VALUES ('Ana Souza', 'ana souza');",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO participations (person_id, event_id, timestamp, status)
         VALUES (1, 1, 0, 'present');",
        [],
    )
    .unwrap();

    assert!(conn.execute("DELETE FROM venues WHERE id = 1;", []).is_err());
    assert!(conn.execute("DELETE FROM events WHERE id = 1;", []).is_err());
    assert!(conn.execute("DELETE FROM persons WHERE id = 1;", []).is_err());
}

#[test]
fn unknown_participation_status_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    seed_venue_and_event(&conn, false);
    conn.execute(
        "INSERT INTO persons (full_name, normalized_full_name) VALUES ('Ana Souza', 'ana souza');",
        [],
    )
    .unwrap();

    let late = conn.execute(
        "INSERT INTO participations (person_id, event_id, timestamp, status)
         VALUES (1, 1, 0, 'late');",
        [],
    );
    assert!(late.is_err());
}
