//! Participation ledger repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Append ledger rows and keep the person counter cache in step.
//! - Derive attendance aggregates by counting rows.
//!
//! # Invariants
//! - Rows are only ever inserted; there is no update or delete API.
//! - Append and counter bump commit together or not at all.
//! - Within one person+event pair, timestamps never decrease, so listing by
//!   `timestamp ASC, id ASC` is insertion order.

use crate::model::event::EventId;
use crate::model::participation::{
    AttendanceSummary, ParticipationRecord, ParticipationStatus,
};
use crate::model::person::PersonId;
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const PARTICIPATION_SELECT_SQL: &str =
    "SELECT id, person_id, event_id, timestamp, status FROM participations";

/// Input for appending one ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewParticipation {
    pub person_id: PersonId,
    pub event_id: EventId,
    /// Unix epoch milliseconds. Raised to the last stamp of the same
    /// person+event pair when the clock is behind it.
    pub timestamp: i64,
    pub status: ParticipationStatus,
}

/// Repository interface for the participation ledger.
pub trait ParticipationRepository {
    /// Appends one row. `NotFound` when the person or event is missing.
    fn append(&self, entry: &NewParticipation) -> RepoResult<ParticipationRecord>;
    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<ParticipationRecord>>;
    fn list_for_event(&self, event_id: EventId) -> RepoResult<Vec<ParticipationRecord>>;
    fn summary_for_person(&self, person_id: PersonId) -> RepoResult<AttendanceSummary>;
    fn summary_for_event(&self, event_id: EventId) -> RepoResult<AttendanceSummary>;
}

/// SQLite-backed participation ledger.
pub struct SqliteParticipationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParticipationRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ParticipationRepository for SqliteParticipationRepository<'_> {
    fn append(&self, entry: &NewParticipation) -> RepoResult<ParticipationRecord> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "persons", entry.person_id)? {
            return Err(RepoError::NotFound {
                entity: "person",
                id: entry.person_id,
            });
        }
        if !row_exists(&tx, "events", entry.event_id)? {
            return Err(RepoError::NotFound {
                entity: "event",
                id: entry.event_id,
            });
        }

        // Wall clocks can step backwards; never stamp a row before the
        // previous one for the same person and event.
        let last_timestamp: Option<i64> = tx.query_row(
            "SELECT MAX(timestamp) FROM participations WHERE person_id = ?1 AND event_id = ?2;",
            params![entry.person_id, entry.event_id],
            |row| row.get(0),
        )?;
        let timestamp = last_timestamp.map_or(entry.timestamp, |last| last.max(entry.timestamp));

        tx.execute(
            "INSERT INTO participations (person_id, event_id, timestamp, status)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                entry.person_id,
                entry.event_id,
                timestamp,
                entry.status.as_str(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        let counter_sql = match entry.status {
            ParticipationStatus::Present => {
                "UPDATE persons SET participation_count = participation_count + 1 WHERE id = ?1;"
            }
            ParticipationStatus::Absent => {
                "UPDATE persons SET absence_count = absence_count + 1 WHERE id = ?1;"
            }
        };
        tx.execute(counter_sql, [entry.person_id])?;
        tx.commit()?;

        Ok(ParticipationRecord {
            id,
            person_id: entry.person_id,
            event_id: entry.event_id,
            timestamp,
            status: entry.status,
        })
    }

    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<ParticipationRecord>> {
        list_where(self.conn, "person_id", person_id)
    }

    fn list_for_event(&self, event_id: EventId) -> RepoResult<Vec<ParticipationRecord>> {
        list_where(self.conn, "event_id", event_id)
    }

    fn summary_for_person(&self, person_id: PersonId) -> RepoResult<AttendanceSummary> {
        summary_where(self.conn, "person_id", person_id)
    }

    fn summary_for_event(&self, event_id: EventId) -> RepoResult<AttendanceSummary> {
        summary_where(self.conn, "event_id", event_id)
    }
}

fn row_exists(conn: &Connection, table: &'static str, id: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn list_where(
    conn: &Connection,
    column: &'static str,
    id: i64,
) -> RepoResult<Vec<ParticipationRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{PARTICIPATION_SELECT_SQL} WHERE {column} = ?1 ORDER BY timestamp ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([id])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(parse_participation_row(row)?);
    }
    Ok(records)
}

fn summary_where(
    conn: &Connection,
    column: &'static str,
    id: i64,
) -> RepoResult<AttendanceSummary> {
    conn.query_row(
        &format!(
            "SELECT
                COALESCE(SUM(CASE WHEN status = 'present' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'absent' THEN 1 ELSE 0 END), 0)
             FROM participations
             WHERE {column} = ?1;"
        ),
        [id],
        |row| {
            Ok(AttendanceSummary {
                present: row.get(0)?,
                absent: row.get(1)?,
            })
        },
    )
    .map_err(Into::into)
}

fn parse_participation_row(row: &Row<'_>) -> RepoResult<ParticipationRecord> {
    let status_text: String = row.get("status")?;
    let status = ParticipationStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in participations.status"
        ))
    })?;

    Ok(ParticipationRecord {
        id: row.get("id")?,
        person_id: row.get("person_id")?,
        event_id: row.get("event_id")?,
        timestamp: row.get("timestamp")?,
        status,
    })
}
