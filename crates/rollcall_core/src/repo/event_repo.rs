//! Event repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist events and own the active-flag transitions.
//! - Provision a fallback venue/event pair when nothing is active.
//!
//! # Invariants
//! - Every write touching `is_active` runs inside one `IMMEDIATE`
//!   transaction, so readers never observe two active events.
//! - A transition whose target does not exist mutates nothing.
//! - `venue_id` is written once, at insert.

use crate::model::event::{Activation, ActiveEvent, Event, EventId, NewEvent};
use crate::model::venue::{ValidVenueName, Venue, VenueId};
use crate::repo::venue_repo::{first_venue, insert_venue, load_venue};
use crate::repo::{bool_to_int, ensure_schema_ready, int_to_bool, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const EVENT_SELECT_SQL: &str = "SELECT id, venue_id, date, name, is_active FROM events";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Input for provisioning an active event when none exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEvent {
    /// Venue created only when the registry is empty.
    pub venue: ValidVenueName,
    pub date: NaiveDate,
    pub event_name: String,
}

/// Outcome of `provision_active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedEvent {
    pub active: ActiveEvent,
    /// `false` when an event was already active and nothing was written.
    pub event_created: bool,
    pub venue_created: bool,
}

/// Repository interface for event operations.
pub trait EventRepository {
    /// Inserts an inactive event. Fails with `NotFound` for unknown venues.
    fn create_event(&self, event: &NewEvent) -> RepoResult<Event>;
    /// Inserts an event and makes it the active one, atomically.
    fn create_active_event(&self, event: &NewEvent) -> RepoResult<Activation>;
    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    fn list_events(&self, venue_id: Option<VenueId>) -> RepoResult<Vec<Event>>;
    fn get_active(&self) -> RepoResult<Option<ActiveEvent>>;
    /// Swaps the active flag to `id`. Fails with `NotFound` for unknown ids.
    fn activate(&self, id: EventId) -> RepoResult<Activation>;
    /// Clears the active flag. Returns the previously active id.
    fn deactivate_all(&self) -> RepoResult<Option<EventId>>;
    /// Returns the active event, creating venue/event rows first if needed.
    fn provision_active(&self, fallback: &FallbackEvent) -> RepoResult<ProvisionedEvent>;
    /// Undoes a `provision_active` that created rows: removes the event and,
    /// when it was created too, the venue. Rows that gained references in
    /// the meantime are left alone.
    fn discard_provisioned(&self, provisioned: &ProvisionedEvent) -> RepoResult<()>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&self, event: &NewEvent) -> RepoResult<Event> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let created = insert_event(&tx, event, false)?;
        tx.commit()?;
        Ok(created)
    }

    fn create_active_event(&self, event: &NewEvent) -> RepoResult<Activation> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let previous = clear_active(&tx)?;
        let created = insert_event(&tx, event, true)?;
        tx.commit()?;
        Ok(Activation::Switched {
            previous,
            current: created.id,
        })
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        load_event(self.conn, id)
    }

    fn list_events(&self, venue_id: Option<VenueId>) -> RepoResult<Vec<Event>> {
        let mut events = Vec::new();
        match venue_id {
            Some(venue_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{EVENT_SELECT_SQL} WHERE venue_id = ?1 ORDER BY date DESC, id DESC;"
                ))?;
                let mut rows = stmt.query([venue_id])?;
                while let Some(row) = rows.next()? {
                    events.push(parse_event_row(row)?);
                }
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{EVENT_SELECT_SQL} ORDER BY date DESC, id DESC;"))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    events.push(parse_event_row(row)?);
                }
            }
        }
        Ok(events)
    }

    fn get_active(&self) -> RepoResult<Option<ActiveEvent>> {
        load_active(self.conn)
    }

    fn activate(&self, id: EventId) -> RepoResult<Activation> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let target = load_event(&tx, id)?.ok_or(RepoError::NotFound { entity: "event", id })?;
        if target.is_active {
            return Ok(Activation::Unchanged { current: id });
        }

        let previous = clear_active(&tx)?;
        tx.execute("UPDATE events SET is_active = 1 WHERE id = ?1;", [id])?;
        tx.commit()?;

        Ok(Activation::Switched {
            previous,
            current: id,
        })
    }

    fn deactivate_all(&self) -> RepoResult<Option<EventId>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let previous = clear_active(&tx)?;
        tx.commit()?;
        Ok(previous)
    }

    fn provision_active(&self, fallback: &FallbackEvent) -> RepoResult<ProvisionedEvent> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let Some(active) = load_active(&tx)? {
            return Ok(ProvisionedEvent {
                active,
                event_created: false,
                venue_created: false,
            });
        }

        let (venue, venue_created) = match first_venue(&tx)? {
            Some(venue) => (venue, false),
            None => (insert_venue(&tx, &fallback.venue)?, true),
        };
        let request = NewEvent {
            venue_id: venue.id,
            date: fallback.date,
            name: fallback.event_name.clone(),
        };
        let event = insert_event(&tx, &request, true)?;
        tx.commit()?;

        Ok(ProvisionedEvent {
            active: ActiveEvent { event, venue },
            event_created: true,
            venue_created,
        })
    }

    fn discard_provisioned(&self, provisioned: &ProvisionedEvent) -> RepoResult<()> {
        if !provisioned.event_created {
            return Ok(());
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM events
             WHERE id = ?1
               AND NOT EXISTS (SELECT 1 FROM participations WHERE event_id = ?1);",
            [provisioned.active.event.id],
        )?;
        if provisioned.venue_created {
            tx.execute(
                "DELETE FROM venues
                 WHERE id = ?1
                   AND NOT EXISTS (SELECT 1 FROM events WHERE venue_id = ?1);",
                [provisioned.active.venue.id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn insert_event(conn: &Connection, event: &NewEvent, active: bool) -> RepoResult<Event> {
    if load_venue(conn, event.venue_id)?.is_none() {
        return Err(RepoError::NotFound {
            entity: "venue",
            id: event.venue_id,
        });
    }

    conn.execute(
        "INSERT INTO events (venue_id, date, name, is_active) VALUES (?1, ?2, ?3, ?4);",
        params![
            event.venue_id,
            event.date.format(DATE_FORMAT).to_string(),
            event.name.as_str(),
            bool_to_int(active),
        ],
    )?;

    Ok(Event {
        id: conn.last_insert_rowid(),
        venue_id: event.venue_id,
        date: event.date,
        name: event.name.clone(),
        is_active: active,
    })
}

/// Clears the active flag and returns the id that held it.
fn clear_active(conn: &Connection) -> RepoResult<Option<EventId>> {
    let previous = conn
        .query_row("SELECT id FROM events WHERE is_active = 1;", [], |row| {
            row.get::<_, EventId>(0)
        })
        .optional()?;
    if previous.is_some() {
        conn.execute("UPDATE events SET is_active = 0 WHERE is_active = 1;", [])?;
    }
    Ok(previous)
}

fn load_event(conn: &Connection, id: EventId) -> RepoResult<Option<Event>> {
    let mut stmt = conn.prepare(&format!("{EVENT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_event_row(row)?));
    }
    Ok(None)
}

fn load_active(conn: &Connection) -> RepoResult<Option<ActiveEvent>> {
    let mut stmt = conn.prepare(
        "SELECT
            e.id AS id,
            e.venue_id AS venue_id,
            e.date AS date,
            e.name AS name,
            e.is_active AS is_active,
            v.name AS venue_name,
            v.normalized_name AS venue_normalized_name
         FROM events e
         INNER JOIN venues v ON v.id = e.venue_id
         WHERE e.is_active = 1
         ORDER BY e.id ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let event = parse_event_row(row)?;
    let venue = Venue {
        id: event.venue_id,
        name: row.get("venue_name")?,
        normalized_name: row.get("venue_normalized_name")?,
    };
    if rows.next()?.is_some() {
        return Err(RepoError::InvalidData(
            "more than one event has is_active = 1".to_string(),
        ));
    }

    Ok(Some(ActiveEvent { event, venue }))
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let date_text: String = row.get("date")?;
    let date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid date value `{date_text}` in events.date"))
    })?;

    Ok(Event {
        id: row.get("id")?,
        venue_id: row.get("venue_id")?,
        date,
        name: row.get("name")?,
        is_active: int_to_bool(row.get("is_active")?, "events.is_active")?,
    })
}
