//! Venue repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist venues keyed by their folded `normalized_name`.
//! - Classify and delete venues in one transaction, skipping referenced ones.
//!
//! # Invariants
//! - Deletion never removes a venue referenced by an event.
//! - Search results are ordered by `name COLLATE NOCASE ASC, id ASC`.

use crate::model::venue::{ValidVenueName, Venue, VenueId};
use crate::repo::{ensure_schema_ready, map_unique_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const VENUE_SELECT_SQL: &str = "SELECT id, name, normalized_name FROM venues";

/// How a search term is matched against venue keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueMatch {
    Prefix,
    Contains,
}

/// Search options over normalized venue names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueSearchQuery {
    /// Already normalized search key; must not be empty.
    pub term: String,
    pub mode: VenueMatch,
    pub limit: u32,
}

/// Per-id classification of a batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VenueDeletion {
    pub deleted: Vec<VenueId>,
    /// Ids kept because at least one event references them.
    pub blocked: Vec<VenueId>,
    /// Ids with no venue row.
    pub missing: Vec<VenueId>,
}

/// Repository interface for venue operations.
pub trait VenueRepository {
    fn create_venue(&self, venue: &ValidVenueName) -> RepoResult<Venue>;
    fn rename_venue(&self, id: VenueId, venue: &ValidVenueName) -> RepoResult<Venue>;
    fn get_venue(&self, id: VenueId) -> RepoResult<Option<Venue>>;
    fn find_by_normalized_name(&self, normalized_name: &str) -> RepoResult<Option<Venue>>;
    fn list_venues(&self) -> RepoResult<Vec<Venue>>;
    fn search_venues(&self, query: &VenueSearchQuery) -> RepoResult<Vec<Venue>>;
    /// Deletes every id that no event references, in one transaction.
    fn delete_unreferenced(&self, ids: &[VenueId]) -> RepoResult<VenueDeletion>;
}

/// SQLite-backed venue repository.
pub struct SqliteVenueRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVenueRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl VenueRepository for SqliteVenueRepository<'_> {
    fn create_venue(&self, venue: &ValidVenueName) -> RepoResult<Venue> {
        insert_venue(self.conn, venue)
    }

    fn rename_venue(&self, id: VenueId, venue: &ValidVenueName) -> RepoResult<Venue> {
        let changed = self
            .conn
            .execute(
                "UPDATE venues SET name = ?2, normalized_name = ?3 WHERE id = ?1;",
                params![id, venue.name.as_str(), venue.normalized_name.as_str()],
            )
            .map_err(|err| map_unique_violation(err, format!("venue `{}`", venue.name)))?;

        if changed == 0 {
            return Err(RepoError::NotFound { entity: "venue", id });
        }

        Ok(Venue {
            id,
            name: venue.name.clone(),
            normalized_name: venue.normalized_name.clone(),
        })
    }

    fn get_venue(&self, id: VenueId) -> RepoResult<Option<Venue>> {
        load_venue(self.conn, id)
    }

    fn find_by_normalized_name(&self, normalized_name: &str) -> RepoResult<Option<Venue>> {
        self.conn
            .query_row(
                &format!("{VENUE_SELECT_SQL} WHERE normalized_name = ?1;"),
                [normalized_name],
                parse_venue_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn list_venues(&self) -> RepoResult<Vec<Venue>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VENUE_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let rows = stmt.query_map([], parse_venue_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn search_venues(&self, query: &VenueSearchQuery) -> RepoResult<Vec<Venue>> {
        let condition = match query.mode {
            VenueMatch::Prefix => "substr(normalized_name, 1, length(?1)) = ?1",
            VenueMatch::Contains => "instr(normalized_name, ?1) > 0",
        };
        let mut stmt = self.conn.prepare(&format!(
            "{VENUE_SELECT_SQL}
             WHERE {condition}
             ORDER BY name COLLATE NOCASE ASC, id ASC
             LIMIT ?2;"
        ))?;
        let rows = stmt.query_map(
            params![query.term.as_str(), i64::from(query.limit)],
            parse_venue_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn delete_unreferenced(&self, ids: &[VenueId]) -> RepoResult<VenueDeletion> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut deletion = VenueDeletion::default();

        for &id in ids {
            if deletion.deleted.contains(&id)
                || deletion.blocked.contains(&id)
                || deletion.missing.contains(&id)
            {
                continue;
            }
            if load_venue(&tx, id)?.is_none() {
                deletion.missing.push(id);
            } else if venue_has_events(&tx, id)? {
                deletion.blocked.push(id);
            } else {
                deletion.deleted.push(id);
            }
        }

        for id in &deletion.deleted {
            tx.execute("DELETE FROM venues WHERE id = ?1;", [id])?;
        }

        tx.commit()?;
        Ok(deletion)
    }
}

pub(crate) fn insert_venue(conn: &Connection, venue: &ValidVenueName) -> RepoResult<Venue> {
    conn.execute(
        "INSERT INTO venues (name, normalized_name) VALUES (?1, ?2);",
        params![venue.name.as_str(), venue.normalized_name.as_str()],
    )
    .map_err(|err| map_unique_violation(err, format!("venue `{}`", venue.name)))?;

    Ok(Venue {
        id: conn.last_insert_rowid(),
        name: venue.name.clone(),
        normalized_name: venue.normalized_name.clone(),
    })
}

pub(crate) fn load_venue(conn: &Connection, id: VenueId) -> RepoResult<Option<Venue>> {
    conn.query_row(
        &format!("{VENUE_SELECT_SQL} WHERE id = ?1;"),
        [id],
        parse_venue_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Oldest venue by id, used as the fallback host for auto-provisioned events.
pub(crate) fn first_venue(conn: &Connection) -> RepoResult<Option<Venue>> {
    conn.query_row(
        &format!("{VENUE_SELECT_SQL} ORDER BY id ASC LIMIT 1;"),
        [],
        parse_venue_row,
    )
    .optional()
    .map_err(Into::into)
}

fn venue_has_events(conn: &Connection, id: VenueId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM events WHERE venue_id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_venue_row(row: &Row<'_>) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get("id")?,
        name: row.get("name")?,
        normalized_name: row.get("normalized_name")?,
    })
}
