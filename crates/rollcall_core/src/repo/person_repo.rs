//! Person repository contract and SQLite implementation.
//!
//! # Invariants
//! - `normalized_full_name` is unique; inserting a second row with the same
//!   key fails with `RepoError::Duplicate`.
//! - Counters are never written here; only ledger appends touch them.

use crate::model::person::{NewPerson, Person, PersonId};
use crate::repo::{ensure_schema_ready, map_unique_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    full_name,
    normalized_full_name,
    participation_count,
    absence_count,
    birthday_day_month,
    email
FROM persons";

/// Contact fields to overwrite. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub birthday_day_month: Option<String>,
    pub email: Option<String>,
}

/// Repository interface for person operations.
pub trait PersonRepository {
    fn create_person(&self, person: &NewPerson) -> RepoResult<Person>;
    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn find_by_normalized_name(&self, normalized_full_name: &str) -> RepoResult<Option<Person>>;
    fn list_persons(&self) -> RepoResult<Vec<Person>>;
    /// Substring match on the normalized name, ordered by name.
    fn search_persons(&self, normalized_term: &str, limit: u32) -> RepoResult<Vec<Person>>;
    fn update_contact(&self, id: PersonId, update: &ContactUpdate) -> RepoResult<Person>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn create_person(&self, person: &NewPerson) -> RepoResult<Person> {
        self.conn
            .execute(
                "INSERT INTO persons (
                    full_name,
                    normalized_full_name,
                    birthday_day_month,
                    email
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    person.full_name.as_str(),
                    person.normalized_full_name.as_str(),
                    person.birthday_day_month.as_deref(),
                    person.email.as_deref(),
                ],
            )
            .map_err(|err| {
                map_unique_violation(
                    err,
                    format!("person `{}`", person.normalized_full_name),
                )
            })?;

        Ok(Person {
            id: self.conn.last_insert_rowid(),
            full_name: person.full_name.clone(),
            normalized_full_name: person.normalized_full_name.clone(),
            participation_count: 0,
            absence_count: 0,
            birthday_day_month: person.birthday_day_month.clone(),
            email: person.email.clone(),
        })
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        self.conn
            .query_row(
                &format!("{PERSON_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_person_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn find_by_normalized_name(&self, normalized_full_name: &str) -> RepoResult<Option<Person>> {
        self.conn
            .query_row(
                &format!("{PERSON_SELECT_SQL} WHERE normalized_full_name = ?1;"),
                [normalized_full_name],
                parse_person_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn list_persons(&self) -> RepoResult<Vec<Person>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PERSON_SELECT_SQL} ORDER BY full_name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let rows = stmt.query_map([], parse_person_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn search_persons(&self, normalized_term: &str, limit: u32) -> RepoResult<Vec<Person>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PERSON_SELECT_SQL}
             WHERE instr(normalized_full_name, ?1) > 0
             ORDER BY full_name COLLATE NOCASE ASC, id ASC
             LIMIT ?2;"
        ))?;
        let rows = stmt.query_map(
            params![normalized_term, i64::from(limit)],
            parse_person_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn update_contact(&self, id: PersonId, update: &ContactUpdate) -> RepoResult<Person> {
        let changed = self.conn.execute(
            "UPDATE persons
             SET
                birthday_day_month = COALESCE(?2, birthday_day_month),
                email = COALESCE(?3, email)
             WHERE id = ?1;",
            params![
                id,
                update.birthday_day_month.as_deref(),
                update.email.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "person",
                id,
            });
        }

        self.get_person(id)?.ok_or(RepoError::NotFound {
            entity: "person",
            id,
        })
    }
}

fn parse_person_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get("id")?,
        full_name: row.get("full_name")?,
        normalized_full_name: row.get("normalized_full_name")?,
        participation_count: row.get("participation_count")?,
        absence_count: row.get("absence_count")?,
        birthday_day_month: row.get("birthday_day_month")?,
        email: row.get("email")?,
    })
}
