//! Person identity resolution.
//!
//! # Responsibility
//! - Decide whether an input name refers to an existing person or a new one.
//! - Validate name, birthday and email before any storage access.
//! - Provide an explicit path for changing contact details later.
//!
//! # Invariants
//! - Identity key is `normalize_name(full_name)`; one person per key.
//! - A match is returned as stored: birthday/email passed on a later call
//!   are not applied by `resolve_or_create`.
//! - Storage failures come back as `ServiceError::Storage`, never a panic.

use crate::model::person::{
    validate_birthday, validate_optional_birthday, validate_optional_email, NewPerson, Person,
    PersonId, PersonValidationError,
};
use crate::repo::person_repo::{ContactUpdate, PersonRepository};
use crate::repo::RepoError;
use crate::service::{ServiceError, ServiceResult};
use crate::text::normalize_search_term;
use log::{debug, info};

/// Outcome of `resolve_or_create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPerson {
    pub person: Person,
    /// `true` when a new row was inserted.
    pub created: bool,
    /// Human-readable summary for the caller.
    pub message: String,
}

/// Identity resolver facade.
pub struct IdentityService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> IdentityService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the person registered under the folded `full_name`, creating
    /// one when none exists.
    ///
    /// `birthday` (`DD/MM`) and `email` are optional; blank values count as
    /// absent. They are only stored when a new person is created.
    pub fn resolve_or_create(
        &self,
        full_name: &str,
        birthday: Option<&str>,
        email: Option<&str>,
    ) -> ServiceResult<ResolvedPerson> {
        let candidate = NewPerson::new(full_name, birthday, email)?;

        if let Some(person) = self
            .repo
            .find_by_normalized_name(&candidate.normalized_full_name)?
        {
            debug!(
                "event=person_resolve module=identity_service status=matched person_id={}",
                person.id
            );
            return Ok(matched(person));
        }

        match self.repo.create_person(&candidate) {
            Ok(person) => {
                info!(
                    "event=person_resolve module=identity_service status=created person_id={}",
                    person.id
                );
                let message = format!("{} registered.", person.display_name());
                Ok(ResolvedPerson {
                    person,
                    created: true,
                    message,
                })
            }
            // Lost a race with another insert of the same key: use that row.
            Err(RepoError::Duplicate(_)) => self
                .repo
                .find_by_normalized_name(&candidate.normalized_full_name)?
                .map(matched)
                .ok_or_else(|| {
                    ServiceError::Duplicate(
                        "a person with this name already exists".to_string(),
                    )
                }),
            Err(err) => Err(err.into()),
        }
    }

    /// `resolve_or_create` with a mandatory birthday, for the flow that
    /// tells same-named people apart.
    ///
    /// Identity is still the folded name: when it already exists the stored
    /// person is returned and, if its birthday differs, `message` says the
    /// supplied one was not applied (see `update_contact`).
    pub fn register_disambiguated(
        &self,
        full_name: &str,
        birthday: &str,
        email: Option<&str>,
    ) -> ServiceResult<ResolvedPerson> {
        if birthday.trim().is_empty() {
            return Err(PersonValidationError::BirthdayRequired.into());
        }
        let birthday = validate_birthday(birthday)?;
        let mut resolved = self.resolve_or_create(full_name, Some(&birthday), email)?;
        if !resolved.created
            && resolved.person.birthday_day_month.as_deref() != Some(birthday.as_str())
        {
            resolved.message = format!(
                "{} is already registered; birthday {birthday} was not applied.",
                resolved.person.display_name()
            );
        }
        Ok(resolved)
    }

    /// Sets birthday and/or email on an existing person.
    ///
    /// Blank or `None` values keep what is stored.
    ///
    /// # Errors
    /// - `Validation` when both values are absent or either is malformed.
    /// - `NotFound` for unknown ids.
    pub fn update_contact(
        &self,
        person_id: PersonId,
        birthday: Option<&str>,
        email: Option<&str>,
    ) -> ServiceResult<Person> {
        let update = ContactUpdate {
            birthday_day_month: validate_optional_birthday(birthday)?,
            email: validate_optional_email(email)?,
        };
        if update == ContactUpdate::default() {
            return Err(ServiceError::Validation(
                "provide a birthday or an email to update".to_string(),
            ));
        }

        let person = self.repo.update_contact(person_id, &update)?;
        info!("event=person_update_contact module=identity_service status=ok person_id={person_id}");
        Ok(person)
    }

    pub fn get_person(&self, person_id: PersonId) -> ServiceResult<Person> {
        self.repo
            .get_person(person_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("person not found: {person_id}")))
    }

    /// People whose folded name contains the folded `term`, by name, capped
    /// at `max`. Blank terms return nothing.
    pub fn search_persons(&self, term: &str, max: u32) -> ServiceResult<Vec<Person>> {
        let term = normalize_search_term(term);
        if term.is_empty() || max == 0 {
            return Ok(Vec::new());
        }
        self.repo.search_persons(&term, max).map_err(Into::into)
    }

    pub fn list_persons(&self) -> ServiceResult<Vec<Person>> {
        self.repo.list_persons().map_err(Into::into)
    }
}

fn matched(person: Person) -> ResolvedPerson {
    let message = format!("{} is already registered.", person.display_name());
    ResolvedPerson {
        person,
        created: false,
        message,
    }
}
