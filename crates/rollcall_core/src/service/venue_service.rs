//! Venue registry use-case service.
//!
//! # Responsibility
//! - Create and rename venues with bounded, unique names.
//! - Delete venues only when no event references them.
//! - Prefix/substring search over folded venue names.
//!
//! # Invariants
//! - Name uniqueness is case- and diacritic-insensitive.
//! - Batch deletes partially succeed; blocked ids never raise.
//! - Blank search terms return an empty list without touching storage.

use crate::model::venue::{validate_venue_name, Venue, VenueId};
use crate::repo::venue_repo::{VenueMatch, VenueRepository, VenueSearchQuery};
use crate::service::{ServiceError, ServiceResult};
use crate::text::normalize_search_term;
use log::{info, warn};

/// Classification of a batch delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Every existing requested venue was deleted.
    AllDeleted,
    /// Some venues deleted, others kept because events reference them.
    Partial,
    /// Nothing deleted; every existing requested venue is referenced.
    NoneDeleted,
}

/// Result of `VenueService::delete_many`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueDeleteReport {
    pub outcome: DeleteOutcome,
    pub deleted: Vec<VenueId>,
    pub blocked: Vec<VenueId>,
    /// Requested ids that did not exist.
    pub missing: Vec<VenueId>,
}

impl VenueDeleteReport {
    /// User-facing summary; distinct for each outcome.
    pub fn message(&self) -> String {
        match self.outcome {
            DeleteOutcome::AllDeleted => {
                format!("{} venue(s) deleted.", self.deleted.len())
            }
            DeleteOutcome::Partial => format!(
                "{} venue(s) deleted; {} venue(s) kept because events still use them.",
                self.deleted.len(),
                self.blocked.len()
            ),
            DeleteOutcome::NoneDeleted => {
                "No venues deleted: every selected venue still has events.".to_string()
            }
        }
    }
}

/// Venue registry facade.
pub struct VenueService<R: VenueRepository> {
    repo: R,
}

impl<R: VenueRepository> VenueService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a venue.
    ///
    /// # Errors
    /// - `Validation` when the trimmed name is outside 2..=30 characters.
    /// - `Duplicate` when a venue with the same folded name exists.
    pub fn create(&self, name: &str) -> ServiceResult<Venue> {
        let valid = validate_venue_name(name)?;
        if self
            .repo
            .find_by_normalized_name(&valid.normalized_name)?
            .is_some()
        {
            return Err(duplicate_name(&valid.name));
        }

        let venue = self.repo.create_venue(&valid)?;
        info!(
            "event=venue_create module=venue_service status=ok venue_id={}",
            venue.id
        );
        Ok(venue)
    }

    /// Renames a venue. Renaming to its own name (any casing) is allowed.
    pub fn rename(&self, id: VenueId, new_name: &str) -> ServiceResult<Venue> {
        let valid = validate_venue_name(new_name)?;
        if let Some(existing) = self.repo.find_by_normalized_name(&valid.normalized_name)? {
            if existing.id != id {
                return Err(duplicate_name(&valid.name));
            }
        }

        let venue = self.repo.rename_venue(id, &valid)?;
        info!("event=venue_rename module=venue_service status=ok venue_id={id}");
        Ok(venue)
    }

    /// Deletes one venue.
    ///
    /// # Errors
    /// - `NotFound` for unknown ids.
    /// - `ReferentialConflict` when any event references the venue.
    pub fn delete(&self, id: VenueId) -> ServiceResult<()> {
        let deletion = self.repo.delete_unreferenced(&[id])?;
        if !deletion.blocked.is_empty() {
            return Err(ServiceError::ReferentialConflict(format!(
                "venue {id} still has events and cannot be deleted"
            )));
        }
        if !deletion.missing.is_empty() {
            return Err(ServiceError::NotFound(format!("venue not found: {id}")));
        }
        info!("event=venue_delete module=venue_service status=ok venue_id={id}");
        Ok(())
    }

    /// Deletes every unreferenced venue in `ids`, keeping the rest.
    ///
    /// # Errors
    /// - `Validation` for an empty id list.
    /// - `NotFound` when none of the ids exist.
    /// - `Storage` when the repository fails as a whole.
    pub fn delete_many(&self, ids: &[VenueId]) -> ServiceResult<VenueDeleteReport> {
        if ids.is_empty() {
            return Err(ServiceError::Validation(
                "select at least one venue to delete".to_string(),
            ));
        }

        let deletion = self.repo.delete_unreferenced(ids)?;
        let outcome = match (deletion.deleted.is_empty(), deletion.blocked.is_empty()) {
            (true, true) => {
                return Err(ServiceError::NotFound(format!(
                    "none of the {} selected venue(s) exist",
                    ids.len()
                )));
            }
            (false, true) => DeleteOutcome::AllDeleted,
            (false, false) => DeleteOutcome::Partial,
            (true, false) => DeleteOutcome::NoneDeleted,
        };

        if outcome == DeleteOutcome::AllDeleted {
            info!(
                "event=venue_delete_many module=venue_service status=ok deleted={}",
                deletion.deleted.len()
            );
        } else {
            warn!(
                "event=venue_delete_many module=venue_service status=partial deleted={} blocked={} missing={}",
                deletion.deleted.len(),
                deletion.blocked.len(),
                deletion.missing.len()
            );
        }

        Ok(VenueDeleteReport {
            outcome,
            deleted: deletion.deleted,
            blocked: deletion.blocked,
            missing: deletion.missing,
        })
    }

    /// Venues whose folded name starts with the folded `term`.
    pub fn search_by_prefix(&self, term: &str, max: u32) -> ServiceResult<Vec<Venue>> {
        self.search(term, VenueMatch::Prefix, max)
    }

    /// Venues whose folded name contains the folded `term`.
    pub fn search_by_contains(&self, term: &str, max: u32) -> ServiceResult<Vec<Venue>> {
        self.search(term, VenueMatch::Contains, max)
    }

    pub fn get(&self, id: VenueId) -> ServiceResult<Venue> {
        self.repo
            .get_venue(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("venue not found: {id}")))
    }

    /// All venues ordered by name.
    pub fn list_all(&self) -> ServiceResult<Vec<Venue>> {
        self.repo.list_venues().map_err(Into::into)
    }

    fn search(&self, term: &str, mode: VenueMatch, max: u32) -> ServiceResult<Vec<Venue>> {
        let term = normalize_search_term(term);
        if term.is_empty() || max == 0 {
            return Ok(Vec::new());
        }
        let query = VenueSearchQuery {
            term,
            mode,
            limit: max,
        };
        self.repo.search_venues(&query).map_err(Into::into)
    }
}

fn duplicate_name(name: &str) -> ServiceError {
    ServiceError::Duplicate(format!("a venue named `{name}` already exists"))
}
