//! Participation ledger use-case service.
//!
//! # Responsibility
//! - Record presence/absence of a person at the active event.
//! - Provision a venue and event when nothing is active yet.
//! - Report attendance aggregates derived from ledger rows.
//!
//! # Invariants
//! - Every successful call appends exactly one row; nothing is deduplicated.
//! - An unknown person is rejected before any event is provisioned.
//! - A failed append leaves no provisioned venue/event behind.
//! - Summaries count rows; the cached counters on `Person` are not consulted.

use crate::config::FallbackPolicy;
use crate::model::event::{ActiveEvent, EventId};
use crate::model::participation::{AttendanceSummary, ParticipationRecord, ParticipationStatus};
use crate::model::person::PersonId;
use crate::repo::event_repo::{EventRepository, ProvisionedEvent};
use crate::repo::participation_repo::{NewParticipation, ParticipationRepository};
use crate::repo::person_repo::PersonRepository;
use crate::service::{ServiceError, ServiceResult};
use chrono::{DateTime, Local};
use log::{error, info, warn};

/// Outcome of `record_participation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub record: ParticipationRecord,
    /// Event the row was recorded against, with its venue.
    pub active: ActiveEvent,
    /// `true` when the event was created by this call.
    pub provisioned: bool,
    /// `true` when the fallback venue was created by this call.
    pub venue_created: bool,
    pub message: String,
}

/// Ledger facade over event, participation and person storage.
pub struct LedgerService<E, L, P>
where
    E: EventRepository,
    L: ParticipationRepository,
    P: PersonRepository,
{
    events: E,
    ledger: L,
    persons: P,
    policy: FallbackPolicy,
}

impl<E, L, P> LedgerService<E, L, P>
where
    E: EventRepository,
    L: ParticipationRepository,
    P: PersonRepository,
{
    pub fn new(events: E, ledger: L, persons: P, policy: FallbackPolicy) -> Self {
        Self {
            events,
            ledger,
            persons,
            policy,
        }
    }

    /// Appends a presence/absence row for `person_id` at the active event.
    ///
    /// # Errors
    /// - `InvalidArgument` when `person_id` is not positive.
    /// - `NotFound` when the person does not exist.
    /// - `Storage` when provisioning or the append fails. A venue/event
    ///   provisioned by this call is removed again before the error returns.
    pub fn record_participation(
        &self,
        person_id: PersonId,
        status: ParticipationStatus,
    ) -> ServiceResult<LedgerEntry> {
        self.record_participation_at(person_id, status, Local::now())
    }

    /// `record_participation` with an explicit clock reading.
    ///
    /// `now` supplies both the row timestamp and the local date used to
    /// name a provisioned event.
    pub fn record_participation_at(
        &self,
        person_id: PersonId,
        status: ParticipationStatus,
        now: DateTime<Local>,
    ) -> ServiceResult<LedgerEntry> {
        ensure_positive_id(person_id)?;
        let person = self
            .persons
            .get_person(person_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("person not found: {person_id}")))?;

        let fallback = self.policy.event_for(now.date_naive());
        let provisioned = self.events.provision_active(&fallback)?;
        if provisioned.event_created {
            info!(
                "event=event_provision module=ledger_service status=ok event_id={} venue_id={} venue_created={}",
                provisioned.active.event.id,
                provisioned.active.venue.id,
                provisioned.venue_created
            );
        }

        let entry = NewParticipation {
            person_id,
            event_id: provisioned.active.event.id,
            timestamp: now.timestamp_millis(),
            status,
        };
        let record = match self.ledger.append(&entry) {
            Ok(record) => record,
            Err(err) => {
                let err = ServiceError::from(err);
                warn!(
                    "event=participation_record module=ledger_service status=error person_id={person_id} error_code={}",
                    err.code()
                );
                if provisioned.event_created {
                    self.discard_provisioned(&provisioned);
                }
                return Err(err);
            }
        };
        info!(
            "event=participation_record module=ledger_service status=ok person_id={person_id} event_id={} participation_status={}",
            record.event_id,
            record.status.as_str()
        );

        let verb = match status {
            ParticipationStatus::Present => "marked present",
            ParticipationStatus::Absent => "marked absent",
        };
        let message = format!(
            "{} {verb} at {}.",
            person.display_name(),
            provisioned.active.event.name
        );

        Ok(LedgerEntry {
            record,
            active: provisioned.active,
            provisioned: provisioned.event_created,
            venue_created: provisioned.venue_created,
            message,
        })
    }

    /// Present/absent totals for one person, counted from ledger rows.
    pub fn attendance_summary(&self, person_id: PersonId) -> ServiceResult<AttendanceSummary> {
        ensure_positive_id(person_id)?;
        if self.persons.get_person(person_id)?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "person not found: {person_id}"
            )));
        }
        self.ledger
            .summary_for_person(person_id)
            .map_err(Into::into)
    }

    /// Present/absent totals for one event, counted from ledger rows.
    pub fn event_summary(&self, event_id: EventId) -> ServiceResult<AttendanceSummary> {
        self.ensure_event_exists(event_id)?;
        self.ledger.summary_for_event(event_id).map_err(Into::into)
    }

    /// All rows for one person in recording order.
    pub fn person_history(&self, person_id: PersonId) -> ServiceResult<Vec<ParticipationRecord>> {
        ensure_positive_id(person_id)?;
        self.ledger.list_for_person(person_id).map_err(Into::into)
    }

    /// All rows for one event in recording order.
    pub fn event_roster(&self, event_id: EventId) -> ServiceResult<Vec<ParticipationRecord>> {
        self.ensure_event_exists(event_id)?;
        self.ledger.list_for_event(event_id).map_err(Into::into)
    }

    fn ensure_event_exists(&self, event_id: EventId) -> ServiceResult<()> {
        if event_id <= 0 {
            return Err(ServiceError::InvalidArgument(format!(
                "event id must be positive, got {event_id}"
            )));
        }
        if self.events.get_event(event_id)?.is_none() {
            return Err(ServiceError::NotFound(format!("event not found: {event_id}")));
        }
        Ok(())
    }

    /// Best effort: the append error is what the caller sees either way.
    fn discard_provisioned(&self, provisioned: &ProvisionedEvent) {
        match self.events.discard_provisioned(provisioned) {
            Ok(()) => info!(
                "event=event_provision module=ledger_service status=rolled_back event_id={} venue_removed={}",
                provisioned.active.event.id,
                provisioned.venue_created
            ),
            Err(err) => error!(
                "event=event_provision module=ledger_service status=rollback_failed event_id={} error={err}",
                provisioned.active.event.id
            ),
        }
    }
}

fn ensure_positive_id(person_id: PersonId) -> ServiceResult<()> {
    if person_id <= 0 {
        return Err(ServiceError::InvalidArgument(format!(
            "person id must be positive, got {person_id}"
        )));
    }
    Ok(())
}
