//! Active event state machine.
//!
//! # Responsibility
//! - Create events and track which single event is active.
//! - Perform active-flag transitions as one committed unit.
//!
//! # Invariants
//! - The number of active events is 0 or 1 at every observation point.
//! - `set_active` on an unknown id fails with `NotFound` and leaves the
//!   current active event untouched.
//! - `set_active` on the already-active event writes nothing.

use crate::model::event::{Activation, ActiveEvent, Event, EventId, NewEvent};
use crate::model::venue::VenueId;
use crate::repo::event_repo::EventRepository;
use crate::service::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::{info, warn};

/// Event lifecycle facade.
pub struct EventService<R: EventRepository> {
    repo: R,
}

impl<R: EventRepository> EventService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the active event with its venue, if any.
    pub fn get_active(&self) -> ServiceResult<Option<ActiveEvent>> {
        self.repo.get_active().map_err(Into::into)
    }

    /// Makes `event_id` the only active event.
    pub fn set_active(&self, event_id: EventId) -> ServiceResult<Activation> {
        match self.repo.activate(event_id) {
            Ok(activation) => {
                if let Activation::Switched { previous, current } = activation {
                    info!(
                        "event=event_activate module=event_service status=ok event_id={current} previous_id={}",
                        previous.map_or_else(|| "none".to_string(), |id| id.to_string())
                    );
                }
                Ok(activation)
            }
            Err(err) => {
                let err = ServiceError::from(err);
                warn!(
                    "event=event_activate module=event_service status=error event_id={event_id} error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Clears the active flag. Returns the id that was active.
    pub fn deactivate(&self) -> ServiceResult<Option<EventId>> {
        let previous = self.repo.deactivate_all()?;
        if let Some(id) = previous {
            info!("event=event_deactivate module=event_service status=ok event_id={id}");
        }
        Ok(previous)
    }

    /// Creates an inactive event at `venue_id`.
    pub fn create_event(
        &self,
        venue_id: VenueId,
        date: NaiveDate,
        name: &str,
    ) -> ServiceResult<Event> {
        let request = NewEvent::new(venue_id, date, name)?;
        let event = self.repo.create_event(&request)?;
        info!(
            "event=event_create module=event_service status=ok event_id={} venue_id={venue_id}",
            event.id
        );
        Ok(event)
    }

    /// Creates an event and activates it in the same transaction.
    pub fn create_and_activate(
        &self,
        venue_id: VenueId,
        date: NaiveDate,
        name: &str,
    ) -> ServiceResult<ActiveEvent> {
        let request = NewEvent::new(venue_id, date, name)?;
        let activation = self.repo.create_active_event(&request)?;
        info!(
            "event=event_create module=event_service status=ok event_id={} venue_id={venue_id} active=true",
            activation.current()
        );
        self.repo.get_active()?.ok_or_else(|| {
            ServiceError::NotFound("created event is not active in read-back".to_string())
        })
    }

    pub fn get_event(&self, event_id: EventId) -> ServiceResult<Event> {
        self.repo
            .get_event(event_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("event not found: {event_id}")))
    }

    /// Events newest first, optionally for one venue.
    pub fn list_events(&self, venue_id: Option<VenueId>) -> ServiceResult<Vec<Event>> {
        self.repo.list_events(venue_id).map_err(Into::into)
    }
}
