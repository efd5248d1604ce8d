//! Event domain model.
//!
//! # Invariants
//! - `venue_id` is set at creation and never changed.
//! - System-wide, the number of events with `is_active = true` is 0 or 1.

use crate::model::venue::{Venue, VenueId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Row id of an event.
pub type EventId = i64;

/// Maximum event name length in characters, after trim.
pub const EVENT_NAME_MAX_CHARS: usize = 100;

/// Scheduled occurrence at a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub venue_id: VenueId,
    pub date: NaiveDate,
    pub name: String,
    pub is_active: bool,
}

/// The active event joined with its venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEvent {
    pub event: Event,
    pub venue: Venue,
}

/// Result of an active-event transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Activation {
    /// Target was already active; nothing was written.
    Unchanged { current: EventId },
    /// Previous active event (if any) was deactivated and `current` activated
    /// in the same transaction.
    Switched {
        previous: Option<EventId>,
        current: EventId,
    },
}

impl Activation {
    /// Id of the event that is active after the transition.
    pub fn current(&self) -> EventId {
        match self {
            Self::Unchanged { current } | Self::Switched { current, .. } => *current,
        }
    }
}

/// Input for creating an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub venue_id: VenueId,
    pub date: NaiveDate,
    pub name: String,
}

/// Validation failures for event input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    BlankName,
    NameTooLong { max: usize },
    InvalidVenueId(VenueId),
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "event name must not be blank"),
            Self::NameTooLong { max } => write!(f, "event name must be at most {max} characters"),
            Self::InvalidVenueId(id) => write!(f, "invalid venue id: {id}"),
        }
    }
}

impl Error for EventValidationError {}

impl NewEvent {
    /// Builds a validated event request with a trimmed name.
    pub fn new(
        venue_id: VenueId,
        date: NaiveDate,
        name: &str,
    ) -> Result<Self, EventValidationError> {
        if venue_id <= 0 {
            return Err(EventValidationError::InvalidVenueId(venue_id));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(EventValidationError::BlankName);
        }
        if name.chars().count() > EVENT_NAME_MAX_CHARS {
            return Err(EventValidationError::NameTooLong {
                max: EVENT_NAME_MAX_CHARS,
            });
        }

        Ok(Self {
            venue_id,
            date,
            name: name.to_string(),
        })
    }
}
