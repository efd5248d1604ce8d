//! Venue domain model.
//!
//! # Invariants
//! - `normalized_name` is always `normalize_name(name)` and unique.
//! - A venue referenced by any event cannot be deleted.

use crate::text::normalize_name;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Row id of a venue.
pub type VenueId = i64;

/// Minimum venue name length in characters, after trim.
pub const VENUE_NAME_MIN_CHARS: usize = 2;
/// Maximum venue name length in characters, after trim.
pub const VENUE_NAME_MAX_CHARS: usize = 30;

/// Physical location hosting events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    /// Display name as entered (trimmed).
    pub name: String,
    /// Case/diacritic-folded comparison key.
    pub normalized_name: String,
}

/// Venue name accepted by the registry, with its comparison key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidVenueName {
    pub name: String,
    pub normalized_name: String,
}

/// Validation failures for venue names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueValidationError {
    TooShort { min: usize },
    TooLong { max: usize },
    /// Name contains no letters or digits once folded.
    NoSearchableCharacters,
}

impl Display for VenueValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { min } => {
                write!(f, "venue name must be at least {min} characters")
            }
            Self::TooLong { max } => write!(f, "venue name must be at most {max} characters"),
            Self::NoSearchableCharacters => {
                write!(f, "venue name must contain letters or digits")
            }
        }
    }
}

impl Error for VenueValidationError {}

/// Trims and checks a venue name against the registry bounds.
pub fn validate_venue_name(input: &str) -> Result<ValidVenueName, VenueValidationError> {
    let name = input.trim();
    let length = name.chars().count();
    if length < VENUE_NAME_MIN_CHARS {
        return Err(VenueValidationError::TooShort {
            min: VENUE_NAME_MIN_CHARS,
        });
    }
    if length > VENUE_NAME_MAX_CHARS {
        return Err(VenueValidationError::TooLong {
            max: VENUE_NAME_MAX_CHARS,
        });
    }

    let normalized_name = normalize_name(name);
    if normalized_name.is_empty() {
        return Err(VenueValidationError::NoSearchableCharacters);
    }

    Ok(ValidVenueName {
        name: name.to_string(),
        normalized_name,
    })
}
