//! Participation ledger model.
//!
//! # Invariants
//! - Records are append-only; nothing in core updates or deletes them.
//! - Aggregates derive from counting records, not from person counters.

use crate::model::event::EventId;
use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};

/// Row id of a ledger record.
pub type ParticipationId = i64;

/// Presence state recorded for one person at one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    Absent,
    Present,
}

impl ParticipationStatus {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Present => "present",
        }
    }

    /// Parses a storage value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "absent" => Some(Self::Absent),
            "present" => Some(Self::Present),
            _ => None,
        }
    }
}

/// One append-only ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub id: ParticipationId,
    pub person_id: PersonId,
    pub event_id: EventId,
    /// Unix epoch milliseconds at append time.
    pub timestamp: i64,
    pub status: ParticipationStatus,
}

/// Counts derived from ledger rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub present: i64,
    pub absent: i64,
}

impl AttendanceSummary {
    pub fn total(&self) -> i64 {
        self.present + self.absent
    }
}
