//! Core domain logic for the rollcall attendance queue.
//! This crate is the single source of truth for identity and ledger invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod text;

pub use config::{ConfigError, CoreConfig, FallbackPolicy};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::event::{Activation, ActiveEvent, Event, EventId};
pub use model::participation::{
    AttendanceSummary, ParticipationId, ParticipationRecord, ParticipationStatus,
};
pub use model::person::{Person, PersonDisplay, PersonId};
pub use model::venue::{Venue, VenueId};
pub use repo::event_repo::SqliteEventRepository;
pub use repo::participation_repo::SqliteParticipationRepository;
pub use repo::person_repo::SqlitePersonRepository;
pub use repo::venue_repo::SqliteVenueRepository;
pub use repo::{RepoError, RepoResult};
pub use service::event_service::EventService;
pub use service::identity_service::{IdentityService, ResolvedPerson};
pub use service::ledger_service::{LedgerEntry, LedgerService};
pub use service::venue_service::{DeleteOutcome, VenueDeleteReport, VenueService};
pub use service::{ErrorKind, ServiceError, ServiceResult};
pub use text::{normalize_name, normalize_search_term, sanitize_input};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
