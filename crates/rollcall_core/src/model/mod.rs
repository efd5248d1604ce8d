//! Attendance domain model.
//!
//! # Responsibility
//! - Define the records shared by registry, state machine, resolver and ledger.
//! - Own input validation rules that do not need storage access.
//!
//! # Invariants
//! - Every record is identified by a positive SQLite row id.
//! - At most one `Event` has `is_active = true` at any time.
//! - `ParticipationRecord` rows are append-only.

pub mod event;
pub mod participation;
pub mod person;
pub mod venue;
