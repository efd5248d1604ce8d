//! Multilingual text normalization and script detection.
//!
//! # Responsibility
//! - Produce the folded identity key used for person/venue matching.
//! - Sanitize free-form input before it reaches search queries.
//! - Classify script families for callers that pick rendering modes.
//!
//! # Invariants
//! - Every function is total: any `&str` (empty, control chars) is accepted.
//! - `normalize_name` is idempotent.

pub mod normalize;
pub mod script;

pub use normalize::{normalize_name, normalize_search_term, sanitize_input};
pub use script::{
    contains_arabic_text, contains_asian_text, detect_script, text_direction, ScriptFamily,
    TextDirection,
};
