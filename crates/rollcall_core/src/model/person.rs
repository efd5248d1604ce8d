//! Person domain model, input validators and display identifiers.
//!
//! # Responsibility
//! - Define the registered individual matched by normalized full name.
//! - Validate full name, birthday (`DD/MM`) and email input shapes.
//! - Derive the display identifier used to tell same-named people apart.
//!
//! # Invariants
//! - `normalized_full_name == normalize_name(full_name)` and is unique.
//! - `birthday_day_month` and `email` never take part in identity matching.
//! - Counters are a cache of ledger rows, written only by ledger appends.

use crate::text::normalize_name;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Row id of a person.
pub type PersonId = i64;

/// Maximum full name length accepted from user input.
pub const FULL_NAME_INPUT_MAX_CHARS: usize = 200;
/// Maximum full name length the storage column accepts.
pub const FULL_NAME_STORAGE_MAX_CHARS: usize = 250;
// Input text that passes the input bound always fits the column.
const _: () = assert!(FULL_NAME_INPUT_MAX_CHARS <= FULL_NAME_STORAGE_MAX_CHARS);
/// Minimum length of the last name token (surname).
pub const SURNAME_MIN_CHARS: usize = 2;
/// Maximum email length.
pub const EMAIL_MAX_CHARS: usize = 100;

static BIRTHDAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})/(\d{2})$").expect("valid birthday regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("valid email regex")
});

/// Registered individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    /// Name as entered (trimmed).
    pub full_name: String,
    /// Identity key derived from `full_name`.
    pub normalized_full_name: String,
    /// Cached count of `present` ledger rows.
    pub participation_count: i64,
    /// Cached count of `absent` ledger rows.
    pub absence_count: i64,
    /// `DD/MM`, display-only disambiguator.
    pub birthday_day_month: Option<String>,
    /// Lower-cased, preferred display disambiguator.
    pub email: Option<String>,
}

/// Validated input for inserting a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub full_name: String,
    pub normalized_full_name: String,
    pub birthday_day_month: Option<String>,
    pub email: Option<String>,
}

/// Name plus disambiguator, ready for list rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDisplay {
    /// Bare full name when the identifier is an email, otherwise
    /// `"{full_name} {identifier}"`.
    pub name: String,
    pub identifier: String,
}

/// Which bound a full name violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameBound {
    /// Bound applied to user input.
    Input,
    /// Bound imposed by the storage column.
    Storage,
}

impl Display for NameBound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

/// Validation failures for person input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    EmptyName,
    NameTooLong { bound: NameBound, max: usize },
    MissingSurname,
    SurnameTooShort { min: usize },
    NoSearchableCharacters,
    BirthdayRequired,
    BirthdayFormat,
    DayOutOfRange(u32),
    MonthOutOfRange(u32),
    DayNotInMonth { day: u32, month: u32, max_day: u32 },
    EmailFormat,
    EmailTooLong { max: usize },
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "full name must not be empty"),
            Self::NameTooLong { bound, max } => {
                write!(f, "full name exceeds the {bound} limit of {max} characters")
            }
            Self::MissingSurname => write!(f, "full name must include a given name and a surname"),
            Self::SurnameTooShort { min } => {
                write!(f, "surname must be at least {min} characters")
            }
            Self::NoSearchableCharacters => {
                write!(f, "full name must contain letters or digits")
            }
            Self::BirthdayRequired => write!(f, "birthday is required to tell people apart"),
            Self::BirthdayFormat => write!(f, "birthday must use the DD/MM format"),
            Self::DayOutOfRange(day) => write!(f, "birthday day {day} must be between 1 and 31"),
            Self::MonthOutOfRange(month) => {
                write!(f, "birthday month {month} must be between 1 and 12")
            }
            Self::DayNotInMonth {
                day,
                month,
                max_day,
            } => write!(
                f,
                "birthday day {day} is not valid for month {month}, which has at most {max_day} days"
            ),
            Self::EmailFormat => write!(f, "email must look like name@domain.tld"),
            Self::EmailTooLong { max } => write!(f, "email must be at most {max} characters"),
        }
    }
}

impl Error for PersonValidationError {}

/// Full name accepted by the resolver, with its identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFullName {
    pub full_name: String,
    pub normalized_full_name: String,
}

/// Checks a full name and derives its identity key.
///
/// # Errors
/// - Empty after trim.
/// - Longer than the input bound or the storage bound (checked separately).
/// - Fewer than two whitespace-separated tokens, or a last token shorter
///   than `SURNAME_MIN_CHARS`.
/// - Folds to an empty key.
pub fn validate_full_name(input: &str) -> Result<ValidFullName, PersonValidationError> {
    let full_name = input.trim();
    if full_name.is_empty() {
        return Err(PersonValidationError::EmptyName);
    }

    let length = full_name.chars().count();
    if length > FULL_NAME_INPUT_MAX_CHARS {
        return Err(PersonValidationError::NameTooLong {
            bound: NameBound::Input,
            max: FULL_NAME_INPUT_MAX_CHARS,
        });
    }
    if length > FULL_NAME_STORAGE_MAX_CHARS {
        return Err(PersonValidationError::NameTooLong {
            bound: NameBound::Storage,
            max: FULL_NAME_STORAGE_MAX_CHARS,
        });
    }

    let tokens = full_name.split_whitespace().collect::<Vec<_>>();
    if tokens.len() < 2 {
        return Err(PersonValidationError::MissingSurname);
    }
    let surname = tokens.last().map_or(0, |token| token.chars().count());
    if surname < SURNAME_MIN_CHARS {
        return Err(PersonValidationError::SurnameTooShort {
            min: SURNAME_MIN_CHARS,
        });
    }

    let normalized_full_name = normalize_name(full_name);
    if normalized_full_name.is_empty() {
        return Err(PersonValidationError::NoSearchableCharacters);
    }

    Ok(ValidFullName {
        full_name: full_name.to_string(),
        normalized_full_name,
    })
}

/// Checks a `DD/MM` birthday, including month lengths.
///
/// February allows day 29; April, June, September and November allow 30.
pub fn validate_birthday(input: &str) -> Result<String, PersonValidationError> {
    let value = input.trim();
    let caps = BIRTHDAY_RE
        .captures(value)
        .ok_or(PersonValidationError::BirthdayFormat)?;
    let day = caps[1]
        .parse::<u32>()
        .map_err(|_| PersonValidationError::BirthdayFormat)?;
    let month = caps[2]
        .parse::<u32>()
        .map_err(|_| PersonValidationError::BirthdayFormat)?;

    if !(1..=31).contains(&day) {
        return Err(PersonValidationError::DayOutOfRange(day));
    }
    if !(1..=12).contains(&month) {
        return Err(PersonValidationError::MonthOutOfRange(month));
    }

    let max_day = match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    };
    if day > max_day {
        return Err(PersonValidationError::DayNotInMonth {
            day,
            month,
            max_day,
        });
    }

    Ok(value.to_string())
}

/// Checks a `local@domain.tld` email and lower-cases it.
pub fn validate_email(input: &str) -> Result<String, PersonValidationError> {
    let value = input.trim();
    if value.chars().count() > EMAIL_MAX_CHARS {
        return Err(PersonValidationError::EmailTooLong {
            max: EMAIL_MAX_CHARS,
        });
    }
    if !EMAIL_RE.is_match(value) {
        return Err(PersonValidationError::EmailFormat);
    }
    Ok(value.to_lowercase())
}

/// Validates an optional birthday; blank input means absent.
pub fn validate_optional_birthday(
    input: Option<&str>,
) -> Result<Option<String>, PersonValidationError> {
    match input.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => validate_birthday(value).map(Some),
        None => Ok(None),
    }
}

/// Validates an optional email; blank input means absent.
pub fn validate_optional_email(
    input: Option<&str>,
) -> Result<Option<String>, PersonValidationError> {
    match input.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => validate_email(value).map(Some),
        None => Ok(None),
    }
}

impl NewPerson {
    /// Validates all person fields. No storage access.
    pub fn new(
        full_name: &str,
        birthday: Option<&str>,
        email: Option<&str>,
    ) -> Result<Self, PersonValidationError> {
        let name = validate_full_name(full_name)?;
        let birthday_day_month = validate_optional_birthday(birthday)?;
        let email = validate_optional_email(email)?;

        Ok(Self {
            full_name: name.full_name,
            normalized_full_name: name.normalized_full_name,
            birthday_day_month,
            email,
        })
    }
}

impl Person {
    /// Returns the disambiguator shown next to the name.
    ///
    /// Priority: lower-cased email, then `(DD/MM)`, then `(ID: n)`.
    pub fn display_identifier(&self) -> String {
        if let Some(email) = self.display_email() {
            return email;
        }
        if let Some(birthday) = self.display_birthday() {
            return format!("({birthday})");
        }
        format!("(ID: {})", self.id)
    }

    /// Returns the list label for this person.
    ///
    /// When the identifier is an email the caller shows it separately, so
    /// the bare full name is returned.
    pub fn display_name(&self) -> String {
        if self.display_email().is_some() {
            return self.full_name.clone();
        }
        format!("{} {}", self.full_name, self.display_identifier())
    }

    /// Returns display name and identifier together.
    pub fn display(&self) -> PersonDisplay {
        PersonDisplay {
            name: self.display_name(),
            identifier: self.display_identifier(),
        }
    }

    fn display_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase)
    }

    fn display_birthday(&self) -> Option<&str> {
        self.birthday_day_month
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
