//! Domain records for synthetic social activity
//!
//! Every record type carries its own explicit validation: `validate()` returns
//! the full list of violation descriptions, `validate_or_err()` converts a
//! non-empty list into a [`ValidationError`]. Validation runs before a record
//! is accepted into a batch; the writer and partitioner assume validated input.

pub mod event;
pub mod tweet;
pub mod user;

pub use event::{Event, EventType};
pub use tweet::Tweet;
pub use user::{User, CELEBRITY_THRESHOLD};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A record failed its field constraints before entering a batch.
///
/// Never reaches the writer; surfaced immediately to the caller that
/// constructed the record.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{entity} validation failed: {}", .violations.join("; "))]
pub struct ValidationError {
    /// Record type that failed ("user", "tweet", "event")
    pub entity: &'static str,
    /// One description per violated constraint
    pub violations: Vec<String>,
}

/// Field-constraint validation owned by each record type.
pub trait Validate {
    /// Record type name used in violation reports and storage paths.
    const ENTITY: &'static str;

    /// Collect every constraint violation. Empty means valid.
    fn validate(&self) -> Vec<String>;

    /// Fail with a [`ValidationError`] if any constraint is violated.
    fn validate_or_err(&self) -> Result<(), ValidationError> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                entity: Self::ENTITY,
                violations,
            })
        }
    }
}

/// Access to the event-time field the partitioner keys on.
///
/// Implemented by every record type that lands in a time-partitioned store.
/// The value is seconds since epoch, guaranteed positive for validated
/// records.
pub trait Timestamped {
    fn event_timestamp(&self) -> i64;
}

/// Celebrity category, shared by users and tweets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sports,
    Entertainment,
    Politics,
    Tech,
    Business,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Sports,
        Category::Entertainment,
        Category::Politics,
        Category::Tech,
        Category::Business,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::Politics => "politics",
            Category::Tech => "tech",
            Category::Business => "business",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sports" => Ok(Category::Sports),
            "entertainment" => Ok(Category::Entertainment),
            "politics" => Ok(Category::Politics),
            "tech" => Ok(Category::Tech),
            "business" => Ok(Category::Business),
            "other" => Ok(Category::Other),
            _ => Err(format!(
                "unknown category '{}', expected one of: sports, entertainment, politics, tech, business, other",
                s
            )),
        }
    }
}

// Shared bound checks used by the record validators.

pub(crate) fn check_not_blank(violations: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        violations.push(format!("{} cannot be blank", field));
    }
}

pub(crate) fn check_char_len(
    violations: &mut Vec<String>,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min || len > max {
        violations.push(format!(
            "{} must be between {} and {} characters, got {}",
            field, min, max, len
        ));
    }
}

pub(crate) fn check_non_negative(violations: &mut Vec<String>, field: &str, value: i64) {
    if value < 0 {
        violations.push(format!("{} cannot be negative", field));
    }
}

pub(crate) fn check_event_timestamp(violations: &mut Vec<String>, timestamp: i64) {
    if timestamp <= 0 {
        violations.push("timestamp must be positive".to_string());
    } else if chrono::DateTime::from_timestamp(timestamp, 0).is_none() {
        violations.push(format!("timestamp {} is out of range", timestamp));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn test_category_rejects_unknown() {
        assert!("influencer".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Tech).unwrap();
        assert_eq!(json, "\"tech\"");
    }

    #[test]
    fn test_timestamp_bounds() {
        let mut violations = Vec::new();
        check_event_timestamp(&mut violations, 0);
        check_event_timestamp(&mut violations, -5);
        check_event_timestamp(&mut violations, i64::MAX);
        assert_eq!(violations.len(), 3);

        violations.clear();
        check_event_timestamp(&mut violations, 1_700_000_000);
        assert!(violations.is_empty());
    }
}
