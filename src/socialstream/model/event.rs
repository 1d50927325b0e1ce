//! Engagement event record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{check_event_timestamp, check_not_blank, Timestamped, Validate};

/// Kind of engagement captured by an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Like,
    Retweet,
    Reply,
    Mention,
    Follow,
    Unfollow,
    Tweet,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Like,
        EventType::Retweet,
        EventType::Reply,
        EventType::Mention,
        EventType::Follow,
        EventType::Unfollow,
        EventType::Tweet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Like => "like",
            EventType::Retweet => "retweet",
            EventType::Reply => "reply",
            EventType::Mention => "mention",
            EventType::Follow => "follow",
            EventType::Unfollow => "unfollow",
            EventType::Tweet => "tweet",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown event type '{}'", s))
    }
}

/// A single engagement event between two entities.
///
/// `target_id` is a tweet id for tweet-directed events and a user id for
/// follow/unfollow events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub event_type: EventType,
    pub user_id: String,
    pub target_id: String,
    /// Seconds since epoch, UTC. Must be positive.
    pub timestamp: i64,
    /// Small JSON payload with location/device context.
    pub metadata: String,
    pub is_celebrity_involved: bool,
    pub celebrity_id: Option<String>,
}

impl Timestamped for Event {
    fn event_timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl Validate for Event {
    const ENTITY: &'static str = "event";

    fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        check_not_blank(&mut violations, "event_id", &self.event_id);
        check_not_blank(&mut violations, "user_id", &self.user_id);
        check_not_blank(&mut violations, "target_id", &self.target_id);
        check_event_timestamp(&mut violations, self.timestamp);
        if self.metadata.chars().count() > 1000 {
            violations.push("metadata cannot exceed 1000 characters".to_string());
        }
        if self.is_celebrity_involved && self.celebrity_id.is_none() {
            violations.push("celebrity_id is required when a celebrity is involved".to_string());
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_event() -> Event {
        Event {
            event_id: "event_ab12cd34".to_string(),
            event_type: EventType::Like,
            user_id: "user_ab12cd34".to_string(),
            target_id: "tweet_ab12cd34".to_string(),
            timestamp: 1_722_470_400,
            metadata: r#"{"location":"US","device":"mobile"}"#.to_string(),
            is_celebrity_involved: false,
            celebrity_id: None,
        }
    }

    #[test]
    fn test_valid_event_passes() {
        assert!(valid_event().validate_or_err().is_ok());
    }

    #[test]
    fn test_event_type_round_trip() {
        for event_type in EventType::ALL {
            assert_eq!(event_type.as_str().parse::<EventType>(), Ok(event_type));
        }
    }

    #[test]
    fn test_celebrity_involvement_requires_id() {
        let mut event = valid_event();
        event.is_celebrity_involved = true;
        assert_eq!(event.validate().len(), 1);
        event.celebrity_id = Some("user_celebrity".to_string());
        assert!(event.validate().is_empty());
    }

    #[test]
    fn test_negative_timestamp_rejected() {
        let mut event = valid_event();
        event.timestamp = -10;
        assert!(!event.validate().is_empty());
    }

    #[test]
    fn test_event_type_serializes_lowercase() {
        let json = serde_json::to_value(valid_event()).unwrap();
        assert_eq!(json["event_type"], "like");
    }
}
