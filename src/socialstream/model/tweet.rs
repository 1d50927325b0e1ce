//! Tweet record: the primary partitioned entity.

use serde::{Deserialize, Serialize};

use super::{
    check_char_len, check_event_timestamp, check_non_negative, check_not_blank, Category,
    Timestamped, Validate,
};

/// A tweet with engagement counters and multi-valued hashtag/mention columns.
///
/// `is_celebrity` and `celebrity_category` are generation-time snapshots of
/// the author's [`super::User::is_celebrity`] classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub tweet_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    /// Seconds since epoch, UTC. Must be positive.
    pub timestamp: i64,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub retweet_count: i64,
    pub like_count: i64,
    pub reply_count: i64,
    pub is_celebrity: bool,
    pub celebrity_category: Category,
}

impl Timestamped for Tweet {
    fn event_timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl Validate for Tweet {
    const ENTITY: &'static str = "tweet";

    fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        check_not_blank(&mut violations, "tweet_id", &self.tweet_id);
        check_not_blank(&mut violations, "user_id", &self.user_id);
        check_not_blank(&mut violations, "username", &self.username);
        check_char_len(&mut violations, "username", &self.username, 1, 50);
        check_not_blank(&mut violations, "content", &self.content);
        if self.content.chars().count() > 280 {
            violations.push("content cannot exceed 280 characters".to_string());
        }
        check_event_timestamp(&mut violations, self.timestamp);
        if self.hashtags.len() > 10 {
            violations.push("cannot have more than 10 hashtags".to_string());
        }
        if self.mentions.len() > 10 {
            violations.push("cannot mention more than 10 users".to_string());
        }
        check_non_negative(&mut violations, "retweet_count", self.retweet_count);
        check_non_negative(&mut violations, "like_count", self.like_count);
        check_non_negative(&mut violations, "reply_count", self.reply_count);
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn valid_tweet() -> Tweet {
        Tweet {
            tweet_id: "tweet_ab12cd34".to_string(),
            user_id: "user_ab12cd34".to_string(),
            username: "testuser".to_string(),
            content: "Just discovered tech! This is going to change everything".to_string(),
            timestamp: 1_722_470_400,
            hashtags: vec!["#bigdata".to_string(), "#tech".to_string()],
            mentions: vec!["@ironman".to_string()],
            retweet_count: 3,
            like_count: 12,
            reply_count: 1,
            is_celebrity: false,
            celebrity_category: Category::Other,
        }
    }

    #[test]
    fn test_valid_tweet_passes() {
        assert!(valid_tweet().validate_or_err().is_ok());
    }

    #[test]
    fn test_zero_timestamp_rejected() {
        let mut tweet = valid_tweet();
        tweet.timestamp = 0;
        let violations = tweet.validate();
        assert_eq!(violations, vec!["timestamp must be positive".to_string()]);
    }

    #[test]
    fn test_content_length_bound() {
        let mut tweet = valid_tweet();
        tweet.content = "x".repeat(281);
        assert!(!tweet.validate().is_empty());
        tweet.content = "x".repeat(280);
        assert!(tweet.validate().is_empty());
    }

    #[test]
    fn test_collection_bounds() {
        let mut tweet = valid_tweet();
        tweet.hashtags = (0..11).map(|i| format!("#tag{}", i)).collect();
        tweet.mentions = (0..11).map(|i| format!("@user{}", i)).collect();
        assert_eq!(tweet.validate().len(), 2);
    }

    #[test]
    fn test_negative_counters_rejected() {
        let mut tweet = valid_tweet();
        tweet.like_count = -1;
        tweet.retweet_count = -1;
        tweet.reply_count = -1;
        assert_eq!(tweet.validate().len(), 3);
    }

    #[test]
    fn test_event_timestamp_matches_field() {
        let tweet = valid_tweet();
        assert_eq!(tweet.event_timestamp(), tweet.timestamp);
    }
}
