//! User record and the celebrity classification rule.

use serde::{Deserialize, Serialize};

use super::{
    check_char_len, check_non_negative, check_not_blank, Category, Validate,
};

/// Follower-count cutoff above which a user is classified as a celebrity.
///
/// This is the single source of truth for celebrity status: the generator
/// snapshots [`User::is_celebrity`] onto tweets at creation time, and nothing
/// recomputes the stored flag afterwards.
pub const CELEBRITY_THRESHOLD: i64 = 100_000;

/// A social-network user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub follower_count: i64,
    pub following_count: i64,
    pub tweet_count: i64,
    pub verified: bool,
    pub bio: String,
    /// Only meaningful for celebrities; regular users default to `other`.
    pub category: Category,
}

impl User {
    /// Celebrity status derived from the follower count, never stored.
    pub fn is_celebrity(&self) -> bool {
        self.follower_count >= CELEBRITY_THRESHOLD
    }

    /// Category to attribute celebrity content to. `Other` for regular users
    /// regardless of their profile category.
    pub fn celebrity_category(&self) -> Category {
        if self.is_celebrity() {
            self.category
        } else {
            Category::Other
        }
    }
}

impl Validate for User {
    const ENTITY: &'static str = "user";

    fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        check_not_blank(&mut violations, "user_id", &self.user_id);
        check_not_blank(&mut violations, "username", &self.username);
        check_char_len(&mut violations, "username", &self.username, 1, 50);
        check_not_blank(&mut violations, "display_name", &self.display_name);
        check_char_len(&mut violations, "display_name", &self.display_name, 1, 100);
        check_non_negative(&mut violations, "follower_count", self.follower_count);
        check_non_negative(&mut violations, "following_count", self.following_count);
        check_non_negative(&mut violations, "tweet_count", self.tweet_count);
        if self.bio.chars().count() > 500 {
            violations.push("bio cannot exceed 500 characters".to_string());
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_user() -> User {
        User {
            user_id: "user_ab12cd34".to_string(),
            username: "testuser".to_string(),
            display_name: "Test User".to_string(),
            follower_count: 1_000,
            following_count: 100,
            tweet_count: 10,
            verified: false,
            bio: "Just a regular user sharing thoughts".to_string(),
            category: Category::Other,
        }
    }

    #[test]
    fn test_valid_user_passes() {
        assert!(valid_user().validate().is_empty());
        assert!(valid_user().validate_or_err().is_ok());
    }

    #[test]
    fn test_celebrity_threshold_boundary() {
        let mut user = valid_user();
        user.follower_count = CELEBRITY_THRESHOLD - 1;
        assert!(!user.is_celebrity());
        user.follower_count = CELEBRITY_THRESHOLD;
        assert!(user.is_celebrity());
    }

    #[test]
    fn test_celebrity_category_only_for_celebrities() {
        let mut user = valid_user();
        user.category = Category::Tech;
        assert_eq!(user.celebrity_category(), Category::Other);
        user.follower_count = CELEBRITY_THRESHOLD;
        assert_eq!(user.celebrity_category(), Category::Tech);
    }

    #[test]
    fn test_blank_and_oversize_fields_rejected() {
        let mut user = valid_user();
        user.user_id = "  ".to_string();
        user.display_name = "x".repeat(101);
        user.follower_count = -1;
        let violations = user.validate();
        assert_eq!(violations.len(), 3);
        let err = user.validate_or_err().unwrap_err();
        assert_eq!(err.entity, "user");
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(valid_user()).unwrap();
        for key in [
            "user_id",
            "username",
            "display_name",
            "follower_count",
            "following_count",
            "tweet_count",
            "verified",
            "bio",
            "category",
        ] {
            assert!(json.get(key).is_some(), "missing wire field {}", key);
        }
    }
}
