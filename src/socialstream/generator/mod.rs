//! Synthetic record generation
//!
//! Produces users, tweets and engagement events with internally consistent
//! cross-field relationships: engagement counters are multiplier-scaled for
//! authors whose follower count clears [`CELEBRITY_THRESHOLD`], and the
//! celebrity flag stored on a tweet is always the snapshot of that
//! computation. Every generated record passes its own validation.
//!
//! Generation is pseudo-random with no reproducibility contract; a seed
//! constructor exists so tests can pin a sequence.

use chrono::Utc;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::HashSet;

use super::model::{Category, Event, EventType, Tweet, User, CELEBRITY_THRESHOLD};

const TECH_CELEBRITIES: &[&str] = &[
    "Elon Musk",
    "Bill Gates",
    "Tim Cook",
    "Satya Nadella",
    "Jeff Bezos",
];

const SPORTS_CELEBRITIES: &[&str] = &[
    "LeBron James",
    "Cristiano Ronaldo",
    "Serena Williams",
    "Tom Brady",
    "Lionel Messi",
];

const ENTERTAINMENT_CELEBRITIES: &[&str] = &[
    "Taylor Swift",
    "Dwayne Johnson",
    "Oprah Winfrey",
    "Ellen DeGeneres",
    "Ryan Reynolds",
];

const SAMPLE_HASHTAGS: &[&str] = &[
    "#bigdata",
    "#hadoop",
    "#spark",
    "#kafka",
    "#analytics",
    "#ml",
    "#ai",
    "#tech",
    "#innovation",
    "#data",
];

const SAMPLE_MENTIONS: &[&str] = &[
    "@ironman",
    "@spiderman",
    "@batman",
    "@superman",
    "@wonderwoman",
    "@captain_america",
    "@thor",
    "@hulk",
    "@blackwidow",
    "@hawkeye",
    "@flash",
    "@aquaman",
    "@deadpool",
    "@wolverine",
    "@starlord",
    "@gamora",
    "@rocket",
    "@groot",
    "@blackpanther",
    "@drstrange",
];

const TWEET_TEMPLATES: &[&str] = &[
    "Just discovered {a}! This is going to change everything in {b} {tag}",
    "Working on some exciting {a} projects. The future of {b} looks bright! {tag}",
    "Big announcement coming soon about {a} and {b}! Stay tuned {tag}",
    "Love seeing the progress in {a} technology. {b} is the way forward! {tag}",
    "Thoughts on the latest {a} trends? {b} seems to be gaining momentum {tag}",
];

const LOCATIONS: &[&str] = &["US", "UK", "CA", "DE", "FR", "JP", "AU", "BR"];
const DEVICES: &[&str] = &["mobile", "desktop", "tablet"];

/// Inclusive range of epoch seconds to draw event timestamps from.
///
/// Defaults to "now" for every record; a wider range spreads records across
/// multiple hourly partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> TimeRange {
        TimeRange {
            start: start.min(end).max(1),
            end: end.max(start).max(1),
        }
    }
}

/// Generator for synthetic social activity.
pub struct DataGenerator {
    rng: StdRng,
    time_range: Option<TimeRange>,
}

impl DataGenerator {
    /// Create a generator with an optional seed. `None` draws from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            time_range: None,
        }
    }

    /// Draw event timestamps uniformly from `range` instead of "now".
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    fn next_timestamp(&mut self) -> i64 {
        match self.time_range {
            Some(range) => self.rng.gen_range(range.start..=range.end),
            None => Utc::now().timestamp(),
        }
    }

    fn short_id(&mut self, prefix: &str) -> String {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}", prefix, &uuid[..8])
    }

    /// A user whose follower count clears the celebrity threshold.
    pub fn generate_celebrity(&mut self) -> User {
        let category = *Category::ALL.choose(&mut self.rng).unwrap_or(&Category::Other);
        let name = match category {
            Category::Tech => TECH_CELEBRITIES.choose(&mut self.rng),
            Category::Sports => SPORTS_CELEBRITIES.choose(&mut self.rng),
            Category::Entertainment => ENTERTAINMENT_CELEBRITIES.choose(&mut self.rng),
            _ => None,
        }
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("Celebrity {}", self.rng.gen_range(0..1000)));

        let username = format!(
            "{}_{}",
            name.to_lowercase().replace(' ', "_"),
            self.rng.gen_range(0..100)
        );

        User {
            user_id: self.short_id("user"),
            username,
            display_name: name,
            follower_count: self.rng.gen_range(CELEBRITY_THRESHOLD..50_000_000),
            following_count: self.rng.gen_range(100..10_000),
            tweet_count: self.rng.gen_range(1_000..51_000),
            verified: self.rng.gen_bool(0.7),
            bio: format!("{} expert and thought leader in {}", category, category),
            category,
        }
    }

    /// A user safely below the celebrity threshold.
    pub fn generate_regular_user(&mut self) -> User {
        User {
            user_id: self.short_id("user"),
            username: format!("user_{}", self.rng.gen_range(0..100_000)),
            display_name: format!("User {}", self.rng.gen_range(0..10_000)),
            follower_count: self.rng.gen_range(10..50_000),
            following_count: self.rng.gen_range(50..2_000),
            tweet_count: self.rng.gen_range(10..1_010),
            verified: self.rng.gen_bool(0.05),
            bio: "Just a regular user sharing thoughts".to_string(),
            category: Category::Other,
        }
    }

    /// A tweet authored by `user`, engagement scaled by celebrity status.
    pub fn generate_tweet(&mut self, user: &User) -> Tweet {
        let template = TWEET_TEMPLATES.choose(&mut self.rng).unwrap_or(&TWEET_TEMPLATES[0]);
        let category = user.category;
        let tag = SAMPLE_HASHTAGS.choose(&mut self.rng).unwrap_or(&"#data");
        let content: String = template
            .replace("{a}", category.as_str())
            .replace("{b}", "technology")
            .replace("{tag}", tag)
            .chars()
            .take(280)
            .collect();

        let hashtags = vec![
            SAMPLE_HASHTAGS
                .choose(&mut self.rng)
                .unwrap_or(&"#data")
                .to_string(),
            format!("#{}", category),
        ];

        // 1 to 3 distinct mentions
        let mention_count = self.rng.gen_range(1..=3);
        let mut mentions = HashSet::new();
        while mentions.len() < mention_count {
            if let Some(mention) = SAMPLE_MENTIONS.choose(&mut self.rng) {
                mentions.insert(mention.to_string());
            }
        }

        let is_celebrity = user.is_celebrity();
        let multiplier = if is_celebrity { 10 } else { 1 };

        Tweet {
            tweet_id: self.short_id("tweet"),
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            content,
            timestamp: self.next_timestamp(),
            hashtags,
            mentions: mentions.into_iter().collect(),
            retweet_count: self.rng.gen_range(0..500 * multiplier),
            like_count: self.rng.gen_range(0..1_000 * multiplier),
            reply_count: self.rng.gen_range(0..100 * multiplier),
            is_celebrity,
            celebrity_category: user.celebrity_category(),
        }
    }

    /// An engagement event between `user_id` and `target_id`.
    pub fn generate_event(
        &mut self,
        user_id: &str,
        target_id: &str,
        celebrity_involved: bool,
        celebrity_id: Option<&str>,
    ) -> Event {
        let location = LOCATIONS.choose(&mut self.rng).unwrap_or(&"US");
        let device = DEVICES.choose(&mut self.rng).unwrap_or(&"mobile");
        Event {
            event_id: self.short_id("event"),
            event_type: *EventType::ALL.choose(&mut self.rng).unwrap_or(&EventType::Like),
            user_id: user_id.to_string(),
            target_id: target_id.to_string(),
            timestamp: self.next_timestamp(),
            metadata: format!(r#"{{"location":"{}","device":"{}"}}"#, location, device),
            is_celebrity_involved: celebrity_involved,
            celebrity_id: celebrity_id.map(|id| id.to_string()),
        }
    }

    /// Bulk tweet generation with roughly one celebrity author in five.
    pub fn generate_tweets(&mut self, count: usize) -> Vec<Tweet> {
        let mut tweets = Vec::with_capacity(count);
        for _ in 0..count {
            let user = if self.rng.gen_bool(0.2) {
                self.generate_celebrity()
            } else {
                self.generate_regular_user()
            };
            tweets.push(self.generate_tweet(&user));
        }
        tweets
    }

    /// Bulk event generation over synthetic user/tweet id pairs.
    pub fn generate_events(&mut self, count: usize) -> Vec<Event> {
        let mut events = Vec::with_capacity(count);
        for _ in 0..count {
            let user = self.generate_regular_user();
            let celebrity_involved = self.rng.gen_bool(0.3);
            let celebrity = if celebrity_involved {
                Some(self.generate_celebrity())
            } else {
                None
            };
            let target_id = self.short_id("tweet");
            events.push(self.generate_event(
                &user.user_id,
                &target_id,
                celebrity_involved,
                celebrity.as_ref().map(|c| c.user_id.as_str()),
            ));
        }
        events
    }

    /// Bulk user generation, one celebrity in five.
    pub fn generate_users(&mut self, count: usize) -> Vec<User> {
        (0..count)
            .map(|_| {
                if self.rng.gen_bool(0.2) {
                    self.generate_celebrity()
                } else {
                    self.generate_regular_user()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socialstream::model::Validate;

    #[test]
    fn test_generated_records_always_validate() {
        let mut generator = DataGenerator::new(Some(7));
        for tweet in generator.generate_tweets(200) {
            assert!(
                tweet.validate().is_empty(),
                "invalid tweet: {:?}",
                tweet.validate()
            );
        }
        for event in generator.generate_events(100) {
            assert!(event.validate().is_empty());
        }
        for user in generator.generate_users(100) {
            assert!(user.validate().is_empty());
        }
    }

    #[test]
    fn test_celebrity_flag_agrees_with_follower_threshold() {
        let mut generator = DataGenerator::new(Some(11));
        let celebrity = generator.generate_celebrity();
        assert!(celebrity.follower_count >= CELEBRITY_THRESHOLD);
        let tweet = generator.generate_tweet(&celebrity);
        assert!(tweet.is_celebrity);
        assert_eq!(tweet.celebrity_category, celebrity.category);

        let regular = generator.generate_regular_user();
        assert!(regular.follower_count < CELEBRITY_THRESHOLD);
        let tweet = generator.generate_tweet(&regular);
        assert!(!tweet.is_celebrity);
        assert_eq!(tweet.celebrity_category, Category::Other);
    }

    #[test]
    fn test_mentions_are_distinct_and_bounded() {
        let mut generator = DataGenerator::new(Some(3));
        let user = generator.generate_regular_user();
        for _ in 0..50 {
            let tweet = generator.generate_tweet(&user);
            let distinct: HashSet<_> = tweet.mentions.iter().collect();
            assert_eq!(distinct.len(), tweet.mentions.len());
            assert!((1..=3).contains(&tweet.mentions.len()));
        }
    }

    #[test]
    fn test_time_range_spreads_timestamps() {
        let range = TimeRange::new(1_722_517_200, 1_722_524_400);
        let mut generator = DataGenerator::new(Some(5)).with_time_range(range);
        for tweet in generator.generate_tweets(100) {
            assert!(tweet.timestamp >= range.start && tweet.timestamp <= range.end);
        }
    }
}
