use chrono::{DateTime, Utc};
use kalsim_models::{ActionResult, SocialMediaInfo};
use rand::seq::SliceRandom;
use rand::Rng;

const BASE_TOPICS: [&str; 3] = ["$GME", "GameStop", "WallStreetBets"];
const BULLISH_TOPICS: [&str; 3] = ["diamondhands", "tothemoon", "HOLD"];
const BEARISH_TOPICS: [&str; 3] = ["sell", "crash", "paperhands"];
const NEUTRAL_TOPICS: [&str; 3] = ["stocks", "trading", "investing"];

const MAX_MARKET_TOPICS: usize = 5;
const SEED_SAMPLE_SIZE: usize = 5;
const RECENT_WINDOW: usize = 20;
const RECENT_TWEETS: usize = 3;

const TOPIC_TEMPLATES: [&str; 10] = [
    "What do you think about {topic}?",
    "Just saw the latest on {topic}. Thoughts?",
    "The odds on {topic} are interesting. Anyone tracking this?",
    "{topic} - this could be huge!",
    "Keeping an eye on {topic}. Market sentiment looks strong.",
    "Does anyone have insight on {topic}?",
    "The prediction market for {topic} is heating up!",
    "I'm bullish on {topic}. Here's why...",
    "Skeptical about {topic}. What am I missing?",
    "{topic} - make your bets now or regret later!",
];

const DEFAULT_SEED_POSTS: [&str; 15] = [
    "$GME to the moon! 🚀🚀🚀 Diamond hands forever!",
    "Just bought more GME. Holding strong! 💎🙌",
    "The shorts haven't covered yet. This is just the beginning!",
    "GameStop is the future. Don't let the hedge funds win!",
    "Paper hands selling already? We're just getting started!",
    "HOLD THE LINE! Apes together strong! 🦍",
    "Not financial advice but I like the stock $GME",
    "Watching GME charts all day. Can't look away!",
    "The squeeze hasn't squoze yet. Stay strong!",
    "Robinhood halting buys? This is manipulation!",
    "I'm not selling until we hit $1000. Diamond hands!",
    "My wife's boyfriend said to buy more GME",
    "Tendies incoming! 🍗🍗🍗",
    "This is bigger than money. It's about sending a message.",
    "WSB vs Wall Street. History in the making!",
];

/// Templated posts about up to ten market topics.
pub fn seed_posts_from_topics(topics: &[String]) -> Vec<String> {
    topics
        .iter()
        .take(10)
        .flat_map(|topic| {
            TOPIC_TEMPLATES
                .iter()
                .map(move |t| t.replace("{topic}", topic))
        })
        .collect()
}

pub fn default_seed_posts() -> Vec<String> {
    DEFAULT_SEED_POSTS.iter().map(|s| s.to_string()).collect()
}

/// Builds the shared social-media snapshot each step starts from.
#[derive(Debug, Clone)]
pub struct SocialFeed {
    market_topics: Vec<String>,
    seed_posts: Vec<String>,
}

impl SocialFeed {
    /// Seed content comes from `market_topics` when there are any.
    pub fn new(market_topics: Vec<String>) -> Self {
        let seed_posts = if market_topics.is_empty() {
            default_seed_posts()
        } else {
            seed_posts_from_topics(&market_topics)
        };
        Self {
            market_topics,
            seed_posts,
        }
    }

    pub fn seed_posts(&self) -> &[String] {
        &self.seed_posts
    }

    pub fn trending_topics(&self, sentiment: f64) -> Vec<String> {
        let mut topics: Vec<String> = if self.market_topics.is_empty() {
            BASE_TOPICS.iter().map(|s| s.to_string()).collect()
        } else {
            self.market_topics
                .iter()
                .take(MAX_MARKET_TOPICS)
                .cloned()
                .collect()
        };
        let extension = if sentiment > 0.3 {
            BULLISH_TOPICS
        } else if sentiment < -0.3 {
            BEARISH_TOPICS
        } else {
            NEUTRAL_TOPICS
        };
        topics.extend(extension.iter().map(|s| s.to_string()));
        topics
    }

    /// Seed sample plus the latest agent tweets from the tail of the log.
    pub fn snapshot<R: Rng>(
        &self,
        timestamp: DateTime<Utc>,
        sentiment: f64,
        log: &[ActionResult],
        rng: &mut R,
    ) -> SocialMediaInfo {
        let mut tweets: Vec<String> = self
            .seed_posts
            .choose_multiple(rng, SEED_SAMPLE_SIZE)
            .cloned()
            .collect();

        let window = &log[log.len().saturating_sub(RECENT_WINDOW)..];
        let recent: Vec<&ActionResult> = window.iter().filter(|a| a.is_tweet()).collect();
        tweets.extend(
            recent[recent.len().saturating_sub(RECENT_TWEETS)..]
                .iter()
                .map(|a| a.content.clone()),
        );

        SocialMediaInfo::new(
            timestamp,
            self.trending_topics(sentiment),
            tweets,
            (sentiment * 100.0).round() / 100.0,
        )
    }
}
