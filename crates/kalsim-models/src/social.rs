use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction the visible community is leaning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusView {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl ConsensusView {
    /// Bullish above 0.3, bearish below -0.3.
    pub fn from_sentiment(sentiment: f64) -> Self {
        if sentiment > 0.3 {
            Self::Bullish
        } else if sentiment < -0.3 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

/// A peer whose emotion and latest action the agent can see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NeighborSignal {
    pub id: Option<usize>,
    pub valence: f64,
    pub arousal: f64,
    pub action: Option<String>,
    #[serde(default = "default_connection")]
    pub connection_strength: f64,
}

impl NeighborSignal {
    pub fn new(valence: f64, arousal: f64, action: Option<&str>) -> Self {
        Self {
            id: None,
            valence,
            arousal,
            action: action.map(str::to_string),
            connection_strength: default_connection(),
        }
    }
}

/// A post that crossed the virality threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViralPostSignal {
    pub post_id: String,
    pub upvotes: u64,
    pub sentiment: f64,
}

/// Social-media environment snapshot for one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialMediaInfo {
    pub timestamp: DateTime<Utc>,
    pub trending_topics: Vec<String>,
    pub sample_tweets: Vec<String>,
    pub sentiment_score: f64,
    #[serde(default)]
    pub consensus_view: ConsensusView,
    #[serde(default)]
    pub adoption_rate: f64,
    #[serde(default)]
    pub trend_velocity: f64,
    #[serde(default)]
    pub neighbors: Vec<NeighborSignal>,
    #[serde(default)]
    pub viral_posts: Vec<ViralPostSignal>,
    #[serde(default)]
    pub rapid_spread: bool,
}

impl SocialMediaInfo {
    /// Snapshot with only the core fields set.
    pub fn new(
        timestamp: DateTime<Utc>,
        trending_topics: Vec<String>,
        sample_tweets: Vec<String>,
        sentiment_score: f64,
    ) -> Self {
        Self {
            timestamp,
            consensus_view: ConsensusView::from_sentiment(sentiment_score),
            trending_topics,
            sample_tweets,
            sentiment_score,
            adoption_rate: 0.0,
            trend_velocity: 0.0,
            neighbors: Vec::new(),
            viral_posts: Vec::new(),
            rapid_spread: false,
        }
    }
}

fn default_connection() -> f64 {
    0.5
}
