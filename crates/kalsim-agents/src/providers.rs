use std::path::PathBuf;

use async_trait::async_trait;
use kalsim_models::{Beliefs, MarketEvent, Persona, SocialProfile, TrendAnalysis};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::AgentError;

const PERSONALITY_SETS: [[&str; 3]; 5] = [
    ["risk-seeking", "impulsive", "optimistic"],
    ["cautious", "analytical", "skeptical"],
    ["trend-following", "social", "enthusiastic"],
    ["contrarian", "independent", "patient"],
    ["emotional", "reactive", "community-focused"],
];

const INTEREST_SETS: [[&str; 3]; 4] = [
    ["stocks", "crypto", "reddit"],
    ["gaming", "memes", "investing"],
    ["finance", "technology", "social media"],
    ["trading", "entertainment", "news"],
];

const LEVELS: [&str; 3] = ["low", "moderate", "high"];
const OUTLOOKS: [&str; 3] = ["bullish", "neutral", "bearish"];

/// Source of trending prediction-market events.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_trending_events(&self, limit: usize) -> Result<Vec<MarketEvent>, AgentError>;

    fn analyze_trends(&self, events: &[MarketEvent]) -> TrendAnalysis {
        TrendAnalysis::from_events(events)
    }
}

/// Source of personas to populate a simulation with.
#[async_trait]
pub trait PersonaProvider: Send + Sync {
    async fn fetch_user_pool(&self, count: usize) -> Result<Vec<Persona>, AgentError>;
}

/// Market events read from a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileMarketData {
    pub path: PathBuf,
}

impl JsonFileMarketData {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MarketDataProvider for JsonFileMarketData {
    async fn get_trending_events(&self, limit: usize) -> Result<Vec<MarketEvent>, AgentError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let mut events: Vec<MarketEvent> = serde_json::from_str(&raw)?;
        events.sort_by(|a, b| b.volume.total_cmp(&a.volume));
        events.truncate(limit);
        debug!(path = %self.path.display(), count = events.len(), "Loaded market events");
        Ok(events)
    }
}

/// Personas read from a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonPersonaFile {
    pub path: PathBuf,
}

impl JsonPersonaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PersonaProvider for JsonPersonaFile {
    async fn fetch_user_pool(&self, count: usize) -> Result<Vec<Persona>, AgentError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let mut personas: Vec<Persona> = serde_json::from_str(&raw)?;
        if personas.is_empty() {
            return Err(AgentError::Provider(format!(
                "{} contains no personas",
                self.path.display()
            )));
        }
        personas.truncate(count);
        debug!(path = %self.path.display(), count = personas.len(), "Loaded personas");
        Ok(personas)
    }
}

fn pick<R: Rng>(rng: &mut R, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

/// Random personas drawn from fixed trait and interest sets.
pub fn generate_default_personas<R: Rng>(count: usize, rng: &mut R) -> Vec<Persona> {
    (0..count)
        .map(|i| {
            let traits = PERSONALITY_SETS.choose(rng).copied().unwrap_or_default();
            let interests = INTEREST_SETS.choose(rng).copied().unwrap_or_default();
            Persona {
                id: Some(i as u64),
                name: Some(format!("User_{i:03}")),
                personality_traits: traits.iter().map(|s| s.to_string()).collect(),
                interests: interests.iter().map(|s| s.to_string()).collect(),
                beliefs: Beliefs {
                    risk_tolerance: pick(rng, &LEVELS),
                    market_outlook: pick(rng, &OUTLOOKS),
                    trust_in_institutions: pick(rng, &LEVELS),
                },
                social: SocialProfile {
                    follower_count: rng.gen_range(10..=10_000),
                    influence_score: rng.gen::<f64>(),
                },
            }
        })
        .collect()
}
