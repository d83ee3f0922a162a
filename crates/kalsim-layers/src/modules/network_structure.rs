use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LayerModule;
use crate::context::{LayerContext, LayerOutput};
use crate::error::LayerError;

pub const DEFAULT_VIRAL_THRESHOLD: u64 = 1000;
const CASCADE_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformPost {
    pub id: String,
    pub author_id: usize,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub community: String,
    pub upvotes: u64,
    pub comments: u64,
    pub awards: u64,
    /// Keyword polarity of the content.
    pub sentiment: f64,
}

impl PlatformPost {
    pub fn engagement_score(&self) -> u64 {
        self.upvotes + self.comments * 2 + self.awards * 10
    }
}

/// A forum with upvote-driven virality.
#[derive(Debug, Clone)]
pub struct Platform {
    posts: HashMap<String, PlatformPost>,
    voters: HashMap<String, HashSet<usize>>,
    viral_threshold: u64,
}

impl Default for Platform {
    fn default() -> Self {
        Self::new(DEFAULT_VIRAL_THRESHOLD)
    }
}

impl Platform {
    pub fn new(viral_threshold: u64) -> Self {
        Self {
            posts: HashMap::new(),
            voters: HashMap::new(),
            viral_threshold: viral_threshold.max(1),
        }
    }

    pub fn viral_threshold(&self) -> u64 {
        self.viral_threshold
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, post_id: &str) -> Option<&PlatformPost> {
        self.posts.get(post_id)
    }

    pub fn create_post(
        &mut self,
        author_id: usize,
        content: &str,
        sentiment: f64,
        timestamp: DateTime<Utc>,
    ) -> &PlatformPost {
        let simple = Uuid::new_v4().simple().to_string();
        let id = format!("post_{}", &simple[..8]);
        self.voters.insert(id.clone(), HashSet::new());
        self.posts.entry(id.clone()).or_insert(PlatformPost {
            id,
            author_id,
            content: content.to_string(),
            timestamp,
            community: "wallstreetbets".to_string(),
            upvotes: 0,
            comments: 0,
            awards: 0,
            sentiment,
        })
    }

    /// Register one vote. Returns false for unknown posts and repeat voters.
    pub fn upvote(&mut self, post_id: &str, voter_id: usize) -> bool {
        let Some(post) = self.posts.get_mut(post_id) else {
            return false;
        };
        if !self.voters.entry(post_id.to_string()).or_default().insert(voter_id) {
            return false;
        }
        post.upvotes += 1;
        true
    }

    pub fn is_viral(&self, post: &PlatformPost) -> bool {
        post.upvotes >= self.viral_threshold
    }

    pub fn viral_posts(&self) -> Vec<&PlatformPost> {
        let mut viral: Vec<&PlatformPost> = self.posts.values().filter(|p| self.is_viral(p)).collect();
        viral.sort_by(|a, b| b.upvotes.cmp(&a.upvotes).then_with(|| a.id.cmp(&b.id)));
        viral
    }

    /// `upvotes / threshold` capped at 5 for viral posts, otherwise 1.
    pub fn viral_spread_factor(&self, post_id: &str) -> f64 {
        match self.posts.get(post_id) {
            Some(post) if self.is_viral(post) => {
                (post.upvotes as f64 / self.viral_threshold as f64).min(5.0)
            }
            _ => 1.0,
        }
    }

    pub fn trending_posts(&self, limit: usize) -> Vec<&PlatformPost> {
        let mut posts: Vec<&PlatformPost> = self.posts.values().collect();
        posts.sort_by(|a, b| {
            b.engagement_score()
                .cmp(&a.engagement_score())
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        posts.truncate(limit);
        posts
    }

    /// Newest posts first.
    pub fn recent_posts(&self, limit: usize) -> Vec<&PlatformPost> {
        let mut posts: Vec<&PlatformPost> = self.posts.values().collect();
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        posts.truncate(limit);
        posts
    }

    /// Largest share of posts written by a single author.
    pub fn concentration(&self) -> f64 {
        if self.posts.is_empty() {
            return 0.0;
        }
        let mut per_author: HashMap<usize, usize> = HashMap::new();
        for post in self.posts.values() {
            *per_author.entry(post.author_id).or_default() += 1;
        }
        let max = per_author.values().copied().max().unwrap_or(0);
        max as f64 / self.posts.len() as f64
    }

    pub fn clear(&mut self) {
        self.posts.clear();
        self.voters.clear();
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkOutput {
    pub viral_exposure: bool,
    pub virality_intensity: f64,
    pub information_cascade: bool,
    pub viral_post_count: usize,
    pub viral_sentiment: f64,
    pub network_activation: f64,
}

/// Layer 6: exposure to viral content and information cascades.
#[derive(Debug, Default)]
pub struct NetworkStructureModule {
    platform: Platform,
    last_viral_count: usize,
    last_activation: f64,
}

impl NetworkStructureModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viral_threshold(viral_threshold: u64) -> Self {
        Self {
            platform: Platform::new(viral_threshold),
            ..Self::default()
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut Platform {
        &mut self.platform
    }

    pub fn platform_concentration(&self) -> f64 {
        self.platform.concentration()
    }
}

impl LayerModule for NetworkStructureModule {
    fn name(&self) -> &'static str {
        "network_structure"
    }

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError> {
        let viral = &ctx.social.viral_posts;
        let count = viral.len();

        let virality_intensity = if viral.is_empty() {
            0.0
        } else {
            (viral.iter().map(|p| p.upvotes).sum::<u64>() as f64 / 10_000.0).min(1.0)
        };
        let information_cascade = count >= CASCADE_THRESHOLD || ctx.social.rapid_spread;
        let viral_sentiment = if viral.is_empty() {
            0.0
        } else {
            viral.iter().map(|p| p.sentiment).sum::<f64>() / count as f64
        };
        let network_activation =
            virality_intensity * 0.5 + if information_cascade { 0.3 } else { 0.0 };

        self.last_viral_count = count;
        self.last_activation = network_activation;

        Ok(LayerOutput::Network(NetworkOutput {
            viral_exposure: count > 0,
            virality_intensity,
            information_cascade,
            viral_post_count: count,
            viral_sentiment,
            network_activation,
        }))
    }

    fn reset(&mut self) -> Result<(), LayerError> {
        self.platform.clear();
        self.last_viral_count = 0;
        self.last_activation = 0.0;
        Ok(())
    }

    fn summarize(&self) -> String {
        format!(
            "Viral posts seen: {}, Activation: {:.2}, Platform posts: {}",
            self.last_viral_count,
            self.last_activation,
            self.platform.len()
        )
    }
}
