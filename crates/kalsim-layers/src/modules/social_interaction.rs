use std::collections::HashMap;

use kalsim_models::{NeighborSignal, SocialProfile};
use serde::{Deserialize, Serialize};

use super::LayerModule;
use crate::context::{LayerContext, LayerOutput};
use crate::error::LayerError;

const HERDING_THRESHOLD: f64 = 0.7;
const HERDING_MIN_ACTIONS: usize = 3;

/// A point in valence/arousal space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Affect {
    pub valence: f64,
    pub arousal: f64,
}

impl Default for Affect {
    fn default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.5,
        }
    }
}

/// Emotional contagion between connected agents.
#[derive(Debug, Clone, Copy)]
pub struct EmotionContagion {
    pub susceptibility: f64,
}

impl Default for EmotionContagion {
    fn default() -> Self {
        Self { susceptibility: 0.5 }
    }
}

impl EmotionContagion {
    /// Move `target` toward `source` by `susceptibility * connection_strength`.
    pub fn propagate(&self, source: Affect, target: Affect, connection_strength: f64) -> Affect {
        let k = self.susceptibility * connection_strength;
        Affect {
            valence: (target.valence * (1.0 - k) + source.valence * k).clamp(-1.0, 1.0),
            arousal: (target.arousal * (1.0 - k) + source.arousal * k).clamp(0.0, 1.0),
        }
    }
}

pub struct SocialInfluence;

impl SocialInfluence {
    /// Influence of `source` over `target` in `[0, 1]`.
    pub fn calculate(source: &SocialProfile, target: &SocialProfile) -> f64 {
        let follower_ratio = if target.follower_count == 0 {
            1.0
        } else {
            (source.follower_count as f64 / target.follower_count.max(1) as f64).min(10.0) / 10.0
        };
        let gap = (source.influence_score - target.influence_score).max(0.0);
        (0.3 * source.influence_score + 0.3 * follower_ratio + 0.4 * gap).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SocialOutput {
    pub emotion_received: Affect,
    pub social_pressure: f64,
    pub herding_detected: bool,
    pub neighbor_influence: f64,
    pub emotional_alignment: f64,
}

/// Layer 4: contagion, social pressure and herding.
#[derive(Debug, Default)]
pub struct SocialInteractionModule {
    contagion: EmotionContagion,
    last_pressure: f64,
    last_received: Option<Affect>,
}

impl SocialInteractionModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_susceptibility(susceptibility: f64) -> Self {
        Self {
            contagion: EmotionContagion { susceptibility },
            ..Self::default()
        }
    }

    /// Connection-weighted mean of neighbor emotions.
    pub fn aggregate_emotions(neighbors: &[NeighborSignal]) -> Affect {
        if neighbors.is_empty() {
            return Affect::default();
        }
        let total: f64 = neighbors.iter().map(|n| n.connection_strength).sum();
        let total = if total == 0.0 { 1.0 } else { total };
        neighbors.iter().fold(
            Affect {
                valence: 0.0,
                arousal: 0.0,
            },
            |acc, n| {
                let w = n.connection_strength / total;
                Affect {
                    valence: acc.valence + n.valence * w,
                    arousal: acc.arousal + n.arousal * w,
                }
            },
        )
    }

    /// True when at least three neighbors report an action and one action
    /// accounts for 70% or more of those reports.
    pub fn detect_herding(neighbors: &[NeighborSignal]) -> bool {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for action in neighbors.iter().filter_map(|n| n.action.as_deref()) {
            *counts.entry(action).or_default() += 1;
        }
        let reported: usize = counts.values().sum();
        if reported < HERDING_MIN_ACTIONS {
            return false;
        }
        let max = counts.values().copied().max().unwrap_or(0);
        max as f64 / reported as f64 >= HERDING_THRESHOLD
    }

    fn alignment(original: Affect, received: Affect) -> f64 {
        let dv = (original.valence - received.valence).abs();
        let da = (original.arousal - received.arousal).abs();
        1.0 - (dv + da) / 2.0
    }
}

impl LayerModule for SocialInteractionModule {
    fn name(&self) -> &'static str {
        "social_interaction"
    }

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError> {
        let neighbors = &ctx.social.neighbors;

        // Prefer this pass's emotion output over the carried-in state.
        let own = match &ctx.outputs.emotion {
            Some(e) => Affect {
                valence: e.valence,
                arousal: e.arousal,
            },
            None => Affect {
                valence: ctx.agent.emotion.valence,
                arousal: ctx.agent.emotion.arousal,
            },
        };

        let received = if neighbors.is_empty() {
            own
        } else {
            let aggregated = Self::aggregate_emotions(neighbors);
            let avg_connection = neighbors.iter().map(|n| n.connection_strength).sum::<f64>()
                / neighbors.len() as f64;
            self.contagion.propagate(aggregated, own, avg_connection)
        };

        let social_pressure =
            ctx.social.consensus_strength * (neighbors.len() as f64 / 10.0).min(1.0);

        self.last_received = Some(received);
        self.last_pressure = social_pressure;

        Ok(LayerOutput::Social(SocialOutput {
            emotion_received: received,
            social_pressure,
            herding_detected: Self::detect_herding(neighbors),
            neighbor_influence: neighbors.len() as f64 / 10.0,
            emotional_alignment: Self::alignment(own, received),
        }))
    }

    fn reset(&mut self) -> Result<(), LayerError> {
        self.last_pressure = 0.0;
        self.last_received = None;
        Ok(())
    }

    fn summarize(&self) -> String {
        let received = match self.last_received {
            Some(a) => format!("v={:.2}, a={:.2}", a.valence, a.arousal),
            None => "None".to_string(),
        };
        format!(
            "Social pressure: {:.2}, Emotion received: {}",
            self.last_pressure, received
        )
    }
}
