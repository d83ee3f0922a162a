use std::collections::BTreeMap;

use kalsim_models::{ConsensusView, MarketTrend, NeighborSignal, Persona, ViralPostSignal};
use serde::{Deserialize, Serialize};

use crate::error::LayerError;
use crate::modules::cognition::CognitionOutput;
use crate::modules::emotion::{EmotionOutput, EmotionState};
use crate::modules::identity::{IdentityOutput, IdentityState};
use crate::modules::market_structure::MarketStructureOutput;
use crate::modules::network_structure::NetworkOutput;
use crate::modules::neurobiology::{NeurobiologicalState, NeurobiologyOutput};
use crate::modules::social_interaction::SocialOutput;

/// What the agent brings into a pipeline pass: persona plus the state left by the previous pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: usize,
    pub persona: Persona,
    pub neuro: NeurobiologicalState,
    pub emotion: EmotionState,
    pub identity: Option<IdentityState>,
    /// Bullishness in `[0, 1]`.
    pub belief: f64,
    pub anchor_price: Option<f64>,
    pub entry_price: Option<f64>,
    pub unrealized_pnl_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSignal {
    pub price: f64,
    pub price_change_pct: f64,
    pub trend: MarketTrend,
    pub volume: u64,
    pub volatility: f64,
    pub short_interest: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialSignal {
    pub sentiment: f64,
    pub consensus_view: ConsensusView,
    pub consensus_strength: f64,
    pub peer_count: usize,
    pub adoption_rate: f64,
    pub trend_velocity: f64,
    pub neighbors: Vec<NeighborSignal>,
    pub viral_posts: Vec<ViralPostSignal>,
    pub rapid_spread: bool,
    pub dominant_group: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InformationSignal {
    pub contrary_to_belief: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    MarketSurge,
    MarketCrash,
    ViralPost,
    Fud,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Stimulus {
    pub kind: StimulusKind,
    pub intensity: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Output of one layer's `process` call.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOutput {
    Neurobiology(NeurobiologyOutput),
    Cognition(CognitionOutput),
    Emotion(EmotionOutput),
    Social(SocialOutput),
    Identity(IdentityOutput),
    Network(NetworkOutput),
    Market(MarketStructureOutput),
    /// Named values from layers outside the standard seven.
    Extension(BTreeMap<String, serde_json::Value>),
}

/// Per-layer output slots filled in during one pipeline pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerOutputs {
    pub neurobiology: Option<NeurobiologyOutput>,
    pub cognition: Option<CognitionOutput>,
    pub emotion: Option<EmotionOutput>,
    pub social: Option<SocialOutput>,
    pub identity: Option<IdentityOutput>,
    pub network: Option<NetworkOutput>,
    pub market: Option<MarketStructureOutput>,
    pub extensions: BTreeMap<String, serde_json::Value>,
}

fn fill<T>(slot: &mut Option<T>, value: T, layer: &str, name: &str) -> Result<(), LayerError> {
    if slot.is_some() {
        return Err(LayerError::DuplicateOutput {
            layer: layer.to_string(),
            slot: name.to_string(),
        });
    }
    *slot = Some(value);
    Ok(())
}

impl LayerOutputs {
    /// Store `output` in its slot. Writing an occupied slot is an error.
    pub fn record(&mut self, layer: &str, output: LayerOutput) -> Result<(), LayerError> {
        match output {
            LayerOutput::Neurobiology(o) => fill(&mut self.neurobiology, o, layer, "neurobiology"),
            LayerOutput::Cognition(o) => fill(&mut self.cognition, o, layer, "cognition"),
            LayerOutput::Emotion(o) => fill(&mut self.emotion, o, layer, "emotion"),
            LayerOutput::Social(o) => fill(&mut self.social, o, layer, "social"),
            LayerOutput::Identity(o) => fill(&mut self.identity, o, layer, "identity"),
            LayerOutput::Network(o) => fill(&mut self.network, o, layer, "network"),
            LayerOutput::Market(o) => fill(&mut self.market, o, layer, "market"),
            LayerOutput::Extension(values) => {
                if let Some(key) = values.keys().find(|k| self.extensions.contains_key(*k)) {
                    return Err(LayerError::DuplicateOutput {
                        layer: layer.to_string(),
                        slot: key.clone(),
                    });
                }
                self.extensions.extend(values);
                Ok(())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything a pipeline pass reads, plus the outputs written so far.
#[derive(Debug, Clone, Default)]
pub struct LayerContext {
    pub agent: AgentSnapshot,
    pub market: MarketSignal,
    pub social: SocialSignal,
    pub information: InformationSignal,
    pub stimulus: Option<Stimulus>,
    pub agent_actions: Vec<OrderSide>,
    pub outputs: LayerOutputs,
}

impl LayerContext {
    pub fn new(agent: AgentSnapshot) -> Self {
        Self {
            agent,
            ..Default::default()
        }
    }

    pub fn with_market(mut self, market: MarketSignal) -> Self {
        self.market = market;
        self
    }

    pub fn with_social(mut self, social: SocialSignal) -> Self {
        self.social = social;
        self
    }

    pub fn with_stimulus(mut self, stimulus: Stimulus) -> Self {
        self.stimulus = Some(stimulus);
        self
    }

    pub fn with_orders(mut self, orders: Vec<OrderSide>) -> Self {
        self.agent_actions = orders;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_write_to_slot_is_rejected() {
        let mut outputs = LayerOutputs::default();
        outputs
            .record("first", LayerOutput::Emotion(EmotionOutput::default()))
            .unwrap();
        let err = outputs
            .record("second", LayerOutput::Emotion(EmotionOutput::default()))
            .unwrap_err();
        assert_eq!(
            err,
            LayerError::DuplicateOutput {
                layer: "second".to_string(),
                slot: "emotion".to_string(),
            }
        );
    }

    #[test]
    fn extension_keys_collide_individually() {
        let mut outputs = LayerOutputs::default();
        let mut first = BTreeMap::new();
        first.insert("hype".to_string(), serde_json::json!(0.4));
        outputs.record("a", LayerOutput::Extension(first)).unwrap();

        let mut other = BTreeMap::new();
        other.insert("gamma".to_string(), serde_json::json!(1));
        outputs.record("b", LayerOutput::Extension(other)).unwrap();

        let mut clash = BTreeMap::new();
        clash.insert("hype".to_string(), serde_json::json!(0.9));
        assert!(matches!(
            outputs.record("c", LayerOutput::Extension(clash)),
            Err(LayerError::DuplicateOutput { slot, .. }) if slot == "hype"
        ));
        assert_eq!(outputs.extensions["hype"], serde_json::json!(0.4));
        assert_eq!(outputs.extensions.len(), 2);
    }

    #[test]
    fn new_context_has_no_outputs() {
        let ctx = LayerContext::new(AgentSnapshot::default());
        assert!(ctx.outputs.is_empty());
        assert!(ctx.stimulus.is_none());
    }
}
