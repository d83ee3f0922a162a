use kalsim_models::ConsensusView;
use serde::{Deserialize, Serialize};

use super::{clamp01, LayerModule};
use crate::context::{LayerContext, LayerOutput};
use crate::error::LayerError;

/// Fixed trait strengths. Processing reads these and never changes them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CognitiveBiases {
    pub social_proof: f64,
    pub confirmation_bias: f64,
    pub anchoring: f64,
    pub loss_aversion: f64,
    pub bandwagon: f64,
    pub overconfidence: f64,
}

impl Default for CognitiveBiases {
    fn default() -> Self {
        Self {
            social_proof: 0.5,
            confirmation_bias: 0.5,
            anchoring: 0.5,
            loss_aversion: 0.6,
            bandwagon: 0.5,
            overconfidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveBias {
    SocialProof,
    ConfirmationBias,
    Anchoring,
    LossAversion,
    Bandwagon,
}

impl CognitiveBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SocialProof => "social_proof",
            Self::ConfirmationBias => "confirmation_bias",
            Self::Anchoring => "anchoring",
            Self::LossAversion => "loss_aversion",
            Self::Bandwagon => "bandwagon",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CognitionOutput {
    pub adjusted_belief: f64,
    pub information_acceptance: f64,
    pub anchoring_effect: f64,
    pub perceived_overvaluation: f64,
    pub sell_reluctance: f64,
    pub bandwagon_effect: f64,
    pub active_biases: Vec<CognitiveBias>,
    /// Share of the five frame biases that fired.
    pub cognitive_load: f64,
    /// Trait strengths the frame was computed with.
    pub biases: CognitiveBiases,
}

/// Layer 2: effects of static cognitive biases on one frame of context.
#[derive(Debug, Default)]
pub struct CognitionModule {
    biases: CognitiveBiases,
    active: Vec<CognitiveBias>,
}

impl CognitionModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_biases(biases: CognitiveBiases) -> Self {
        Self {
            biases,
            active: Vec::new(),
        }
    }

    pub fn biases(&self) -> &CognitiveBiases {
        &self.biases
    }

    /// Mean of all six trait strengths.
    pub fn calculate_bias_strength(biases: &CognitiveBiases) -> f64 {
        (biases.social_proof
            + biases.confirmation_bias
            + biases.anchoring
            + biases.loss_aversion
            + biases.bandwagon
            + biases.overconfidence)
            / 6.0
    }

    fn social_proof(&mut self, ctx: &LayerContext) -> f64 {
        let social = &ctx.social;
        let consensus_value = match social.consensus_view {
            ConsensusView::Bullish => social.consensus_strength,
            ConsensusView::Bearish => -social.consensus_strength,
            ConsensusView::Neutral => 0.0,
        };
        let peer_factor = (social.peer_count as f64 / 50.0).min(1.0);
        let effect = self.biases.social_proof * social.consensus_strength * peer_factor;
        if effect > 0.2 {
            self.active.push(CognitiveBias::SocialProof);
        }
        clamp01(ctx.agent.belief + consensus_value * effect * 0.3)
    }

    fn confirmation(&mut self, ctx: &LayerContext) -> f64 {
        if !ctx.information.contrary_to_belief {
            return 1.0;
        }
        let strength = self.biases.confirmation_bias;
        if strength > 0.3 {
            self.active.push(CognitiveBias::ConfirmationBias);
        }
        1.0 - strength * 0.7
    }

    /// Returns `(anchoring_effect, perceived_overvaluation)`.
    fn anchoring(&mut self, ctx: &LayerContext) -> (f64, f64) {
        let anchor = match ctx.agent.anchor_price {
            Some(a) if a > 0.0 => a,
            _ => return (0.0, 0.0),
        };
        let deviation = (ctx.market.price - anchor) / anchor;
        let effect = self.biases.anchoring * deviation.abs();
        let overvaluation = if deviation > 1.0 {
            effect * (deviation / 10.0)
        } else {
            0.0
        };
        if effect > 0.2 {
            self.active.push(CognitiveBias::Anchoring);
        }
        (effect, overvaluation)
    }

    fn loss_aversion(&mut self, ctx: &LayerContext) -> f64 {
        let entry = match ctx.agent.entry_price {
            Some(e) if e > 0.0 => e,
            _ => return 0.0,
        };
        let pnl_ratio = (ctx.market.price - entry) / entry;
        if pnl_ratio < 0.0 {
            self.active.push(CognitiveBias::LossAversion);
            (self.biases.loss_aversion * pnl_ratio.abs()).min(1.0)
        } else {
            0.0
        }
    }

    fn bandwagon(&mut self, ctx: &LayerContext) -> f64 {
        let adoption = ctx.social.adoption_rate;
        let velocity = ctx.social.trend_velocity;
        if adoption > 0.5 || velocity > 0.5 {
            self.active.push(CognitiveBias::Bandwagon);
            self.biases.bandwagon * (adoption + velocity) / 2.0
        } else {
            0.0
        }
    }
}

impl LayerModule for CognitionModule {
    fn name(&self) -> &'static str {
        "cognition"
    }

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError> {
        self.active.clear();

        let adjusted_belief = self.social_proof(ctx);
        let information_acceptance = self.confirmation(ctx);
        let (anchoring_effect, perceived_overvaluation) = self.anchoring(ctx);
        let sell_reluctance = self.loss_aversion(ctx);
        let bandwagon_effect = self.bandwagon(ctx);

        Ok(LayerOutput::Cognition(CognitionOutput {
            adjusted_belief,
            information_acceptance,
            anchoring_effect,
            perceived_overvaluation,
            sell_reluctance,
            bandwagon_effect,
            cognitive_load: self.active.len() as f64 / 5.0,
            active_biases: self.active.clone(),
            biases: self.biases,
        }))
    }

    fn reset(&mut self) -> Result<(), LayerError> {
        self.biases = CognitiveBiases::default();
        self.active.clear();
        Ok(())
    }

    fn summarize(&self) -> String {
        let active = if self.active.is_empty() {
            "none".to_string()
        } else {
            self.active
                .iter()
                .map(CognitiveBias::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Active biases: {}, Social proof: {:.2}, Confirmation: {:.2}",
            active, self.biases.social_proof, self.biases.confirmation_bias
        )
    }
}
