use std::collections::HashSet;

use kalsim_models::Persona;
use serde::{Deserialize, Serialize};

use super::LayerModule;
use crate::context::{LayerContext, LayerOutput};
use crate::error::LayerError;

const WSB_INDICATORS: [&str; 5] = ["wsb", "memes", "reddit", "crypto", "yolo"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityGroup {
    WsbApe,
    RetailInvestor,
    Institutional,
    Skeptic,
    #[default]
    Neutral,
}

impl IdentityGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WsbApe => "WSB_APE",
            Self::RetailInvestor => "RETAIL_INVESTOR",
            Self::Institutional => "INSTITUTIONAL",
            Self::Skeptic => "SKEPTIC",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for IdentityGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IdentityState {
    pub primary_group: IdentityGroup,
    pub group_identification: f64,
    pub in_group_trust: f64,
    pub out_group_trust: f64,
}

/// Signals that make an agent's group identity more salient.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalienceContext {
    pub group_mentions: u32,
    pub in_group_interactions: u32,
    pub threat_to_group: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct IdentityOutput {
    pub identity_group: IdentityGroup,
    pub group_identification: f64,
    pub in_group_trust: f64,
    pub out_group_trust: f64,
    pub group_alignment: f64,
    pub identity_salience: f64,
}

/// Layer 5: collective identity and group trust.
#[derive(Debug, Default)]
pub struct IdentityModule {
    current: Option<IdentityState>,
}

impl IdentityModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<&IdentityState> {
        self.current.as_ref()
    }

    /// Classify a persona into exactly one group. Same persona, same result.
    pub fn assign_identity(persona: &Persona) -> IdentityState {
        let traits: HashSet<String> = persona
            .personality_traits
            .iter()
            .map(|t| t.to_lowercase())
            .collect();
        let interests: HashSet<String> = persona.interests.iter().map(|i| i.to_lowercase()).collect();
        let risk = persona.beliefs.risk_tolerance.to_lowercase();
        let trust = persona.beliefs.trust_in_institutions.to_lowercase();

        let wsb_matches = WSB_INDICATORS
            .iter()
            .filter(|w| interests.contains(**w))
            .count();

        let (primary_group, identification, in_group_trust, out_group_trust) =
            if wsb_matches >= 2 || (wsb_matches >= 1 && risk == "high") {
                (
                    IdentityGroup::WsbApe,
                    0.7 + wsb_matches as f64 * 0.1,
                    0.85,
                    0.2,
                )
            } else if trust == "high" && traits.contains("analytical") {
                let group = if interests.iter().any(|i| i.contains("quantitative")) {
                    IdentityGroup::Institutional
                } else {
                    IdentityGroup::RetailInvestor
                };
                (group, 0.5, 0.6, 0.4)
            } else if traits.contains("skeptical") || trust == "low" {
                (IdentityGroup::Skeptic, 0.4, 0.5, 0.3)
            } else {
                (IdentityGroup::Neutral, 0.3, 0.5, 0.5)
            };

        IdentityState {
            primary_group,
            group_identification: identification.min(1.0),
            in_group_trust,
            out_group_trust,
        }
    }

    /// Scale `base_trust` by how the agent regards the source's group.
    pub fn adjust_trust(identity: &IdentityState, source_group: IdentityGroup, base_trust: f64) -> f64 {
        let adjustment = if source_group == identity.primary_group {
            identity.in_group_trust
        } else if source_group == IdentityGroup::Neutral {
            (identity.in_group_trust + identity.out_group_trust) / 2.0
        } else {
            identity.out_group_trust
        };
        (base_trust * (adjustment / 0.5)).clamp(0.0, 1.0)
    }

    pub fn calculate_conformity_pressure(identity: &IdentityState, consensus_strength: f64) -> f64 {
        (identity.group_identification * consensus_strength).min(1.0)
    }

    /// Raise identification. Never lowers it.
    pub fn update_salience(identity: &IdentityState, context: &SalienceContext) -> IdentityState {
        let mut boost = (f64::from(context.group_mentions) * 0.02).min(0.1);
        boost += (f64::from(context.in_group_interactions) * 0.03).min(0.15);
        if context.threat_to_group {
            boost += 0.2;
        }
        IdentityState {
            group_identification: (identity.group_identification + boost).min(1.0),
            ..*identity
        }
    }
}

impl LayerModule for IdentityModule {
    fn name(&self) -> &'static str {
        "collective_identity"
    }

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError> {
        let identity = match (ctx.agent.identity, self.current) {
            (Some(assigned), _) => assigned,
            (None, Some(cached)) => cached,
            (None, None) => Self::assign_identity(&ctx.agent.persona),
        };
        self.current = Some(identity);

        let dominant_is_wsb = ctx
            .social
            .dominant_group
            .as_deref()
            .is_some_and(|g| g.eq_ignore_ascii_case("wsb"));
        let group_alignment = if dominant_is_wsb && identity.primary_group == IdentityGroup::WsbApe {
            identity.group_identification
        } else {
            0.0
        };

        Ok(LayerOutput::Identity(IdentityOutput {
            identity_group: identity.primary_group,
            group_identification: identity.group_identification,
            in_group_trust: identity.in_group_trust,
            out_group_trust: identity.out_group_trust,
            group_alignment,
            identity_salience: identity.group_identification * 0.8,
        }))
    }

    fn reset(&mut self) -> Result<(), LayerError> {
        self.current = None;
        Ok(())
    }

    fn summarize(&self) -> String {
        match &self.current {
            Some(id) => format!(
                "Group: {}, Identification: {:.2}, In-group trust: {:.2}",
                id.primary_group, id.group_identification, id.in_group_trust
            ),
            None => "No identity assigned".to_string(),
        }
    }
}
