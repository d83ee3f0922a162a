use serde::{Deserialize, Serialize};

/// Stated beliefs of a persona. Values are free-form levels as produced by
/// persona sources ("low", "moderate", "high"; "bullish", "neutral", "bearish").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Beliefs {
    #[serde(default = "default_level")]
    pub risk_tolerance: String,
    #[serde(default = "default_outlook")]
    pub market_outlook: String,
    #[serde(default = "default_level")]
    pub trust_in_institutions: String,
}

impl Default for Beliefs {
    fn default() -> Self {
        Self {
            risk_tolerance: default_level(),
            market_outlook: default_outlook(),
            trust_in_institutions: default_level(),
        }
    }
}

/// Reach of a persona on the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialProfile {
    #[serde(default = "default_followers")]
    pub follower_count: u64,
    #[serde(default = "default_influence")]
    pub influence_score: f64,
}

impl Default for SocialProfile {
    fn default() -> Self {
        Self {
            follower_count: default_followers(),
            influence_score: default_influence(),
        }
    }
}

/// Immutable profile an agent is built from. Never mutated after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Persona {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub personality_traits: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub beliefs: Beliefs,
    #[serde(default)]
    pub social: SocialProfile,
}

impl Persona {
    /// Display name, falling back to `Agent_{id}`.
    pub fn display_name(&self, agent_id: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Agent_{agent_id}"))
    }

    pub fn has_trait(&self, name: &str) -> bool {
        self.personality_traits
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }
}

fn default_level() -> String {
    "moderate".to_string()
}
fn default_outlook() -> String {
    "neutral".to_string()
}
fn default_followers() -> u64 {
    100
}
fn default_influence() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_persona_fills_defaults() {
        let persona: Persona = serde_json::from_str(r#"{"name": "ape_01"}"#).unwrap();
        assert_eq!(persona.beliefs.risk_tolerance, "moderate");
        assert_eq!(persona.beliefs.market_outlook, "neutral");
        assert_eq!(persona.social.follower_count, 100);
        assert!(persona.personality_traits.is_empty());
    }

    #[test]
    fn display_name_falls_back_to_agent_id() {
        let persona = Persona::default();
        assert_eq!(persona.display_name(7), "Agent_7");
    }

    #[test]
    fn trait_lookup_ignores_case() {
        let persona = Persona {
            personality_traits: vec!["Analytical".to_string()],
            ..Default::default()
        };
        assert!(persona.has_trait("analytical"));
        assert!(!persona.has_trait("skeptical"));
    }
}
