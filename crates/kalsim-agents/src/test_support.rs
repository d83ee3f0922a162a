//! Test support module providing prompt-driven mock LLMs and canned providers.
//!
//! Unlike `MockLlm` (which always holds), `ScenarioMockLlm` reads the
//! psychological-state lines of the decision prompt and reacts to them the
//! way the prompt's action guidance suggests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use kalsim_models::{Beliefs, MarketEvent, Persona, SocialProfile};

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::providers::{MarketDataProvider, PersonaProvider};

/// Decides from the prompt text: urgent FOMO tweets, high stress holds,
/// everything else lurks.
#[derive(Debug, Default)]
pub struct ScenarioMockLlm {
    calls: AtomicUsize,
}

impl ScenarioMockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn respond_to_prompt(prompt: &str) -> String {
    if prompt.contains("URGENT: You are experiencing intense FOMO") {
        "ACTION: TWEET\nCONTENT: Can't miss this one, buying more. To the moon!".to_string()
    } else if prompt.contains("You are highly stressed") {
        "ACTION: HOLD\nCONTENT: Too much noise, sitting tight for now.".to_string()
    } else if prompt.contains("the herd is moving in one direction") {
        "ACTION: TWEET\nCONTENT: Everyone is piling in, hold the line!".to_string()
    } else {
        "ACTION: LURK\nCONTENT: Watching how this plays out.".to_string()
    }
}

#[async_trait]
impl LlmClient for ScenarioMockLlm {
    async fn generate(&self, prompt: &str, _temperature: f64) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(respond_to_prompt(prompt))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Cycles through a fixed list of responses.
#[derive(Debug)]
pub struct ScriptedLlm {
    responses: Vec<String>,
    next: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            next: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, prompt: &str, _temperature: f64) -> Result<String, AgentError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if self.responses.is_empty() {
            return Err(AgentError::Llm("no scripted responses".to_string()));
        }
        let mut next = self
            .next
            .lock()
            .map_err(|_| AgentError::Llm("script lock poisoned".to_string()))?;
        let response = self.responses[*next % self.responses.len()].clone();
        *next += 1;
        Ok(response)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Always fails, for exercising fallback paths.
#[derive(Debug, Default)]
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    async fn generate(&self, _prompt: &str, _temperature: f64) -> Result<String, AgentError> {
        Err(AgentError::Llm("model unavailable".to_string()))
    }

    async fn health_check(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    pub events: Vec<MarketEvent>,
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn get_trending_events(&self, limit: usize) -> Result<Vec<MarketEvent>, AgentError> {
        Ok(self.events.iter().take(limit).cloned().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticPersonas {
    pub personas: Vec<Persona>,
}

#[async_trait]
impl PersonaProvider for StaticPersonas {
    async fn fetch_user_pool(&self, count: usize) -> Result<Vec<Persona>, AgentError> {
        Ok(self.personas.iter().take(count).cloned().collect())
    }
}

fn persona(name: &str, traits: &[&str], interests: &[&str], beliefs: Beliefs, followers: u64) -> Persona {
    Persona {
        id: None,
        name: Some(name.to_string()),
        personality_traits: traits.iter().map(|s| s.to_string()).collect(),
        interests: interests.iter().map(|s| s.to_string()).collect(),
        beliefs,
        social: SocialProfile {
            follower_count: followers,
            influence_score: (followers as f64 / 10_000.0).min(1.0),
        },
    }
}

/// High-risk WSB regular.
pub fn ape_persona() -> Persona {
    persona(
        "diamond_dan",
        &["impulsive", "risk-taker", "optimistic"],
        &["wsb", "memes", "stocks"],
        Beliefs {
            risk_tolerance: "high".to_string(),
            market_outlook: "bullish".to_string(),
            trust_in_institutions: "low".to_string(),
        },
        5_000,
    )
}

/// Institution-trusting quant.
pub fn analyst_persona() -> Persona {
    persona(
        "quant_quinn",
        &["analytical", "cautious", "patient"],
        &["quantitative finance", "economics"],
        Beliefs {
            risk_tolerance: "low".to_string(),
            market_outlook: "neutral".to_string(),
            trust_in_institutions: "high".to_string(),
        },
        800,
    )
}

pub fn skeptic_persona() -> Persona {
    persona(
        "doubting_dee",
        &["skeptical", "contrarian"],
        &["value investing"],
        Beliefs {
            risk_tolerance: "moderate".to_string(),
            market_outlook: "bearish".to_string(),
            trust_in_institutions: "low".to_string(),
        },
        300,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kalsim_layers::{IdentityGroup, IdentityModule};

    #[test]
    fn scenario_mock_follows_prompt_cues() {
        assert!(respond_to_prompt("- URGENT: You are experiencing intense FOMO (level: 0.9)")
            .starts_with("ACTION: TWEET"));
        assert!(respond_to_prompt("- You are highly stressed (level: 0.8).").starts_with("ACTION: HOLD"));
        assert!(respond_to_prompt("calm and analytical").starts_with("ACTION: LURK"));
    }

    #[tokio::test]
    async fn scripted_llm_cycles_and_records() {
        let llm = ScriptedLlm::new(["a", "b"]);
        assert_eq!(llm.generate("p1", 0.8).await.unwrap(), "a");
        assert_eq!(llm.generate("p2", 0.8).await.unwrap(), "b");
        assert_eq!(llm.generate("p3", 0.8).await.unwrap(), "a");
        assert_eq!(llm.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn fixtures_land_in_expected_groups() {
        assert_eq!(
            IdentityModule::assign_identity(&ape_persona()).primary_group,
            IdentityGroup::WsbApe
        );
        assert_eq!(
            IdentityModule::assign_identity(&analyst_persona()).primary_group,
            IdentityGroup::Institutional
        );
        assert_eq!(
            IdentityModule::assign_identity(&skeptic_persona()).primary_group,
            IdentityGroup::Skeptic
        );
    }
}
