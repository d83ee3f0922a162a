use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use kalsim_layers::{
    AgentSnapshot, CognitiveBiases, EmotionState, IdentityModule, IdentityState, LayerContext,
    LayerOutputs, LayerPipeline, MarketSignal, NeurobiologicalState, OrderSide, SalienceContext,
    SocialSignal, Stimulus, StimulusKind,
};
use kalsim_models::{
    ActionResult, MarketInfo, MarketTrend, MemoryEntry, MemoryKind, Persona, SocialMediaInfo,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::AgentError;
use crate::llm::{LlmClient, FALLBACK_DECISION};
use crate::parser::parse_decision;
use crate::prompts::PromptBuilder;

/// Oldest memories are evicted past this many entries.
pub const MEMORY_LIMIT: usize = 50;

const PROMPT_MEMORY_COUNT: usize = 5;
const DOMINANT_GROUP_SENTIMENT: f64 = 0.5;

/// Psychological state carried between steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentState {
    pub neurobiological: NeurobiologicalState,
    pub cognitive: CognitiveBiases,
    pub emotional: EmotionState,
    pub identity: Option<IdentityState>,
    pub social_pressure: f64,
    pub herding_detected: bool,
    pub viral_exposure: bool,
}

impl AgentState {
    /// Flat view used in action metadata.
    pub fn to_map(&self) -> Value {
        json!({
            "fomo_level": self.neurobiological.fomo_level,
            "dopamine_response": self.neurobiological.dopamine_response,
            "stress_level": self.neurobiological.stress_level,
            "social_proof": self.cognitive.social_proof,
            "confirmation_bias": self.cognitive.confirmation_bias,
            "loss_aversion": self.cognitive.loss_aversion,
            "valence": self.emotional.valence,
            "arousal": self.emotional.arousal,
            "dominant_emotion": self.emotional.dominant_emotion.as_str(),
            "identity_group": self.identity.map(|i| i.primary_group.as_str()),
            "group_identification": self.identity.map(|i| i.group_identification),
            "social_pressure": self.social_pressure,
            "herding_detected": self.herding_detected,
            "viral_exposure": self.viral_exposure,
        })
    }
}

/// A simulated social-media user: persona, memory and a private layer pipeline.
pub struct Agent {
    id: usize,
    persona: Persona,
    market_topic: String,
    pipeline: LayerPipeline,
    memory: VecDeque<MemoryEntry>,
    state: AgentState,
    last_outputs: LayerOutputs,
    anchor_price: Option<f64>,
    belief: f64,
    current_timestamp: DateTime<Utc>,
}

impl Agent {
    pub fn new(id: usize, persona: Persona, market_topic: impl Into<String>) -> Self {
        let belief = match persona.beliefs.market_outlook.as_str() {
            "bullish" => 0.7,
            "bearish" => 0.3,
            _ => 0.5,
        };
        let state = AgentState {
            identity: Some(IdentityModule::assign_identity(&persona)),
            ..Default::default()
        };
        Self {
            id,
            persona,
            market_topic: market_topic.into(),
            pipeline: LayerPipeline::standard(),
            memory: VecDeque::with_capacity(MEMORY_LIMIT),
            state,
            last_outputs: LayerOutputs::default(),
            anchor_price: None,
            belief,
            current_timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn name(&self) -> String {
        self.persona.display_name(self.id)
    }

    pub fn identity_group(&self) -> &'static str {
        self.state
            .identity
            .map(|i| i.primary_group.as_str())
            .unwrap_or("NEUTRAL")
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn last_outputs(&self) -> &LayerOutputs {
        &self.last_outputs
    }

    pub fn memory(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.memory.iter()
    }

    pub fn belief(&self) -> f64 {
        self.belief
    }

    pub fn personality_summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.persona.personality_traits.is_empty() {
            let traits: Vec<&str> = self
                .persona
                .personality_traits
                .iter()
                .take(3)
                .map(String::as_str)
                .collect();
            parts.push(format!("Personality: {}", traits.join(", ")));
        }
        if !self.persona.interests.is_empty() {
            let interests: Vec<&str> = self
                .persona
                .interests
                .iter()
                .take(3)
                .map(String::as_str)
                .collect();
            parts.push(format!("Interests: {}", interests.join(", ")));
        }
        parts.push(format!(
            "Risk tolerance: {}",
            self.persona.beliefs.risk_tolerance
        ));
        parts.join("; ")
    }

    /// Record what the agent sees this step and run it through the layer pipeline.
    pub fn observe(
        &mut self,
        timestamp: DateTime<Utc>,
        market: Option<&MarketInfo>,
        social: Option<&SocialMediaInfo>,
    ) -> Result<(), AgentError> {
        self.current_timestamp = timestamp;

        let market_json = market.map(|m| {
            json!({
                "price": m.stock_price,
                "change_pct": m.price_change_pct,
                "trend": m.trend.as_str(),
            })
        });
        let social_json = social.map(|s| {
            json!({
                "community_sentiment": s.sentiment_score,
                "trending": s.trending_topics,
            })
        });
        self.remember(
            MemoryKind::Observation,
            json!({ "market": market_json, "social": social_json }),
        );

        if let Some(m) = market {
            self.anchor_price.get_or_insert(m.stock_price);
        }

        let ctx = self.build_context(market, social);
        let ctx = self.pipeline.execute(ctx)?;
        self.absorb(ctx.outputs);
        Ok(())
    }

    fn build_context(&self, market: Option<&MarketInfo>, social: Option<&SocialMediaInfo>) -> LayerContext {
        let unrealized_pnl_pct = match (self.anchor_price, market) {
            (Some(anchor), Some(m)) if anchor > 0.0 => (m.stock_price - anchor) / anchor * 100.0,
            _ => 0.0,
        };
        let snapshot = AgentSnapshot {
            id: self.id,
            persona: self.persona.clone(),
            neuro: self.state.neurobiological,
            emotion: self.state.emotional,
            identity: self.state.identity,
            belief: self.belief,
            anchor_price: self.anchor_price,
            entry_price: self.anchor_price,
            unrealized_pnl_pct,
        };
        let mut ctx = LayerContext::new(snapshot);

        if let Some(m) = market {
            ctx = ctx.with_market(MarketSignal {
                price: m.stock_price,
                price_change_pct: m.price_change_pct,
                trend: m.trend,
                volume: m.volume,
                volatility: m.price_change_pct.abs() / 100.0,
                short_interest: m.short_interest,
            });
            let kind = match m.trend {
                MarketTrend::Surging => Some(StimulusKind::MarketSurge),
                MarketTrend::Crashing => Some(StimulusKind::MarketCrash),
                _ => None,
            };
            if let Some(kind) = kind {
                ctx = ctx.with_stimulus(Stimulus {
                    kind,
                    intensity: (m.price_change_pct.abs() / 50.0).min(1.0),
                });
            }
        }

        if let Some(s) = social {
            let orders = s
                .neighbors
                .iter()
                .filter_map(|n| match n.action.as_deref() {
                    Some(a) if a.eq_ignore_ascii_case("BUY") => Some(OrderSide::Buy),
                    Some(a) if a.eq_ignore_ascii_case("SELL") => Some(OrderSide::Sell),
                    _ => None,
                })
                .collect();
            ctx = ctx
                .with_social(SocialSignal {
                    sentiment: s.sentiment_score,
                    consensus_view: s.consensus_view,
                    consensus_strength: s.sentiment_score.abs(),
                    peer_count: s.sample_tweets.len(),
                    adoption_rate: s.adoption_rate,
                    trend_velocity: s.trend_velocity,
                    neighbors: s.neighbors.clone(),
                    viral_posts: s.viral_posts.clone(),
                    rapid_spread: s.rapid_spread,
                    dominant_group: (s.sentiment_score > DOMINANT_GROUP_SENTIMENT)
                        .then(|| "WSB".to_string()),
                })
                .with_orders(orders);
        }
        ctx
    }

    fn absorb(&mut self, outputs: LayerOutputs) {
        if let Some(neuro) = outputs.neurobiology {
            self.state.neurobiological = neuro.state;
        }
        if let Some(cognition) = &outputs.cognition {
            self.state.cognitive = cognition.biases;
        }
        if let Some(emotion) = outputs.emotion {
            self.state.emotional = EmotionState {
                valence: emotion.valence,
                arousal: emotion.arousal,
                dominant_emotion: emotion.dominant_emotion,
                intensity: emotion.emotion_intensity,
            };
        }
        if let Some(social) = outputs.social {
            self.state.social_pressure = social.social_pressure;
            self.state.herding_detected = social.herding_detected;
        }
        if let Some(network) = outputs.network {
            self.state.viral_exposure = network.viral_exposure;
        }
        self.last_outputs = outputs;
    }

    /// Ask the model for a decision. Failures are logged and replaced by a `HOLD`.
    pub async fn decide(&mut self, llm: &dyn LlmClient, temperature: f64) -> String {
        let prompt = self.decision_prompt();
        match llm.generate(&prompt, temperature).await {
            Ok(decision) => {
                debug!(agent_id = self.id, decision = %decision, "agent decided");
                self.remember(MemoryKind::Decision, json!({ "raw_decision": decision }));
                decision
            }
            Err(e) => {
                error!(agent_id = self.id, error = %e, "decision failed, holding");
                self.remember(
                    MemoryKind::Decision,
                    json!({ "raw_decision": FALLBACK_DECISION, "error": e.to_string() }),
                );
                FALLBACK_DECISION.to_string()
            }
        }
    }

    /// Turn a raw decision into an action stamped with the current step's time.
    pub fn act(&mut self, decision: &str) -> ActionResult {
        let parsed = parse_decision(decision);
        let result = ActionResult {
            agent_id: self.id,
            timestamp: self.current_timestamp,
            action_type: parsed.action_type,
            content: parsed.content,
            metadata: json!({
                "persona_name": self.name(),
                "personality": self.personality_summary(),
                "layer_state": self.state.to_map(),
            }),
        };
        self.remember(
            MemoryKind::Action,
            json!({
                "action_type": result.action_type.as_str(),
                "content": result.content,
            }),
        );
        debug!(agent_id = self.id, action = %result.action_type, "agent acted");
        result
    }

    pub fn decision_prompt(&self) -> String {
        let name = self.name();
        let personality = self.personality_summary();
        PromptBuilder {
            name: &name,
            personality: &personality,
            identity: self.state.identity.as_ref(),
            outputs: &self.last_outputs,
        }
        .build_decision_prompt(&self.market_topic, &self.recent_context())
    }

    pub fn update_identity_salience(&mut self, context: &SalienceContext) {
        if let Some(identity) = &self.state.identity {
            self.state.identity = Some(IdentityModule::update_salience(identity, context));
        }
    }

    /// Clear layer state. The assigned identity is kept.
    pub fn reset_layers(&mut self) {
        self.pipeline.reset();
        let identity = self
            .state
            .identity
            .or_else(|| Some(IdentityModule::assign_identity(&self.persona)));
        self.state = AgentState {
            identity,
            ..Default::default()
        };
        self.last_outputs = LayerOutputs::default();
    }

    pub fn layer_summary(&self) -> String {
        format!(
            "Neuro: FOMO={:.2}, Stress={:.2} | Emotion: {} | Identity: {}",
            self.state.neurobiological.fomo_level,
            self.state.neurobiological.stress_level,
            self.state.emotional.dominant_emotion,
            self.identity_group()
        )
    }

    fn remember(&mut self, kind: MemoryKind, content: Value) {
        self.memory.push_back(MemoryEntry {
            timestamp: self.current_timestamp,
            entry_type: kind,
            content,
        });
        while self.memory.len() > MEMORY_LIMIT {
            self.memory.pop_front();
        }
    }

    fn recent_context(&self) -> String {
        let skip = self.memory.len().saturating_sub(PROMPT_MEMORY_COUNT);
        let lines: Vec<String> = self
            .memory
            .iter()
            .skip(skip)
            .flat_map(format_memory)
            .collect();
        if self.memory.is_empty() {
            "No recent activity.".to_string()
        } else if lines.is_empty() {
            "No significant memories.".to_string()
        } else {
            lines.join("\n")
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("group", &self.identity_group())
            .finish()
    }
}

fn format_memory(entry: &MemoryEntry) -> Vec<String> {
    let time = entry.timestamp.format("%H:%M");
    let mut lines = Vec::new();
    match entry.entry_type {
        MemoryKind::Observation => {
            if let Some(market) = entry.content.get("market").filter(|m| !m.is_null()) {
                let price = market
                    .get("price")
                    .and_then(Value::as_f64)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                let change = market.get("change_pct").and_then(Value::as_f64).unwrap_or(0.0);
                let trend = market.get("trend").and_then(Value::as_str).unwrap_or("stable");
                lines.push(format!("[{time}] Market: ${price}, {change:+.1}%, {trend}"));
            }
            if let Some(social) = entry.content.get("social").filter(|s| !s.is_null()) {
                let sentiment = social
                    .get("community_sentiment")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0);
                let trending: Vec<&str> = social
                    .get("trending")
                    .and_then(Value::as_array)
                    .map(|topics| topics.iter().filter_map(Value::as_str).take(3).collect())
                    .unwrap_or_default();
                lines.push(format!(
                    "[{time}] Social: Sentiment {sentiment:.2}, Trending: {}",
                    trending.join(", ")
                ));
            }
        }
        MemoryKind::Action => {
            let action = entry
                .content
                .get("action_type")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let content: String = entry
                .content
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or("")
                .chars()
                .take(50)
                .collect();
            lines.push(format!("[{time}] You: {action} - {content}..."));
        }
        MemoryKind::Decision => {}
    }
    lines
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use kalsim_models::{ActionType, Beliefs};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 11, 9, 0, 0).unwrap()
    }

    fn ape() -> Persona {
        Persona {
            name: Some("diamond_dan".to_string()),
            personality_traits: vec!["impulsive".into(), "risk-taker".into()],
            interests: vec!["wsb".into(), "memes".into()],
            beliefs: Beliefs {
                market_outlook: "bullish".into(),
                risk_tolerance: "high".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn market(price: f64, pct: f64) -> MarketInfo {
        MarketInfo {
            timestamp: t0(),
            stock_price: price,
            price_change_pct: pct,
            volume: 10_000_000,
            trend: MarketTrend::from_change_pct(pct),
            short_interest: 140.0,
        }
    }

    #[test]
    fn new_agent_has_identity_and_belief() {
        let agent = Agent::new(3, ape(), "GME");
        assert_eq!(agent.identity_group(), "WSB_APE");
        assert_eq!(agent.belief(), 0.7);
        assert_eq!(agent.name(), "diamond_dan");
        assert_eq!(agent.memory().count(), 0);
    }

    #[test]
    fn personality_summary_lists_traits_and_risk() {
        let agent = Agent::new(0, ape(), "GME");
        assert_eq!(
            agent.personality_summary(),
            "Personality: impulsive, risk-taker; Interests: wsb, memes; Risk tolerance: high"
        );
    }

    #[test]
    fn observe_updates_state_and_memory() {
        let mut agent = Agent::new(0, ape(), "GME");
        agent.observe(t0(), Some(&market(40.0, 100.0)), None).unwrap();
        assert!(agent.state().neurobiological.fomo_level > 0.0);
        assert!(agent.state().emotional.valence > 0.0);
        assert!(agent.last_outputs().market.is_some());
        assert_eq!(agent.memory().count(), 1);
    }

    #[test]
    fn cognitive_state_comes_from_layer_output() {
        let mut agent = Agent::new(0, ape(), "GME");
        agent.observe(t0(), Some(&market(40.0, 100.0)), None).unwrap();
        let biases = agent.last_outputs().cognition.as_ref().unwrap().biases;
        assert_eq!(agent.state().cognitive, biases);
        let map = agent.state().to_map();
        assert_eq!(map["social_proof"], biases.social_proof);
        assert_eq!(map["loss_aversion"], biases.loss_aversion);
    }

    #[test]
    fn memory_is_bounded() {
        let mut agent = Agent::new(0, Persona::default(), "GME");
        for _ in 0..(MEMORY_LIMIT + 10) {
            agent.observe(t0(), None, None).unwrap();
        }
        assert_eq!(agent.memory().count(), MEMORY_LIMIT);
    }

    #[test]
    fn act_records_metadata_and_memory() {
        let mut agent = Agent::new(1, ape(), "GME");
        agent.observe(t0(), Some(&market(20.0, 5.0)), None).unwrap();
        let action = agent.act("ACTION: TWEET\nCONTENT: to the moon");
        assert_eq!(action.action_type, ActionType::Tweet);
        assert_eq!(action.content, "to the moon");
        assert_eq!(action.timestamp, t0());
        assert_eq!(action.metadata["persona_name"], "diamond_dan");
        assert!(action.metadata["layer_state"]["fomo_level"].is_number());
        assert!(agent.recent_context().contains("You: TWEET - to the moon"));
    }

    #[test]
    fn empty_memory_context() {
        let agent = Agent::new(0, Persona::default(), "GME");
        assert_eq!(agent.recent_context(), "No recent activity.");
    }

    #[test]
    fn reset_keeps_identity() {
        let mut agent = Agent::new(0, ape(), "GME");
        agent.observe(t0(), Some(&market(40.0, 100.0)), None).unwrap();
        agent.reset_layers();
        assert_eq!(agent.state().neurobiological, NeurobiologicalState::default());
        assert_eq!(agent.identity_group(), "WSB_APE");
        assert!(agent.last_outputs().is_empty());
    }

    #[test]
    fn salience_raises_identification() {
        let mut agent = Agent::new(0, ape(), "GME");
        let before = agent.state().identity.map(|i| i.group_identification).unwrap();
        agent.update_identity_salience(&SalienceContext {
            group_mentions: 5,
            in_group_interactions: 5,
            threat_to_group: true,
        });
        let after = agent.state().identity.map(|i| i.group_identification).unwrap();
        assert!(after >= before);
    }
}
