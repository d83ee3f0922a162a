//! Integration tests for agents reacting to market and social scenarios.
//!
//! Each test builds an agent from a fixture persona, feeds it observations
//! through the full layer pipeline, then lets a mock model decide.

use chrono::{TimeZone, Utc};
use kalsim_agents::test_support::{
    analyst_persona, ape_persona, skeptic_persona, FailingLlm, ScenarioMockLlm, ScriptedLlm,
};
use kalsim_agents::{Agent, FALLBACK_DECISION};
use kalsim_models::{
    ActionType, ConsensusView, MarketInfo, MarketTrend, MemoryKind, NeighborSignal,
    SocialMediaInfo, ViralPostSignal,
};

fn ts(hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 27, hour, 0, 0).unwrap()
}

fn surge(price: f64, pct: f64) -> MarketInfo {
    MarketInfo {
        timestamp: ts(10),
        stock_price: price,
        price_change_pct: pct,
        volume: 45_000_000,
        trend: MarketTrend::from_change_pct(pct),
        short_interest: 140.0,
    }
}

fn euphoric_feed() -> SocialMediaInfo {
    let mut social = SocialMediaInfo::new(
        ts(10),
        vec!["$GME".into(), "diamond hands".into(), "short squeeze".into()],
        vec![
            "GME to the moon 🚀".into(),
            "Holding the line, diamond hands".into(),
            "Shorts are trapped".into(),
        ],
        0.9,
    );
    social.consensus_view = ConsensusView::Bullish;
    social.neighbors = vec![
        NeighborSignal::new(0.8, 0.9, Some("BUY")),
        NeighborSignal::new(0.7, 0.8, Some("BUY")),
        NeighborSignal::new(0.9, 0.9, Some("BUY")),
    ];
    social.viral_posts = vec![ViralPostSignal {
        post_id: "post_0001".into(),
        upvotes: 5_000,
        sentiment: 0.9,
    }];
    social
}

/// A +100% day with a euphoric feed should light up FOMO and positive affect.
#[test]
fn squeeze_day_excites_the_ape() {
    let mut agent = Agent::new(0, ape_persona(), "GameStop");
    agent
        .observe(ts(10), Some(&surge(40.0, 100.0)), Some(&euphoric_feed()))
        .unwrap();

    let state = agent.state();
    assert!(state.neurobiological.fomo_level > 0.0);
    assert!(state.emotional.valence > 0.0);
    assert!(state.herding_detected);
    assert!(state.viral_exposure);

    let market = agent.last_outputs().market.as_ref().unwrap();
    assert!(market.order_flow_imbalance > 0.99);
}

/// Repeated surges push FOMO over the urgent threshold and the scenario model tweets.
#[tokio::test]
async fn sustained_squeeze_leads_to_tweet() {
    let mut agent = Agent::new(1, ape_persona(), "GameStop");
    let llm = ScenarioMockLlm::new();
    let mut price = 20.0;
    for hour in 9..14 {
        price *= 2.0;
        agent
            .observe(ts(hour), Some(&surge(price, 100.0)), Some(&euphoric_feed()))
            .unwrap();
    }
    let decision = agent.decide(&llm, 0.8).await;
    let action = agent.act(&decision);
    assert_eq!(llm.calls(), 1);
    assert_eq!(action.action_type, ActionType::Tweet);
    assert_eq!(action.timestamp, ts(13));
    assert_eq!(action.metadata["layer_state"]["identity_group"], "WSB_APE");
}

#[tokio::test]
async fn model_failure_falls_back_to_hold() {
    let mut agent = Agent::new(2, analyst_persona(), "GameStop");
    agent.observe(ts(9), Some(&surge(20.0, 0.0)), None).unwrap();

    let decision = agent.decide(&FailingLlm, 0.8).await;
    assert_eq!(decision, FALLBACK_DECISION);

    let action = agent.act(&decision);
    assert_eq!(action.action_type, ActionType::Hold);
    assert_eq!(action.content, "Unable to make decision at this time.");

    let decision_entry = agent
        .memory()
        .find(|m| m.entry_type == MemoryKind::Decision)
        .unwrap();
    assert_eq!(decision_entry.content["error"], "LLM error: model unavailable");
}

/// The prompt sent to the model carries the agent's recent observations.
#[tokio::test]
async fn prompt_includes_recent_context() {
    let mut agent = Agent::new(3, skeptic_persona(), "GameStop");
    let llm = ScriptedLlm::new(["ACTION: LURK\nCONTENT: not buying the hype"]);
    agent
        .observe(ts(11), Some(&surge(38.5, -12.0)), Some(&euphoric_feed()))
        .unwrap();
    agent.decide(&llm, 0.8).await;

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[11:00] Market: $38.5, -12.0%, crashing"));
    assert!(prompts[0].contains("Trending: $GME, diamond hands, short squeeze"));
    assert!(prompts[0].contains("Identity Group: SKEPTIC"));
}

#[test]
fn crash_raises_stress() {
    let mut agent = Agent::new(4, ape_persona(), "GameStop");
    agent.observe(ts(9), Some(&surge(300.0, 0.0)), None).unwrap();
    agent.observe(ts(10), Some(&surge(150.0, -50.0)), None).unwrap();
    assert!(agent.state().neurobiological.stress_level > 0.0);
    assert!(agent.state().emotional.valence < 0.0);
}
