use kalsim_models::MarketTrend;
use serde::{Deserialize, Serialize};

use super::{clamp01, LayerModule};
use crate::context::{LayerContext, LayerOutput};
use crate::error::LayerError;

pub const FOMO_THRESHOLD: f64 = 0.7;
pub const STRESS_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NeurobiologicalState {
    pub fomo_level: f64,
    /// Centered at 0.5.
    pub dopamine_response: f64,
    pub stress_level: f64,
    /// Centered at 0.5.
    pub reward_sensitivity: f64,
    pub habituation: f64,
}

impl Default for NeurobiologicalState {
    fn default() -> Self {
        Self {
            fomo_level: 0.0,
            dopamine_response: 0.5,
            stress_level: 0.0,
            reward_sensitivity: 0.5,
            habituation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct NeurobiologyOutput {
    pub state: NeurobiologicalState,
    pub urgency: f64,
    pub fight_or_flight: bool,
}

/// Layer 1: FOMO, stress and the dopamine/habituation loop.
#[derive(Debug, Default)]
pub struct NeurobiologyModule {
    current: NeurobiologicalState,
}

impl NeurobiologyModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NeurobiologicalState {
        &self.current
    }

    /// Quick FOMO estimate without any prior state.
    pub fn calculate_fomo(price_change_pct: f64, trend: MarketTrend, social_buzz: f64) -> f64 {
        let price_term = if price_change_pct > 0.0 {
            (price_change_pct / 50.0).min(0.5)
        } else {
            0.0
        };
        clamp01(price_term + trend_fomo_boost(trend) + social_buzz * 0.2)
    }

    fn update_fomo(
        current: f64,
        price_change_pct: f64,
        trend: MarketTrend,
        sentiment: f64,
        reward_sensitivity: f64,
    ) -> f64 {
        let mut delta = 0.0;
        if price_change_pct > 0.0 {
            delta += (price_change_pct / 100.0) * 0.5 * (1.0 + reward_sensitivity);
        }
        delta += trend_fomo_boost(trend);
        if sentiment > 0.0 {
            delta += sentiment * 0.2;
        }
        clamp01(current * 0.9 + delta)
    }

    fn update_stress(current: f64, price_change_pct: f64, trend: MarketTrend, volatility: f64) -> f64 {
        let mut delta = 0.0;
        if price_change_pct < 0.0 {
            delta += price_change_pct.abs() / 100.0 * 0.4;
        }
        delta += match trend {
            MarketTrend::Crashing => 0.4,
            MarketTrend::Falling => 0.2,
            _ => 0.0,
        };
        delta += volatility * 0.3;
        clamp01(current * 0.85 + delta)
    }

    /// Returns `(dopamine, habituation)`.
    fn update_dopamine(
        current: f64,
        unrealized_pnl_pct: f64,
        price_change_pct: f64,
        habituation: f64,
    ) -> (f64, f64) {
        let novelty = 1.0 - habituation;
        let mut delta = 0.0;
        if unrealized_pnl_pct > 0.0 {
            delta += (unrealized_pnl_pct / 100.0) * 0.3 * novelty;
        }
        if price_change_pct > 0.0 {
            delta += (price_change_pct / 100.0) * 0.2 * novelty;
        }
        delta -= (current - 0.5) * 0.1;

        let dopamine = clamp01(current + delta);
        let habituation = if delta > 0.0 {
            (habituation + 0.05).min(0.8)
        } else {
            (habituation - 0.02).max(0.0)
        };
        (dopamine, habituation)
    }
}

fn trend_fomo_boost(trend: MarketTrend) -> f64 {
    match trend {
        MarketTrend::Surging => 0.3,
        MarketTrend::Rising => 0.15,
        _ => 0.0,
    }
}

impl LayerModule for NeurobiologyModule {
    fn name(&self) -> &'static str {
        "neurobiology"
    }

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError> {
        let prior = ctx.agent.neuro;
        let market = &ctx.market;

        let fomo_level = Self::update_fomo(
            prior.fomo_level,
            market.price_change_pct,
            market.trend,
            ctx.social.sentiment,
            prior.reward_sensitivity,
        );
        let stress_level = Self::update_stress(
            prior.stress_level,
            market.price_change_pct,
            market.trend,
            market.volatility,
        );
        let (dopamine_response, habituation) = Self::update_dopamine(
            prior.dopamine_response,
            ctx.agent.unrealized_pnl_pct,
            market.price_change_pct,
            prior.habituation,
        );

        // Urgency reads habituation as it stood before this pass.
        let urgency = fomo_level * 0.7 + (1.0 - self.current.habituation) * 0.3;
        let fight_or_flight = stress_level >= STRESS_THRESHOLD;

        self.current = NeurobiologicalState {
            fomo_level,
            dopamine_response,
            stress_level,
            reward_sensitivity: clamp01(prior.reward_sensitivity),
            habituation,
        };

        Ok(LayerOutput::Neurobiology(NeurobiologyOutput {
            state: self.current,
            urgency,
            fight_or_flight,
        }))
    }

    fn reset(&mut self) -> Result<(), LayerError> {
        self.current = NeurobiologicalState::default();
        Ok(())
    }

    fn summarize(&self) -> String {
        format!(
            "FOMO: {:.2}, Stress: {:.2}, Dopamine: {:.2}",
            self.current.fomo_level, self.current.stress_level, self.current.dopamine_response
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AgentSnapshot, MarketSignal, SocialSignal};

    fn ctx(prior: NeurobiologicalState, pct: f64, trend: MarketTrend, sentiment: f64) -> LayerContext {
        LayerContext::new(AgentSnapshot {
            neuro: prior,
            ..Default::default()
        })
        .with_market(MarketSignal {
            price_change_pct: pct,
            trend,
            volatility: pct.abs() / 100.0,
            ..Default::default()
        })
        .with_social(SocialSignal {
            sentiment,
            ..Default::default()
        })
    }

    fn run(module: &mut NeurobiologyModule, ctx: &LayerContext) -> NeurobiologyOutput {
        match module.process(ctx).unwrap() {
            LayerOutput::Neurobiology(o) => o,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn surge_raises_fomo() {
        let prior = NeurobiologicalState {
            fomo_level: 0.2,
            ..Default::default()
        };
        let out = run(
            &mut NeurobiologyModule::new(),
            &ctx(prior, 100.0, MarketTrend::Surging, 0.0),
        );
        assert!(out.state.fomo_level > prior.fomo_level);
    }

    #[test]
    fn crash_raises_stress() {
        let prior = NeurobiologicalState {
            stress_level: 0.3,
            ..Default::default()
        };
        let out = run(
            &mut NeurobiologyModule::new(),
            &ctx(prior, -20.0, MarketTrend::Crashing, 0.0),
        );
        assert!(out.state.stress_level > prior.stress_level);
    }

    #[test]
    fn outputs_stay_bounded_for_extreme_inputs() {
        let mut module = NeurobiologyModule::new();
        for (pct, trend, sentiment) in [
            (10_000.0, MarketTrend::Surging, 1.0),
            (-10_000.0, MarketTrend::Crashing, -1.0),
            (0.0, MarketTrend::Stable, 0.0),
        ] {
            let prior = NeurobiologicalState {
                fomo_level: 1.0,
                dopamine_response: 1.0,
                stress_level: 1.0,
                reward_sensitivity: 1.0,
                habituation: 0.8,
            };
            let s = run(&mut module, &ctx(prior, pct, trend, sentiment)).state;
            for v in [
                s.fomo_level,
                s.dopamine_response,
                s.stress_level,
                s.reward_sensitivity,
                s.habituation,
            ] {
                assert!((0.0..=1.0).contains(&v), "{v} out of bounds");
            }
        }
    }

    #[test]
    fn repeated_gain_has_diminishing_dopamine() {
        let mut module = NeurobiologyModule::new();
        let mut prior = NeurobiologicalState::default();
        let mut deltas = Vec::new();
        for _ in 0..2 {
            let mut c = ctx(prior, 10.0, MarketTrend::Rising, 0.0);
            c.agent.unrealized_pnl_pct = 30.0;
            let out = run(&mut module, &c);
            deltas.push(out.state.dopamine_response - prior.dopamine_response);
            prior = out.state;
        }
        assert!(prior.habituation > 0.0);
        assert!(deltas[1] <= deltas[0] + 1e-9);
    }

    #[test]
    fn fight_or_flight_triggers_at_threshold() {
        let prior = NeurobiologicalState {
            stress_level: 0.9,
            ..Default::default()
        };
        let out = run(
            &mut NeurobiologyModule::new(),
            &ctx(prior, -10.0, MarketTrend::Crashing, 0.0),
        );
        assert!(out.fight_or_flight);

        let calm = run(
            &mut NeurobiologyModule::new(),
            &ctx(NeurobiologicalState::default(), 0.0, MarketTrend::Stable, 0.0),
        );
        assert!(!calm.fight_or_flight);
    }

    #[test]
    fn urgency_uses_previous_habituation() {
        let mut module = NeurobiologyModule::new();
        let out = run(&mut module, &ctx(NeurobiologicalState::default(), 0.0, MarketTrend::Stable, 0.0));
        assert!((out.urgency - 0.3).abs() < 1e-9);
    }

    #[test]
    fn calculate_fomo_estimate() {
        let fomo = NeurobiologyModule::calculate_fomo(50.0, MarketTrend::Surging, 0.5);
        assert!((fomo - 0.9).abs() < 1e-9);
        assert_eq!(
            NeurobiologyModule::calculate_fomo(-10.0, MarketTrend::Falling, 0.0),
            0.0
        );
    }

    #[test]
    fn reset_restores_defaults() {
        let mut module = NeurobiologyModule::new();
        run(&mut module, &ctx(NeurobiologicalState::default(), 80.0, MarketTrend::Surging, 1.0));
        assert!(module.state().fomo_level > 0.0);
        module.reset().unwrap();
        assert_eq!(*module.state(), NeurobiologicalState::default());
        assert!(module.summarize().starts_with("FOMO: 0.00"));
    }
}
