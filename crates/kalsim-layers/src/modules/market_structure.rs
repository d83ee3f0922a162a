use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::LayerModule;
use crate::context::{LayerContext, LayerOutput, OrderSide};
use crate::error::LayerError;

const HISTORY_CAP: usize = 100;
const BASE_VOLUME: f64 = 10_000_000.0;
const SQUEEZE_MIN_SHORT_INTEREST: f64 = 20.0;
pub const DEFAULT_VOLATILITY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MarketStructureOutput {
    pub price_pressure: f64,
    pub order_flow_imbalance: f64,
    pub liquidity: f64,
    pub market_impact: f64,
    pub short_squeeze_pressure: f64,
    pub volatility: f64,
    pub buy_pressure: f64,
    pub sell_pressure: f64,
}

/// Layer 7: liquidity, order flow and squeeze dynamics.
#[derive(Debug)]
pub struct MarketStructureModule {
    liquidity: f64,
    price_history: VecDeque<f64>,
    short_interest: f64,
    last_volume: u64,
}

impl Default for MarketStructureModule {
    fn default() -> Self {
        Self {
            liquidity: 1.0,
            price_history: VecDeque::with_capacity(HISTORY_CAP),
            short_interest: 0.0,
            last_volume: 0,
        }
    }
}

impl MarketStructureModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn liquidity(&self) -> f64 {
        self.liquidity
    }

    pub fn price_history(&self) -> &VecDeque<f64> {
        &self.price_history
    }

    pub fn last_volume(&self) -> u64 {
        self.last_volume
    }

    /// Population standard deviation of simple returns over the last `window` prices.
    pub fn calculate_volatility(&self, window: usize) -> f64 {
        if self.price_history.len() < 3 {
            return 0.0;
        }
        let skip = self.price_history.len().saturating_sub(window);
        let recent: Vec<f64> = self.price_history.iter().skip(skip).copied().collect();
        let returns: Vec<f64> = recent
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();
        if returns.is_empty() {
            return 0.0;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    }

    fn next_liquidity(&self, volume: u64, order_count: usize) -> f64 {
        let volume_factor = BASE_VOLUME / (volume as f64).max(BASE_VOLUME);
        let order_factor = (1.0 - order_count as f64 * 0.01).max(0.5);
        (self.liquidity * 0.9 + volume_factor * order_factor * 0.1).clamp(0.1, 1.0)
    }

    fn squeeze_pressure(short_interest: f64, buy_count: usize, liquidity: f64) -> f64 {
        if short_interest < SQUEEZE_MIN_SHORT_INTEREST {
            return 0.0;
        }
        let si_factor = (short_interest / 100.0).min(1.5);
        let buy_factor = (buy_count as f64 / 20.0).min(1.0);
        (si_factor * buy_factor * (1.0 + (1.0 - liquidity))).min(2.0)
    }
}

impl LayerModule for MarketStructureModule {
    fn name(&self) -> &'static str {
        "market_structure"
    }

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError> {
        let market = &ctx.market;
        if market.price > 0.0 {
            self.price_history.push_back(market.price);
            while self.price_history.len() > HISTORY_CAP {
                self.price_history.pop_front();
            }
        }
        self.short_interest = market.short_interest;
        self.last_volume = market.volume;

        let buys = ctx.agent_actions.iter().filter(|a| **a == OrderSide::Buy).count();
        let sells = ctx.agent_actions.len() - buys;
        let total = buys + sells;

        let order_flow_imbalance = if total > 0 {
            (buys as f64 - sells as f64) / total as f64
        } else {
            0.0
        };
        // Pressure is priced against liquidity before this frame's update.
        let price_pressure = order_flow_imbalance * 0.1 / self.liquidity.max(0.1);

        self.liquidity = self.next_liquidity(market.volume, total);

        Ok(LayerOutput::Market(MarketStructureOutput {
            price_pressure,
            order_flow_imbalance,
            liquidity: self.liquidity,
            market_impact: price_pressure.abs() * (2.0 - self.liquidity),
            short_squeeze_pressure: Self::squeeze_pressure(market.short_interest, buys, self.liquidity),
            volatility: self.calculate_volatility(DEFAULT_VOLATILITY_WINDOW),
            buy_pressure: buys as f64 / total.max(1) as f64,
            sell_pressure: sells as f64 / total.max(1) as f64,
        }))
    }

    fn reset(&mut self) -> Result<(), LayerError> {
        *self = Self::default();
        Ok(())
    }

    fn summarize(&self) -> String {
        format!(
            "Liquidity: {:.2}, Volatility: {:.4}, Short Interest: {:.1}%",
            self.liquidity,
            self.calculate_volatility(DEFAULT_VOLATILITY_WINDOW),
            self.short_interest
        )
    }
}
