use chrono::{DateTime, Utc};
use kalsim_models::{MarketInfo, MarketTrend};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::EngineError;

const NOISE_STD_DEV: f64 = 0.02;
const PRICE_FLOOR: f64 = 1.0;
const SENTIMENT_PRICE_WEIGHT: f64 = 0.1;
const VOLUME_RANGE: std::ops::RangeInclusive<u64> = 1_000_000..=50_000_000;

/// Scripted squeeze trajectory: a slow drift for three days, a breakout
/// over the next two, then a steep climb.
pub fn phase_multiplier(day: usize) -> f64 {
    let day = day as f64;
    if day < 3.0 {
        1.0 + day * 0.1
    } else if day < 5.0 {
        1.3 + (day - 3.0) * 0.5
    } else {
        2.3 + (day - 5.0) * 2.0
    }
}

/// Simulated price process for the squeezed stock.
#[derive(Debug, Clone)]
pub struct MarketModel {
    base_price: f64,
    short_interest: f64,
    steps_per_day: usize,
    noise: Normal<f64>,
    price_history: Vec<f64>,
}

impl MarketModel {
    pub fn new(base_price: f64, short_interest: f64, time_step_hours: u32) -> Result<Self, EngineError> {
        if !(base_price.is_finite() && base_price > 0.0) {
            return Err(EngineError::Config(format!(
                "base_price must be positive, got {base_price}"
            )));
        }
        let noise = Normal::new(0.0, NOISE_STD_DEV)
            .map_err(|e| EngineError::Config(format!("invalid price noise: {e}")))?;
        Ok(Self {
            base_price,
            short_interest,
            steps_per_day: (24 / time_step_hours.clamp(1, 24)) as usize,
            noise,
            price_history: vec![base_price],
        })
    }

    pub fn current_price(&self) -> f64 {
        self.price_history.last().copied().unwrap_or(self.base_price)
    }

    pub fn price_history(&self) -> &[f64] {
        &self.price_history
    }

    pub fn steps_per_day(&self) -> usize {
        self.steps_per_day
    }

    pub fn day_of(&self, step: usize) -> usize {
        step / self.steps_per_day
    }

    /// Draw the price for `step` and append it to the history.
    pub fn advance<R: Rng>(&mut self, step: usize, community_sentiment: f64, rng: &mut R) -> f64 {
        let multiplier = phase_multiplier(self.day_of(step));
        let sentiment_boost = 1.0 + community_sentiment * SENTIMENT_PRICE_WEIGHT;
        let noise = self.noise.sample(rng);
        let price = (self.base_price * multiplier * sentiment_boost * (1.0 + noise)).max(PRICE_FLOOR);
        self.price_history.push(price);
        price
    }

    /// Market view of the latest price move, rounded the way agents see it.
    pub fn snapshot<R: Rng>(&self, timestamp: DateTime<Utc>, rng: &mut R) -> MarketInfo {
        let current = self.current_price();
        let previous = match self.price_history.len() {
            n if n > 1 => self.price_history[n - 2],
            _ => self.base_price,
        };
        let change_pct = (current - previous) / previous * 100.0;
        MarketInfo {
            timestamp,
            stock_price: round2(current),
            price_change_pct: round2(change_pct),
            volume: rng.gen_range(VOLUME_RANGE),
            trend: MarketTrend::from_change_pct(change_pct),
            short_interest: self.short_interest,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn multiplier_ramps_by_day() {
        assert_eq!(phase_multiplier(0), 1.0);
        assert!((phase_multiplier(2) - 1.2).abs() < 1e-9);
        assert!((phase_multiplier(3) - 1.3).abs() < 1e-9);
        assert!((phase_multiplier(4) - 1.8).abs() < 1e-9);
        assert!((phase_multiplier(6) - 4.3).abs() < 1e-9);
    }

    #[test]
    fn price_never_drops_below_floor() {
        let mut market = MarketModel::new(0.5, 140.0, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for step in 0..48 {
            let price = market.advance(step, -1.0, &mut rng);
            assert!(price >= PRICE_FLOOR);
        }
        assert_eq!(market.price_history().len(), 49);
    }

    #[test]
    fn seeded_runs_are_identical() {
        let mut a = MarketModel::new(20.0, 140.0, 1).unwrap();
        let mut b = MarketModel::new(20.0, 140.0, 1).unwrap();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        for step in 0..24 {
            assert_eq!(a.advance(step, 0.2, &mut rng_a), b.advance(step, 0.2, &mut rng_b));
        }
    }

    #[test]
    fn snapshot_reports_change_against_previous_price() {
        let mut market = MarketModel::new(20.0, 140.0, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        // Day five starts the steep phase.
        market.advance(5 * 24, 0.0, &mut rng);
        let ts = Utc.with_ymd_and_hms(2021, 1, 16, 9, 0, 0).unwrap();
        let info = market.snapshot(ts, &mut rng);
        assert!(info.price_change_pct > 50.0);
        assert_eq!(info.trend, MarketTrend::Surging);
        assert!((1_000_000..=50_000_000).contains(&info.volume));
        assert_eq!(info.short_interest, 140.0);
    }

    #[test]
    fn rejects_non_positive_base_price() {
        assert!(matches!(
            MarketModel::new(0.0, 140.0, 1),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn steps_per_day_follows_time_step() {
        let market = MarketModel::new(20.0, 140.0, 4).unwrap();
        assert_eq!(market.steps_per_day(), 6);
        assert_eq!(market.day_of(13), 2);
    }
}
