use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse direction label derived from the tick-over-tick price change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarketTrend {
    Surging,
    Rising,
    #[default]
    Stable,
    Falling,
    Crashing,
}

impl MarketTrend {
    /// Classify a percentage change: >5 surging, >1 rising, <-5 crashing,
    /// <-1 falling, otherwise stable.
    pub fn from_change_pct(change_pct: f64) -> Self {
        if change_pct > 5.0 {
            Self::Surging
        } else if change_pct > 1.0 {
            Self::Rising
        } else if change_pct < -5.0 {
            Self::Crashing
        } else if change_pct < -1.0 {
            Self::Falling
        } else {
            Self::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Surging => "surging",
            Self::Rising => "rising",
            Self::Stable => "stable",
            Self::Falling => "falling",
            Self::Crashing => "crashing",
        }
    }
}

impl std::fmt::Display for MarketTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market snapshot handed to every sampled agent for one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketInfo {
    pub timestamp: DateTime<Utc>,
    pub stock_price: f64,
    pub price_change_pct: f64,
    pub volume: u64,
    pub trend: MarketTrend,
    /// Short interest as a percentage of float.
    #[serde(default)]
    pub short_interest: f64,
}
