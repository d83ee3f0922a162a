use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::{ActionResult, ActionType};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationMetadata {
    pub simulation_days: u32,
    pub agent_count: usize,
    pub total_steps: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_actions: usize,
}

/// The persisted record of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationLog {
    pub metadata: SimulationMetadata,
    /// Starting price followed by one entry per executed step.
    pub price_history: Vec<f64>,
    pub actions: Vec<ActionResult>,
}

impl SimulationLog {
    pub fn count_of(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }

    pub fn final_price(&self) -> Option<f64> {
        self.price_history.last().copied()
    }

    pub fn peak_price(&self) -> Option<f64> {
        self.price_history.iter().copied().reduce(f64::max)
    }
}
