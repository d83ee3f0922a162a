use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters an action's content may carry.
pub const CONTENT_LIMIT: usize = 280;

/// What an agent did on a step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Tweet,
    Hold,
    Lurk,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tweet => "TWEET",
            Self::Hold => "HOLD",
            Self::Lurk => "LURK",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finalized agent action, as recorded in the simulation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    pub agent_id: usize,
    pub timestamp: DateTime<Utc>,
    pub action_type: ActionType,
    pub content: String,
    /// Persona name, personality summary and layer state at decision time.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ActionResult {
    pub fn is_tweet(&self) -> bool {
        self.action_type == ActionType::Tweet
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Observation,
    Decision,
    Action,
}

/// One item in an agent's bounded memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    pub timestamp: DateTime<Utc>,
    pub entry_type: MemoryKind,
    pub content: serde_json::Value,
}
