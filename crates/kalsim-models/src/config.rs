use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Top-level configuration for kalsim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KalsimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Parameters of a single simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub days: u32,
    pub agent_count: usize,
    pub time_step_hours: u32,
    /// Price at simulated time zero.
    pub base_price: f64,
    pub start_time: DateTime<Utc>,
    /// Topic used to pick trending events; ignored when no market data source is configured.
    pub market_topic: String,
    /// Fixes every random draw in the run when set.
    pub seed: Option<u64>,
    pub output_path: String,
    /// Upvotes a post needs before it counts as viral.
    pub viral_threshold: u64,
    /// Short interest as a percentage of float.
    pub initial_short_interest: f64,
    pub decision_temperature: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            days: 7,
            agent_count: 100,
            time_step_hours: 1,
            base_price: 20.0,
            start_time: Utc
                .with_ymd_and_hms(2021, 1, 11, 9, 0, 0)
                .single()
                .unwrap_or_default(),
            market_topic: "prediction markets".to_string(),
            seed: None,
            output_path: "results/simulation_log.json".to_string(),
            viral_threshold: 25,
            initial_short_interest: 140.0,
            decision_temperature: 0.8,
        }
    }
}

impl SimulationConfig {
    pub fn total_steps(&self) -> usize {
        (self.days as usize * 24) / self.time_step_hours.max(1) as usize
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    #[default]
    Claude,
    Ollama,
    /// Deterministic offline responses, for dry runs.
    Mock,
}

/// Configuration for the language model that drives agent decisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    /// First retry delay; doubles on every further attempt.
    pub backoff_base_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Claude,
            model: "claude-3-5-haiku-latest".to_string(),
            timeout_seconds: 120,
            max_retries: 3,
            backoff_base_ms: 1000,
        }
    }
}

/// Optional file-backed data sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    /// JSON array of personas. Generated personas are used when unset.
    pub personas_path: Option<String>,
    /// JSON array of trending market events.
    pub events_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_run_is_one_week_hourly() {
        let sim = SimulationConfig::default();
        assert_eq!(sim.total_steps(), 168);
        assert_eq!(sim.start_time.to_rfc3339(), "2021-01-11T09:00:00+00:00");
    }

    #[test]
    fn roundtrip_kalsim_config() {
        let config = KalsimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: KalsimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[simulation]
days = 2
agent_count = 12
seed = 42
output_path = "/tmp/run.json"

[llm]
backend = "ollama"
model = "llama3"
max_retries = 1

[providers]
personas_path = "data/personas.json"
"#;

        let config: KalsimConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.simulation.days, 2);
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.base_price, 20.0);
        assert_eq!(config.simulation.total_steps(), 48);
        assert_eq!(config.llm.backend, LlmBackend::Ollama);
        assert_eq!(config.llm.timeout_seconds, 120);
        assert_eq!(
            config.providers.personas_path.as_deref(),
            Some("data/personas.json")
        );
        assert!(config.providers.events_path.is_none());
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: KalsimConfig = toml::from_str("").unwrap();
        assert_eq!(config, KalsimConfig::default());
    }
}
