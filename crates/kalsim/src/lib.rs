//! kalsim - layered psychological agents in a simulated meme-stock squeeze.
//!
//! Agents observe a simulated market and social feed, run their state
//! through a seven-layer behavioural pipeline, and let a language model
//! decide whether to tweet, hold or lurk. Community sentiment from those
//! tweets feeds back into the price.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use kalsim::models::KalsimConfig;
//! use kalsim::engine::{Simulation, SimulationRunner};
//! use kalsim::agents::{Agent, LlmClient, MockLlm};
//! use kalsim::layers::{LayerPipeline, LayerContext};
//! ```

pub use kalsim_agents as agents;
pub use kalsim_engine as engine;
pub use kalsim_layers as layers;
pub use kalsim_models as models;

use std::sync::Arc;
use std::time::Duration;

use kalsim_agents::{
    CliLlm, CliLlmConfig, JsonFileMarketData, JsonPersonaFile, LlmClient, MockLlm, RetryPolicy,
    RetryingLlm,
};
use kalsim_engine::Simulation;
use kalsim_models::{KalsimConfig, LlmConfig};

/// Build the decision model client. `mock` forces the offline client.
pub fn build_llm(config: &LlmConfig, mock: bool) -> Arc<dyn LlmClient> {
    let cli = if mock { None } else { CliLlmConfig::from_config(config) };
    match cli {
        Some(cli) => {
            tracing::info!(program = %cli.program, model = %cli.model, "Using CLI LLM backend");
            let policy = RetryPolicy {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.backoff_base_ms),
            };
            Arc::new(RetryingLlm::new(CliLlm::new(cli), policy))
        }
        None => {
            tracing::info!("Using mock LLM backend");
            Arc::new(MockLlm)
        }
    }
}

/// Build a simulation with collaborators wired from configuration.
pub fn build_simulation(config: &KalsimConfig, mock: bool) -> Result<Simulation, anyhow::Error> {
    let llm = build_llm(&config.llm, mock);
    let mut simulation = Simulation::new(config.simulation.clone(), llm)?;

    if let Some(path) = &config.providers.personas_path {
        simulation = simulation.with_personas(Arc::new(JsonPersonaFile::new(path)));
    }
    if let Some(path) = &config.providers.events_path {
        simulation = simulation.with_market_data(Arc::new(JsonFileMarketData::new(path)));
    }
    Ok(simulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kalsim_models::LlmBackend;

    #[tokio::test]
    async fn mock_flag_overrides_backend() {
        let llm = build_llm(&LlmConfig::default(), true);
        assert!(llm.health_check().await);
        let out = llm.generate("anything", 0.8).await.unwrap();
        assert!(out.starts_with("ACTION: HOLD"));
    }

    #[tokio::test]
    async fn mock_backend_from_config() {
        let config = LlmConfig {
            backend: LlmBackend::Mock,
            ..Default::default()
        };
        let llm = build_llm(&config, false);
        assert!(llm.generate("p", 0.1).await.unwrap().contains("Mock decision"));
    }

    #[test]
    fn invalid_simulation_config_is_rejected() {
        let mut config = KalsimConfig::default();
        config.simulation.agent_count = 0;
        assert!(build_simulation(&config, true).is_err());
    }
}
