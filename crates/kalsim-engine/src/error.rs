use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Layer error: {0}")]
    Layer(#[from] kalsim_layers::LayerError),

    #[error("Agent error: {0}")]
    Agent(#[from] kalsim_agents::AgentError),

    #[error("Failed to persist simulation log: {0}")]
    Persistence(String),

    #[error("A simulation is already running")]
    AlreadyRunning,

    #[error("No simulation is running")]
    NotRunning,

    #[error("Simulation task failed: {0}")]
    Task(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
