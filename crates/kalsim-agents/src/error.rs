use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM call timed out after {0} seconds")]
    Timeout(u64),

    #[error("Decision parse error: {0}")]
    Parse(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Layer error: {0}")]
    Layer(#[from] kalsim_layers::LayerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
