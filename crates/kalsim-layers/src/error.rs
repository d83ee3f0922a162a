use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("Layer {layer} failed: {reason}")]
    Failed { layer: String, reason: String },

    #[error("Layer {layer} wrote to occupied output slot '{slot}'")]
    DuplicateOutput { layer: String, slot: String },

    #[error("Invalid layer input: {0}")]
    InvalidInput(String),
}
