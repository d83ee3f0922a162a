use std::path::{Path, PathBuf};

use kalsim_models::SimulationLog;
use tracing::info;

use crate::error::EngineError;

/// Reads and writes the JSON simulation log.
#[derive(Debug, Clone)]
pub struct LogWriter {
    path: PathBuf,
}

impl LogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `log` as pretty JSON, creating parent directories as needed.
    pub fn save(&self, log: &SimulationLog) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::Persistence(format!("{}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(log)?;
        std::fs::write(&self.path, json)
            .map_err(|e| EngineError::Persistence(format!("{}: {e}", self.path.display())))?;
        info!(
            path = %self.path.display(),
            actions = log.actions.len(),
            "Simulation log saved"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<SimulationLog, EngineError> {
        let json = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
