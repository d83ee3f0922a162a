use std::time::Duration;

use async_trait::async_trait;
use kalsim_models::{LlmBackend, LlmConfig};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::LlmClient;

/// Configuration for a local model CLI invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CliLlmConfig {
    pub program: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for CliLlmConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl CliLlmConfig {
    /// CLI settings for a configured backend. `None` for backends that are not CLI driven.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        let program = match config.backend {
            LlmBackend::Claude => "claude",
            LlmBackend::Ollama => "ollama",
            LlmBackend::Mock => return None,
        };
        Some(Self {
            program: program.to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    /// Command line arguments for one prompt.
    pub fn args(&self, prompt: &str) -> Vec<String> {
        match self.program.as_str() {
            "ollama" => vec!["run".to_string(), self.model.clone(), prompt.to_string()],
            _ => vec![
                "-p".to_string(),
                prompt.to_string(),
                "--model".to_string(),
                self.model.clone(),
                "--output-format".to_string(),
                "text".to_string(),
            ],
        }
    }
}

/// An [`LlmClient`] that shells out to `claude` or `ollama`.
///
/// Neither CLI takes a sampling temperature, so it is only logged.
#[derive(Debug, Clone, Default)]
pub struct CliLlm {
    pub config: CliLlmConfig,
}

impl CliLlm {
    pub fn new(config: CliLlmConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LlmClient for CliLlm {
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, AgentError> {
        let config = &self.config;
        debug!(program = %config.program, model = %config.model, temperature, "Invoking model CLI");

        let result = tokio::time::timeout(config.timeout, async {
            Command::new(&config.program)
                .args(config.args(prompt))
                .kill_on_drop(true)
                .output()
                .await
        })
        .await
        .map_err(|_| AgentError::Timeout(config.timeout.as_secs()))?
        .map_err(|e| AgentError::Llm(format!("Failed to spawn {}: {e}", config.program)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!(status = %result.status, stderr = %stderr, "Model CLI failed");
            return Err(AgentError::Llm(format!(
                "{} exited {}: {}",
                config.program, result.status, stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&result.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(AgentError::Llm(format!(
                "{} returned empty response",
                config.program
            )));
        }

        Ok(stdout)
    }

    async fn health_check(&self) -> bool {
        check_cli_available(&self.config.program).await
    }
}

/// Check if `program` is installed and answers `--version`.
pub async fn check_cli_available(program: &str) -> bool {
    match Command::new(program).arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
