use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AgentError;

/// Decision text substituted when the model cannot be reached.
pub const FALLBACK_DECISION: &str = "ACTION: HOLD\nCONTENT: Unable to make decision at this time.";

/// Text generation backend used for agent decisions. Mockable for testing.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, AgentError>;

    async fn health_check(&self) -> bool;
}

/// Bounded retries with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Wraps another client and retries failed generations.
pub struct RetryingLlm<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: LlmClient> RetryingLlm<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for RetryingLlm<C> {
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String, AgentError> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(prompt, temperature).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "LLM call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}

/// Offline client that always holds. Used for dry runs.
#[derive(Debug, Clone, Default)]
pub struct MockLlm;

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(&self, _prompt: &str, temperature: f64) -> Result<String, AgentError> {
        debug!(temperature, "Mock LLM generating");
        Ok("ACTION: HOLD\nCONTENT: Mock decision, holding my position.".to_string())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for Flaky {
        async fn generate(&self, _prompt: &str, _temperature: f64) -> Result<String, AgentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(AgentError::Llm(format!("failure {n}")))
            } else {
                Ok("ACTION: LURK\nCONTENT: watching".to_string())
            }
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let llm = RetryingLlm::new(
            Flaky {
                failures: 2,
                calls: AtomicU32::new(0),
            },
            fast(3),
        );
        let text = llm.generate("prompt", 0.8).await.unwrap();
        assert!(text.starts_with("ACTION: LURK"));
        assert_eq!(llm.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let llm = RetryingLlm::new(
            Flaky {
                failures: 10,
                calls: AtomicU32::new(0),
            },
            fast(2),
        );
        let err = llm.generate("prompt", 0.8).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
        assert_eq!(llm.inner().calls.load(Ordering::SeqCst), 3);
        assert!(!llm.health_check().await);
    }

    #[tokio::test]
    async fn mock_always_holds() {
        let text = MockLlm.generate("anything", 0.1).await.unwrap();
        assert!(text.starts_with("ACTION: HOLD"));
        assert!(MockLlm.health_check().await);
    }
}
