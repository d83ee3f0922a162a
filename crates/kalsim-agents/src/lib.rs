pub mod agent;
pub mod cli_llm;
pub mod error;
pub mod llm;
pub mod parser;
pub mod prompts;
pub mod providers;

pub mod test_support;

pub use agent::{Agent, AgentState, MEMORY_LIMIT};
pub use cli_llm::{check_cli_available, CliLlm, CliLlmConfig};
pub use error::AgentError;
pub use llm::{LlmClient, MockLlm, RetryPolicy, RetryingLlm, FALLBACK_DECISION};
pub use parser::{parse_decision, Decision};
pub use prompts::PromptBuilder;
pub use providers::{
    generate_default_personas, JsonFileMarketData, JsonPersonaFile, MarketDataProvider,
    PersonaProvider,
};
