pub mod error;
pub mod market;
pub mod runner;
pub mod sentiment;
pub mod simulation;
pub mod social;
pub mod storage;

pub use error::EngineError;
pub use market::{phase_multiplier, MarketModel};
pub use runner::SimulationRunner;
pub use sentiment::{keyword_score, CommunitySentiment};
pub use simulation::{active_agent_count, Simulation, SimulationPhase, SimulationStatus};
pub use social::{default_seed_posts, seed_posts_from_topics, SocialFeed};
pub use storage::LogWriter;
