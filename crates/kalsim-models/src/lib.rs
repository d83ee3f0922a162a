pub mod action;
pub mod config;
pub mod events;
pub mod market;
pub mod persona;
pub mod simulation_log;
pub mod social;

pub use action::{ActionResult, ActionType, MemoryEntry, MemoryKind, CONTENT_LIMIT};
pub use config::{KalsimConfig, LlmBackend, LlmConfig, ProvidersConfig, SimulationConfig};
pub use events::{MarketEvent, TrendAnalysis};
pub use market::{MarketInfo, MarketTrend};
pub use persona::{Beliefs, Persona, SocialProfile};
pub use simulation_log::{SimulationLog, SimulationMetadata};
pub use social::{ConsensusView, NeighborSignal, SocialMediaInfo, ViralPostSignal};
