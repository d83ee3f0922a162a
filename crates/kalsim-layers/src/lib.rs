pub mod context;
pub mod error;
pub mod modules;
pub mod pipeline;

pub use context::{
    AgentSnapshot, InformationSignal, LayerContext, LayerOutput, LayerOutputs, MarketSignal,
    OrderSide, SocialSignal, Stimulus, StimulusKind,
};
pub use error::LayerError;
pub use modules::cognition::{CognitionModule, CognitionOutput, CognitiveBias, CognitiveBiases};
pub use modules::emotion::{EmotionLabel, EmotionModule, EmotionOutput, EmotionState};
pub use modules::identity::{IdentityGroup, IdentityModule, IdentityOutput, IdentityState, SalienceContext};
pub use modules::market_structure::{MarketStructureModule, MarketStructureOutput};
pub use modules::network_structure::{NetworkOutput, NetworkStructureModule, Platform, PlatformPost};
pub use modules::neurobiology::{
    NeurobiologicalState, NeurobiologyModule, NeurobiologyOutput, FOMO_THRESHOLD, STRESS_THRESHOLD,
};
pub use modules::social_interaction::{
    Affect, EmotionContagion, SocialInfluence, SocialInteractionModule, SocialOutput,
};
pub use modules::LayerModule;
pub use pipeline::LayerPipeline;
