pub mod cognition;
pub mod emotion;
pub mod identity;
pub mod market_structure;
pub mod network_structure;
pub mod neurobiology;
pub mod social_interaction;

use crate::context::{LayerContext, LayerOutput};
use crate::error::LayerError;

/// One layer of the behavior model.
///
/// A module owns its state and only changes it inside `process`. Modules never
/// touch each other's state; everything they share travels through the
/// [`LayerContext`].
pub trait LayerModule: Send {
    fn name(&self) -> &'static str;

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError>;

    fn reset(&mut self) -> Result<(), LayerError>;

    /// One-line human readable view of the current state.
    fn summarize(&self) -> String;
}

pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
