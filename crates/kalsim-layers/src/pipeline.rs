use tracing::{debug, error, warn};

use crate::context::LayerContext;
use crate::error::LayerError;
use crate::modules::cognition::CognitionModule;
use crate::modules::emotion::EmotionModule;
use crate::modules::identity::IdentityModule;
use crate::modules::market_structure::MarketStructureModule;
use crate::modules::network_structure::NetworkStructureModule;
use crate::modules::neurobiology::NeurobiologyModule;
use crate::modules::social_interaction::SocialInteractionModule;
use crate::modules::LayerModule;

/// Ordered list of layers run once per observation.
#[derive(Default)]
pub struct LayerPipeline {
    layers: Vec<Box<dyn LayerModule>>,
}

impl LayerPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The seven standard layers in canonical order.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_layer(Box::new(NeurobiologyModule::new()));
        pipeline.add_layer(Box::new(CognitionModule::new()));
        pipeline.add_layer(Box::new(EmotionModule::new()));
        pipeline.add_layer(Box::new(SocialInteractionModule::new()));
        pipeline.add_layer(Box::new(IdentityModule::new()));
        pipeline.add_layer(Box::new(NetworkStructureModule::new()));
        pipeline.add_layer(Box::new(MarketStructureModule::new()));
        pipeline
    }

    pub fn add_layer(&mut self, layer: Box<dyn LayerModule>) {
        debug!(layer = layer.name(), "Added layer");
        self.layers.push(layer);
    }

    /// Run every layer once, in registration order. The first failing layer
    /// aborts the pass.
    pub fn execute(&mut self, mut ctx: LayerContext) -> Result<LayerContext, LayerError> {
        for layer in &mut self.layers {
            let name = layer.name();
            let output = layer.process(&ctx).map_err(|e| {
                error!(layer = name, error = %e, "Layer failed");
                e
            })?;
            ctx.outputs.record(name, output).map_err(|e| {
                error!(layer = name, error = %e, "Layer output rejected");
                e
            })?;
            debug!(layer = name, "Layer processed");
        }
        Ok(ctx)
    }

    /// Reset every layer. Failures are logged and skipped.
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            if let Err(e) = layer.reset() {
                warn!(layer = layer.name(), error = %e, "Layer reset failed");
            }
        }
    }

    pub fn summaries(&self) -> Vec<(&'static str, String)> {
        self.layers
            .iter()
            .map(|l| (l.name(), l.summarize()))
            .collect()
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl std::fmt::Debug for LayerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerPipeline")
            .field("layers", &self.layer_names())
            .finish()
    }
}
