//! Ordering and single-invocation guarantees of `LayerPipeline::execute`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use kalsim_layers::{AgentSnapshot, LayerContext, LayerError, LayerModule, LayerOutput, LayerPipeline};

struct Recorder {
    name: &'static str,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl LayerModule for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError> {
        self.calls.lock().unwrap().push(self.name);
        let mut values = BTreeMap::new();
        // Each recorder sees how many extension values earlier layers wrote.
        values.insert(
            format!("{}_saw", self.name),
            serde_json::json!(ctx.outputs.extensions.len()),
        );
        Ok(LayerOutput::Extension(values))
    }

    fn reset(&mut self) -> Result<(), LayerError> {
        self.calls.lock().unwrap().push("reset");
        Ok(())
    }

    fn summarize(&self) -> String {
        self.name.to_string()
    }
}

fn pipeline_of(names: &[&'static str]) -> (LayerPipeline, Arc<Mutex<Vec<&'static str>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = LayerPipeline::new();
    for &name in names {
        pipeline.add_layer(Box::new(Recorder {
            name,
            calls: Arc::clone(&calls),
        }));
    }
    (pipeline, calls)
}

#[test]
fn layers_run_once_in_registration_order() {
    let names = ["gamma", "alpha", "omega", "beta"];
    let (mut pipeline, calls) = pipeline_of(&names);

    let ctx = pipeline
        .execute(LayerContext::new(AgentSnapshot::default()))
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), names.to_vec());
    for (i, name) in names.iter().enumerate() {
        assert_eq!(ctx.outputs.extensions[&format!("{name}_saw")], serde_json::json!(i));
    }
}

#[test]
fn every_execute_is_a_fresh_pass() {
    let (mut pipeline, calls) = pipeline_of(&["one", "two"]);
    for _ in 0..3 {
        let ctx = pipeline
            .execute(LayerContext::new(AgentSnapshot::default()))
            .unwrap();
        assert_eq!(ctx.outputs.extensions.len(), 2);
    }
    assert_eq!(calls.lock().unwrap().len(), 6);
}

#[test]
fn reset_reaches_every_layer() {
    let (mut pipeline, calls) = pipeline_of(&["one", "two", "three"]);
    pipeline.reset();
    assert_eq!(*calls.lock().unwrap(), vec!["reset"; 3]);
}
