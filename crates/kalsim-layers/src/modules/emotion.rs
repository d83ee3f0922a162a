use serde::{Deserialize, Serialize};

use super::{clamp01, LayerModule};
use crate::context::{LayerContext, LayerOutput, StimulusKind};
use crate::error::LayerError;

pub const DEFAULT_DECAY_RATE: f64 = 0.1;

/// Label for a region of valence/arousal space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Euphoria,
    Excitement,
    Contentment,
    Panic,
    Fear,
    Anxiety,
    Sadness,
    Alertness,
    Calm,
    #[default]
    Neutral,
}

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Euphoria => "euphoria",
            Self::Excitement => "excitement",
            Self::Contentment => "contentment",
            Self::Panic => "panic",
            Self::Fear => "fear",
            Self::Anxiety => "anxiety",
            Self::Sadness => "sadness",
            Self::Alertness => "alertness",
            Self::Calm => "calm",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EmotionState {
    /// `[-1, 1]`
    pub valence: f64,
    /// `[0, 1]`
    pub arousal: f64,
    pub dominant_emotion: EmotionLabel,
    /// Derived from valence and arousal.
    pub intensity: f64,
}

impl Default for EmotionState {
    fn default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.5,
            dominant_emotion: EmotionLabel::Neutral,
            intensity: 0.0,
        }
    }
}

impl EmotionState {
    pub fn from_coordinates(valence: f64, arousal: f64) -> Self {
        let valence = valence.clamp(-1.0, 1.0);
        let arousal = clamp01(arousal);
        Self {
            valence,
            arousal,
            dominant_emotion: EmotionModule::classify_emotion(valence, arousal),
            intensity: EmotionModule::calculate_intensity(valence, arousal),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct EmotionOutput {
    pub valence: f64,
    pub arousal: f64,
    pub dominant_emotion: EmotionLabel,
    pub emotion_intensity: f64,
}

/// Layer 3: valence/arousal emotion model.
#[derive(Debug)]
pub struct EmotionModule {
    current: EmotionState,
    decay_rate: f64,
}

impl Default for EmotionModule {
    fn default() -> Self {
        Self {
            current: EmotionState::default(),
            decay_rate: DEFAULT_DECAY_RATE,
        }
    }
}

impl EmotionModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decay_rate(decay_rate: f64) -> Self {
        Self {
            decay_rate,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &EmotionState {
        &self.current
    }

    /// Exponential decay toward neutral valence and mid arousal.
    pub fn apply_decay(&self, state: &EmotionState, time_steps: u32) -> EmotionState {
        let factor = (-self.decay_rate * f64::from(time_steps)).exp();
        EmotionState::from_coordinates(
            state.valence * factor,
            0.5 + (state.arousal - 0.5) * factor,
        )
    }

    /// Scale valence around zero and arousal around its 0.5 midpoint.
    pub fn amplify(state: &EmotionState, factor: f64) -> EmotionState {
        EmotionState::from_coordinates(
            state.valence * factor,
            0.5 + (state.arousal - 0.5) * factor,
        )
    }

    pub fn classify_emotion(valence: f64, arousal: f64) -> EmotionLabel {
        if valence > 0.6 && arousal > 0.7 {
            EmotionLabel::Euphoria
        } else if valence > 0.3 && arousal > 0.6 {
            EmotionLabel::Excitement
        } else if valence > 0.3 && arousal < 0.4 {
            EmotionLabel::Contentment
        } else if valence < -0.6 && arousal > 0.7 {
            EmotionLabel::Panic
        } else if valence < -0.3 && arousal > 0.6 {
            EmotionLabel::Fear
        } else if valence < -0.3 && arousal > 0.4 {
            EmotionLabel::Anxiety
        } else if valence < -0.3 && arousal < 0.4 {
            EmotionLabel::Sadness
        } else if arousal > 0.6 {
            EmotionLabel::Alertness
        } else if arousal < 0.3 {
            EmotionLabel::Calm
        } else {
            EmotionLabel::Neutral
        }
    }

    pub fn calculate_intensity(valence: f64, arousal: f64) -> f64 {
        ((valence.abs() + (arousal - 0.5).abs() * 2.0) / 2.0).min(1.0)
    }
}

impl LayerModule for EmotionModule {
    fn name(&self) -> &'static str {
        "emotion"
    }

    fn process(&mut self, ctx: &LayerContext) -> Result<LayerOutput, LayerError> {
        let mut valence = ctx.agent.emotion.valence;
        let mut arousal = ctx.agent.emotion.arousal;

        if let Some(stimulus) = ctx.stimulus {
            let i = stimulus.intensity;
            let (dv, da) = match stimulus.kind {
                StimulusKind::MarketSurge => (i * 0.5, i * 0.3),
                StimulusKind::MarketCrash => (-i * 0.6, i * 0.4),
                StimulusKind::ViralPost => (i * 0.3, i * 0.2),
                StimulusKind::Fud => (-i * 0.4, i * 0.3),
            };
            valence += dv;
            arousal += da;
        }

        self.current = EmotionState::from_coordinates(valence, arousal);

        Ok(LayerOutput::Emotion(EmotionOutput {
            valence: self.current.valence,
            arousal: self.current.arousal,
            dominant_emotion: self.current.dominant_emotion,
            emotion_intensity: self.current.intensity,
        }))
    }

    fn reset(&mut self) -> Result<(), LayerError> {
        self.current = EmotionState::default();
        Ok(())
    }

    fn summarize(&self) -> String {
        format!(
            "Emotion: {} (valence {:.2}, arousal {:.2}, intensity {:.2})",
            self.current.dominant_emotion,
            self.current.valence,
            self.current.arousal,
            self.current.intensity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AgentSnapshot, Stimulus};

    fn run(module: &mut EmotionModule, ctx: &LayerContext) -> EmotionOutput {
        match module.process(ctx).unwrap() {
            LayerOutput::Emotion(o) => o,
            other => panic!("unexpected output {other:?}"),
        }
    }

    fn stimulated(kind: StimulusKind, intensity: f64) -> LayerContext {
        LayerContext::new(AgentSnapshot::default()).with_stimulus(Stimulus { kind, intensity })
    }

    #[test]
    fn surge_lifts_valence_and_arousal() {
        let out = run(&mut EmotionModule::new(), &stimulated(StimulusKind::MarketSurge, 1.0));
        assert!((out.valence - 0.5).abs() < 1e-9);
        assert!((out.arousal - 0.8).abs() < 1e-9);
        assert_eq!(out.dominant_emotion, EmotionLabel::Excitement);
    }

    #[test]
    fn crash_produces_fear() {
        let out = run(&mut EmotionModule::new(), &stimulated(StimulusKind::MarketCrash, 1.0));
        assert!(out.valence < 0.0);
        assert_eq!(out.dominant_emotion, EmotionLabel::Fear);
    }

    #[test]
    fn fud_and_viral_posts_move_in_opposite_directions() {
        let fud = run(&mut EmotionModule::new(), &stimulated(StimulusKind::Fud, 0.5));
        let viral = run(&mut EmotionModule::new(), &stimulated(StimulusKind::ViralPost, 0.5));
        assert!(fud.valence < 0.0);
        assert!(viral.valence > 0.0);
    }

    #[test]
    fn no_stimulus_keeps_prior_emotion() {
        let mut snapshot = AgentSnapshot::default();
        snapshot.emotion = EmotionState::from_coordinates(0.4, 0.3);
        let out = run(&mut EmotionModule::new(), &LayerContext::new(snapshot));
        assert!((out.valence - 0.4).abs() < 1e-9);
        assert_eq!(out.dominant_emotion, EmotionLabel::Contentment);
    }

    #[test]
    fn stimuli_are_clamped() {
        let mut snapshot = AgentSnapshot::default();
        snapshot.emotion = EmotionState::from_coordinates(0.9, 0.9);
        let ctx = LayerContext::new(snapshot).with_stimulus(Stimulus {
            kind: StimulusKind::MarketSurge,
            intensity: 5.0,
        });
        let out = run(&mut EmotionModule::new(), &ctx);
        assert_eq!(out.valence, 1.0);
        assert_eq!(out.arousal, 1.0);
        assert_eq!(out.emotion_intensity, 1.0);
        assert_eq!(out.dominant_emotion, EmotionLabel::Euphoria);
    }

    #[test]
    fn decay_moves_monotonically_toward_neutral() {
        let module = EmotionModule::new();
        let start = EmotionState::from_coordinates(-0.8, 0.95);
        let mut last = start;
        for steps in 1..10 {
            let decayed = module.apply_decay(&start, steps);
            assert!(decayed.valence.abs() < last.valence.abs());
            assert!((decayed.arousal - 0.5).abs() < (last.arousal - 0.5).abs());
            last = decayed;
        }
    }

    #[test]
    fn amplify_respects_bounds() {
        let state = EmotionState::from_coordinates(0.6, 0.6);
        let amplified = EmotionModule::amplify(&state, 3.0);
        assert_eq!(amplified.valence, 1.0);
        assert!((amplified.arousal - 0.8).abs() < 1e-9);
        let negative = EmotionModule::amplify(&EmotionState::from_coordinates(-0.6, 0.2), 3.0);
        assert_eq!(negative.valence, -1.0);
        assert_eq!(negative.arousal, 0.0);
    }

    #[test]
    fn amplify_scales_arousal_around_midpoint() {
        let neutral = EmotionModule::amplify(&EmotionState::from_coordinates(0.4, 0.5), 0.5);
        assert!((neutral.valence - 0.2).abs() < 1e-9);
        assert_eq!(neutral.arousal, 0.5);

        let dampened = EmotionModule::amplify(&EmotionState::from_coordinates(0.0, 0.9), 0.5);
        assert!((dampened.arousal - 0.7).abs() < 1e-9);
        let calmed = EmotionModule::amplify(&EmotionState::from_coordinates(0.0, 0.1), 0.5);
        assert!((calmed.arousal - 0.3).abs() < 1e-9);
    }

    #[test]
    fn classification_table() {
        let cases = [
            (0.7, 0.8, EmotionLabel::Euphoria),
            (0.4, 0.65, EmotionLabel::Excitement),
            (0.4, 0.2, EmotionLabel::Contentment),
            (-0.7, 0.8, EmotionLabel::Panic),
            (-0.4, 0.65, EmotionLabel::Fear),
            (-0.4, 0.5, EmotionLabel::Anxiety),
            (-0.4, 0.2, EmotionLabel::Sadness),
            (0.0, 0.8, EmotionLabel::Alertness),
            (0.0, 0.1, EmotionLabel::Calm),
            (0.0, 0.5, EmotionLabel::Neutral),
        ];
        for (v, a, expected) in cases {
            assert_eq!(EmotionModule::classify_emotion(v, a), expected, "v={v} a={a}");
        }
    }

    #[test]
    fn intensity_formula() {
        assert!((EmotionModule::calculate_intensity(0.5, 0.75) - 0.5).abs() < 1e-9);
        assert_eq!(EmotionModule::calculate_intensity(0.0, 0.5), 0.0);
    }
}
