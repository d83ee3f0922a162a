use kalsim_layers::{EmotionLabel, IdentityGroup, IdentityState, LayerOutputs};

const FOMO_HIGH: f64 = 0.7;
const FOMO_MODERATE: f64 = 0.4;
const STRESS_HIGH: f64 = 0.7;
const STRESS_MODERATE: f64 = 0.4;
const AROUSAL_HIGH: f64 = 0.7;
const SOCIAL_PRESSURE_HIGH: f64 = 0.5;
const IDENTIFICATION_HIGH: f64 = 0.6;

/// Renders an agent's layer outputs as a natural-language decision prompt.
pub struct PromptBuilder<'a> {
    pub name: &'a str,
    pub personality: &'a str,
    pub identity: Option<&'a IdentityState>,
    pub outputs: &'a LayerOutputs,
}

impl<'a> PromptBuilder<'a> {
    pub fn build_decision_prompt(&self, market_topic: &str, recent_context: &str) -> String {
        format!(
            "You are simulating a social media user discussing {market_topic}.\n\n\
             TOPIC: {market_topic}\n\n\
             {profile}\n\n\
             {psychology}\n\n\
             RECENT CONTEXT:\n{recent_context}\n\n\
             {guidance}\n\n\
             Based on your character, psychological state, and the current situation, decide what to do next.\n\
             Choose ONE action and provide your response in this exact format:\n\
             ACTION: [TWEET/HOLD/LURK]\n\
             CONTENT: [If TWEET, write a short post (max 280 chars) about \"{market_topic}\". \
             If HOLD or LURK, briefly explain why.]\n\n\
             Remember to stay in character and let your psychological state influence your decision.",
            profile = self.character_profile(),
            psychology = self.psychological_state(),
            guidance = self.action_guidance(),
        )
    }

    fn character_profile(&self) -> String {
        let group = self
            .identity
            .map(|i| i.primary_group)
            .unwrap_or(IdentityGroup::Neutral);
        format!(
            "CHARACTER PROFILE:\n- Name: {}\n- {}\n- Identity Group: {}",
            self.name, self.personality, group
        )
    }

    fn psychological_state(&self) -> String {
        let parts: Vec<String> = [
            self.fomo_line(),
            self.stress_line(),
            self.emotion_line(),
            self.social_line(),
            self.identity_line(),
            self.cognitive_line(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            "PSYCHOLOGICAL STATE:\n- You feel calm and analytical about the current situation.".to_string()
        } else {
            format!("PSYCHOLOGICAL STATE:\n{}", parts.join("\n"))
        }
    }

    fn fomo(&self) -> f64 {
        self.outputs
            .neurobiology
            .map(|n| n.state.fomo_level)
            .unwrap_or(0.0)
    }

    fn stress(&self) -> f64 {
        self.outputs
            .neurobiology
            .map(|n| n.state.stress_level)
            .unwrap_or(0.0)
    }

    fn arousal(&self) -> f64 {
        self.outputs.emotion.map(|e| e.arousal).unwrap_or(0.5)
    }

    fn fomo_line(&self) -> Option<String> {
        let fomo = self.fomo();
        if fomo > FOMO_HIGH {
            Some(format!(
                "- URGENT: You are experiencing intense FOMO (level: {fomo:.1}). Everyone seems to be \
                 making money and you feel like you're being left behind! The urge to act NOW is overwhelming."
            ))
        } else if fomo > FOMO_MODERATE {
            Some(format!(
                "- You feel moderate fear of missing out (level: {fomo:.1}). You notice others taking \
                 action and wonder if you should too."
            ))
        } else {
            None
        }
    }

    fn stress_line(&self) -> Option<String> {
        let stress = self.stress();
        if stress > STRESS_HIGH {
            Some(format!(
                "- You are highly stressed (level: {stress:.1}). Your heart is racing and it's hard to \
                 think clearly. You feel pressure to do something."
            ))
        } else if stress > STRESS_MODERATE {
            Some(format!(
                "- You feel some stress and tension (level: {stress:.1}). The situation is weighing on you."
            ))
        } else {
            None
        }
    }

    fn emotion_line(&self) -> Option<String> {
        let emotion = self.outputs.emotion?;
        let description = match emotion.dominant_emotion {
            EmotionLabel::Neutral => return None,
            EmotionLabel::Euphoria => "euphoric, like nothing can go wrong",
            EmotionLabel::Excitement => "excited and energized",
            EmotionLabel::Contentment => "content and optimistic",
            EmotionLabel::Panic => "panicked",
            EmotionLabel::Fear => "fearful and anxious",
            EmotionLabel::Anxiety => "uneasy and anxious",
            EmotionLabel::Sadness => "disappointed and down",
            EmotionLabel::Alertness => "alert and watchful",
            EmotionLabel::Calm => "calm",
        };
        let mut line = format!("- Dominant emotion: You feel {description}");
        let intensity = emotion.emotion_intensity;
        if intensity > 0.7 {
            line.push_str(&format!(" (very intense, level: {intensity:.1})"));
        } else if intensity > 0.4 {
            line.push_str(&format!(" (moderate intensity, level: {intensity:.1})"));
        }
        if emotion.arousal > AROUSAL_HIGH {
            line.push_str(". Your energy is high and you feel ready to act.");
        }
        Some(line)
    }

    fn social_line(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(social) = self.outputs.social {
            if social.social_pressure > SOCIAL_PRESSURE_HIGH {
                parts.push(format!(
                    "You feel significant social pressure from the community (level: {:.1}).",
                    social.social_pressure
                ));
            }
            if social.herding_detected {
                parts.push(
                    "You notice everyone around you taking similar actions - the herd is moving in one direction."
                        .to_string(),
                );
            }
        }
        if self.outputs.network.is_some_and(|n| n.viral_exposure) {
            parts.push(
                "You've seen viral posts that are energizing the entire community. The excitement is contagious."
                    .to_string(),
            );
        }
        (!parts.is_empty()).then(|| format!("- {}", parts.join(" ")))
    }

    fn identity_line(&self) -> Option<String> {
        let identity = self.identity?;
        if identity.group_identification <= IDENTIFICATION_HIGH {
            return None;
        }
        let description = match identity.primary_group {
            IdentityGroup::WsbApe => "the WSB ape community - diamond hands, to the moon!",
            IdentityGroup::Institutional => "institutional investors - analytical and measured",
            IdentityGroup::RetailInvestor => "retail investors - cautious but hopeful",
            IdentityGroup::Skeptic => "the skeptics - questioning the hype",
            IdentityGroup::Neutral => "no group in particular",
        };
        Some(format!(
            "- You strongly identify with {description} (identification strength: {:.1}). \
             Your group's values guide your decisions.",
            identity.group_identification
        ))
    }

    fn cognitive_line(&self) -> Option<String> {
        let cognition = self.outputs.cognition.as_ref()?;
        if cognition.active_biases.is_empty() {
            return None;
        }
        let names: Vec<&str> = cognition
            .active_biases
            .iter()
            .map(|b| b.as_str())
            .collect();
        let mut line = format!("- Biases shaping your judgement right now: {}.", names.join(", "));
        if cognition.sell_reluctance > 0.0 {
            line.push_str(" The fear of locking in a loss is stronger than the hope of gaining.");
        }
        Some(line)
    }

    fn action_guidance(&self) -> &'static str {
        if self.fomo() > FOMO_HIGH && self.arousal() > AROUSAL_HIGH {
            "ACTION TENDENCY: Your psychological state suggests a strong urge to engage. \
             Consider whether to tweet your thoughts or observe more."
        } else if self.stress() > STRESS_HIGH {
            "ACTION TENDENCY: Your high stress suggests caution. \
             Consider whether to hold back or seek clarity."
        } else {
            "ACTION TENDENCY: Your state is relatively balanced. \
             Make a decision that fits your character."
        }
    }
}
