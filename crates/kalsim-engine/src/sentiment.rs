use kalsim_models::{ActionResult, ConsensusView};

const POSITIVE_KEYWORDS: [&str; 7] = ["moon", "hold", "diamond", "buy", "bullish", "rocket", "ape"];
const NEGATIVE_KEYWORDS: [&str; 6] = ["sell", "crash", "dump", "paper", "fear", "loss"];
const KEYWORD_WEIGHT: f64 = 0.05;
const DECAY: f64 = 0.95;

/// `(positive - negative) * 0.05`, counting each keyword at most once.
pub fn keyword_score(content: &str) -> f64 {
    let lower = content.to_lowercase();
    let positive = POSITIVE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count() as f64;
    let negative = NEGATIVE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count() as f64;
    (positive - negative) * KEYWORD_WEIGHT
}

/// Community mood in `[-1, 1]`, fed by the tweets of each step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommunitySentiment {
    value: f64,
}

impl CommunitySentiment {
    pub fn new(value: f64) -> Self {
        Self {
            value: value.clamp(-1.0, 1.0),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn consensus(&self) -> ConsensusView {
        ConsensusView::from_sentiment(self.value)
    }

    /// Fold one step's actions in. Only tweets move the mood; decay applies every step.
    pub fn update(&mut self, actions: &[ActionResult]) {
        let scores: Vec<f64> = actions
            .iter()
            .filter(|a| a.is_tweet())
            .map(|a| keyword_score(&a.content))
            .collect();
        if !scores.is_empty() {
            self.value += scores.iter().sum::<f64>() / scores.len() as f64;
        }
        self.value = (self.value * DECAY).clamp(-1.0, 1.0);
    }
}
